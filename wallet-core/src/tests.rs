#[cfg(test)]
mod scenarios {
    use std::sync::Arc;

    use wallet_common::{Amount, Currency};
    use wallet_ledger::LedgerService;

    use crate::coordinator::TransactionCoordinator;

    fn coordinator() -> TransactionCoordinator {
        TransactionCoordinator::new(Arc::new(LedgerService::new_in_memory()))
    }

    #[tokio::test]
    async fn deposit_one_hundred_dollars_reflects_in_wallet_and_ledger() {
        let coordinator = coordinator();
        let journal = coordinator
            .deposit("player-1", Amount::from_dollars(100.0), Currency::Usd, Some("scenario-deposit"), "system")
            .await
            .unwrap();

        assert_eq!(journal.total_debit, Amount::from_dollars(100.0));
        let wallet = coordinator.wallet_snapshot("player-1").await;
        assert_eq!(wallet.balance(Currency::Usd), Amount::from_dollars(100.0));
    }

    #[tokio::test]
    async fn withdraw_with_processing_fee_carves_the_fee_out_of_the_requested_amount() {
        let coordinator = coordinator();
        coordinator.deposit("player-2", Amount::from_dollars(200.0), Currency::Usd, None, "system").await.unwrap();

        let journal = coordinator
            .withdraw("player-2", Amount::from_dollars(50.0), Amount::from_cents(250), Currency::Usd, None, "system")
            .await
            .unwrap();

        let wallet = coordinator.wallet_snapshot("player-2").await;
        assert_eq!(wallet.balance(Currency::Usd), Amount::from_dollars(200.0) - Amount::from_dollars(50.0));
        assert_eq!(journal.metadata.get("fee").map(String::as_str), Some("2.50"));
        assert_eq!(journal.metadata.get("net_amount").map(String::as_str), Some("47.50"));
    }

    #[tokio::test]
    async fn entry_fee_then_prize_round_trip_matches_expected_net_position() {
        let coordinator = coordinator();
        coordinator.deposit("player-3", Amount::from_dollars(20.0), Currency::Usd, None, "system").await.unwrap();

        coordinator.deduct_entry_fee("player-3", Amount::from_dollars(5.0), Currency::Usd, None, "system").await.unwrap();
        coordinator
            .add_prize("player-3", Amount::from_dollars(15.0), Currency::Usd, Amount::from_dollars(1_000.0), None, "system")
            .await
            .unwrap();

        let wallet = coordinator.wallet_snapshot("player-3").await;
        assert_eq!(wallet.balance(Currency::Usd), Amount::from_dollars(30.0));
        assert_eq!(wallet.cumulative_winnings, Amount::from_dollars(15.0));
    }

    #[tokio::test]
    async fn prize_exceeding_the_daily_cap_is_rejected_and_leaves_books_untouched() {
        let coordinator = coordinator();
        let cap = Amount::from_dollars(100.0);
        coordinator.add_prize("player-4", Amount::from_dollars(80.0), Currency::Usd, cap, None, "system").await.unwrap();

        let before = coordinator.ledger().trial_balance().await;
        let rejected = coordinator.add_prize("player-4", Amount::from_dollars(30.0), Currency::Usd, cap, None, "system").await;
        assert!(rejected.is_err());

        let after = coordinator.ledger().trial_balance().await;
        assert_eq!(before.total_debit_balances, after.total_debit_balances);
    }

    #[tokio::test]
    async fn saga_rollback_leaves_the_ledger_balanced_after_a_wallet_side_failure() {
        let coordinator = coordinator();
        // Withdrawing without ever depositing fails the wallet-side step,
        // forcing the coordinator to compensate the ledger posting.
        let result = coordinator
            .withdraw("player-5", Amount::from_dollars(10.0), Amount::ZERO, Currency::Usd, None, "system")
            .await;
        assert!(result.is_err());
        assert!(coordinator.ledger().trial_balance().await.is_balanced);
        assert!(coordinator.ledger().verify_chain().await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_deposits_with_the_same_idempotency_key_only_apply_once() {
        let coordinator = Arc::new(coordinator());
        let mut handles = Vec::new();
        for _ in 0..5 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .deposit("player-6", Amount::from_dollars(10.0), Currency::Usd, Some("concurrent-deposit"), "system")
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1, "only the first concurrent call with a shared idempotency key should post");

        let wallet = coordinator.wallet_snapshot("player-6").await;
        assert_eq!(wallet.balance(Currency::Usd), Amount::from_dollars(10.0));
    }

    #[tokio::test]
    async fn manual_adjustment_credit_then_debit_nets_to_zero() {
        let coordinator = coordinator();
        coordinator
            .credit_wallet("player-7", Amount::from_dollars(25.0), Currency::Usd, "goodwill credit", "support-agent")
            .await
            .unwrap();
        coordinator
            .debit_wallet("player-7", Amount::from_dollars(25.0), Currency::Usd, "reversing goodwill credit", "support-agent")
            .await
            .unwrap();

        let wallet = coordinator.wallet_snapshot("player-7").await;
        assert_eq!(wallet.balance(Currency::Usd), Amount::ZERO);
        assert!(coordinator.ledger().trial_balance().await.is_balanced);
    }

    #[tokio::test]
    async fn get_transactions_filters_by_currency_and_respects_the_limit() {
        use crate::commands::TransactionQuery;

        let coordinator = coordinator();
        coordinator.deposit("player-8", Amount::from_dollars(10.0), Currency::Usd, None, "system").await.unwrap();
        coordinator.deposit("player-8", Amount::from_dollars(20.0), Currency::Usd, None, "system").await.unwrap();
        coordinator.deposit("player-8", Amount::from_dollars(30.0), Currency::Usdc, None, "system").await.unwrap();

        let query = TransactionQuery::new("player-8").with_limit(1);
        let page = coordinator.get_transactions(&query).await;
        assert_eq!(page.len(), 1);

        let usd_only = TransactionQuery { currency: Some(Currency::Usd), ..TransactionQuery::new("player-8").with_limit(10) };
        let usd_entries = coordinator.get_transactions(&usd_only).await;
        assert!(usd_entries.iter().all(|e| e.currency == Currency::Usd));
        assert_eq!(usd_entries.len(), usd_entries.iter().filter(|e| e.currency == Currency::Usd).count());
    }

    #[tokio::test]
    async fn get_transactions_filters_by_operation_type() {
        use crate::commands::TransactionQuery;
        use wallet_ledger::TransactionType;

        let coordinator = coordinator();
        coordinator.deposit("player-9", Amount::from_dollars(100.0), Currency::Usd, None, "system").await.unwrap();
        coordinator.withdraw("player-9", Amount::from_dollars(10.0), Amount::ZERO, Currency::Usd, None, "system").await.unwrap();

        let withdrawals_only = TransactionQuery { operation_type: Some(TransactionType::Withdrawal), ..TransactionQuery::new("player-9").with_limit(10) };
        let entries = coordinator.get_transactions(&withdrawals_only).await;
        assert_eq!(entries.len(), 2, "the fee-free withdrawal has exactly one debit and one credit leg");

        let deposits_only = TransactionQuery { operation_type: Some(TransactionType::Deposit), ..TransactionQuery::new("player-9").with_limit(10) };
        assert_eq!(coordinator.get_transactions(&deposits_only).await.len(), 2);
    }
}
