//! Deposit, withdraw and input validation.

mod common;

use alloy::primitives::U256;
use common::*;
use freya::{ErrorKind, FreyaError, OperationKind, OperationState, TokenAmount, TransferRequest};
use freya_error::WalletError;
use freya_testing::{
    chains, non_positive_amount, Call, EdgeCaseAddresses, EdgeCaseAmounts, Failure, Method, TestBed,
};
use proptest::prelude::*;

mod deposit_tests {
    use super::*;

    #[tokio::test]
    async fn test_deposit_increases_bridged_balance_by_amount() {
        let bed = TestBed::new();
        let orchestrator = connected(&bed).await;
        let before = orchestrator.balances().bridged_balance(chains::BASE_SEPOLIA).unwrap().raw;

        let receipt = orchestrator.deposit(&amount("1.25")).await.unwrap();

        let after = orchestrator.balances().bridged_balance(chains::BASE_SEPOLIA).unwrap();
        assert_eq!(after.raw - before, units("1.25", 18));
        assert!(after.is_fresh());
        assert_eq!(receipt.kind, OperationKind::Deposit);
        assert_eq!(receipt.chain_id, chains::BASE_SEPOLIA);
        assert_eq!(receipt.amount, units("1.25", 18));
        assert_eq!(
            bed.ledger.native_balance(chains::BASE_SEPOLIA, bed.account),
            U256::from(TestBed::NATIVE_SEED_WEI) - units("1.25", 18)
        );
    }

    #[tokio::test]
    async fn test_deposit_narrative() {
        let bed = TestBed::new();
        let orchestrator = connected(&bed).await;

        orchestrator.deposit(&amount("1")).await.unwrap();

        let status = orchestrator.status();
        assert_eq!(status.phases, vec!["Depositing...", "Deposit successful!"]);
        assert_eq!(orchestrator.state(), OperationState::Succeeded { kind: OperationKind::Deposit });
    }

    #[tokio::test]
    async fn test_deposit_on_chain_the_wallet_moved_to() {
        let bed = TestBed::new();
        let orchestrator = connected(&bed).await;
        bed.wallet.user_switches_to(chains::UNICHAIN);

        let receipt = orchestrator.deposit(&amount("0.5")).await.unwrap();

        assert_eq!(receipt.chain_id, chains::UNICHAIN);
        assert_eq!(bed.ledger.token_balance(chains::UNICHAIN, bed.account), units("0.5", 18));
        assert!(!orchestrator.balances().native_balance(chains::BASE_SEPOLIA).unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_deposit_rejection_is_verbatim_and_not_retried() {
        let bed = TestBed::new();
        bed.ledger.fail_next(Method::Deposit, Failure::Reject("insufficient funds for gas".into()));
        let orchestrator = connected(&bed).await;

        let err = orchestrator.deposit(&amount("1")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert!(err.to_string().contains("insufficient funds for gas"));
        assert_eq!(bed.journal.count(|c| matches!(c, Call::Deposit { .. })), 1);
        assert_eq!(bed.journal.count(|c| matches!(c, Call::Confirmed { .. })), 0);
        assert_eq!(orchestrator.status().latest(), Some(format!("Failed: {err}").as_str()));
    }

    #[tokio::test]
    async fn test_deposit_more_than_native_balance_reverts() {
        let bed = TestBed::new();
        let orchestrator = connected(&bed).await;

        let err = orchestrator.deposit(&amount("11")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert_eq!(bed.ledger.token_balance(chains::BASE_SEPOLIA, bed.account), U256::ZERO);
    }
}

mod withdraw_tests {
    use super::*;

    #[tokio::test]
    async fn test_withdraw_converts_with_contract_decimals() {
        let bed = TestBed::new();
        bed.ledger.set_decimals(chains::BASE_SEPOLIA, 6);
        bed.ledger.set_token_balance(chains::BASE_SEPOLIA, bed.account, units("5", 6));
        let orchestrator = connected(&bed).await;

        let receipt = orchestrator.withdraw(&amount("2.5")).await.unwrap();

        assert_eq!(receipt.amount, U256::from(2_500_000u64));
        assert!(bed.journal.calls().contains(&Call::Withdraw {
            chain_id: chains::BASE_SEPOLIA,
            from: bed.account,
            amount: U256::from(2_500_000u64),
        }));
        assert_eq!(bed.ledger.token_balance(chains::BASE_SEPOLIA, bed.account), units("2.5", 6));
        assert_eq!(orchestrator.status().phases, vec!["Withdrawing...", "Withdraw successful!"]);
    }

    #[tokio::test]
    async fn test_withdraw_reads_decimals_at_call_time() {
        let bed = TestBed::new();
        bed.ledger.set_token_balance(chains::BASE_SEPOLIA, bed.account, units("5", 18));
        let orchestrator = connected(&bed).await;
        bed.ledger.set_decimals(chains::BASE_SEPOLIA, 8);

        let receipt = orchestrator.withdraw(&amount("1")).await.unwrap();

        assert_eq!(receipt.amount, U256::from(100_000_000u64));
    }

    #[tokio::test]
    async fn test_withdraw_too_precise_fails_before_write() {
        let bed = TestBed::new();
        bed.ledger.set_decimals(chains::BASE_SEPOLIA, 6);
        let orchestrator = connected(&bed).await;

        for text in EdgeCaseAmounts::too_precise_for_six_decimals() {
            let err = orchestrator.withdraw(&amount(text)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{text}");
        }
        assert_eq!(bed.journal.count(|c| matches!(c, Call::Withdraw { .. })), 0);
        assert!(matches!(
            orchestrator.state(),
            OperationState::Failed { kind: OperationKind::Withdraw, error: FreyaError::InvalidInput(_) }
        ));
    }

    #[tokio::test]
    async fn test_withdraw_blocked_when_chain_changes_during_decimals_read() {
        let bed = TestBed::new();
        bed.ledger.set_token_balance(chains::BASE_SEPOLIA, bed.account, units("5", 18));
        let orchestrator = connected(&bed).await;
        let gate = bed.ledger.hold(Method::Decimals);

        let withdraw_amount = amount("1");
        let (result, ()) = tokio::join!(orchestrator.withdraw(&withdraw_amount), async {
            gate.reached().await;
            bed.wallet.user_switches_to(chains::ZORA);
            gate.release();
        });

        assert_eq!(result.unwrap_err().kind(), ErrorKind::SwitchRejected);
        assert_eq!(bed.journal.count(|c| matches!(c, Call::Withdraw { .. })), 0);
        assert_eq!(bed.ledger.token_balance(chains::BASE_SEPOLIA, bed.account), units("5", 18));
    }

    #[tokio::test]
    async fn test_withdraw_decimals_read_failure() {
        let bed = TestBed::new();
        let orchestrator = connected(&bed).await;
        bed.ledger.fail_next(Method::Decimals, Failure::Reject("rpc timeout".into()));

        let err = orchestrator.withdraw(&amount("1")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert_eq!(bed.journal.count(|c| matches!(c, Call::Withdraw { .. })), 0);
    }
}

mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_edge_case_amounts_are_rejected_without_calls() {
        let bed = TestBed::new();
        let orchestrator = connected(&bed).await;

        for text in EdgeCaseAmounts::invalid() {
            let err = match TokenAmount::parse(text) {
                Ok(parsed) => orchestrator.deposit(&parsed).await.unwrap_err(),
                Err(e) => FreyaError::from(e),
            };
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{text:?}");
        }
        assert!(bed.journal.is_empty());
        assert_eq!(orchestrator.state(), OperationState::Idle);
    }

    #[tokio::test]
    async fn test_bad_recipients_are_rejected_without_calls() {
        let bed = TestBed::new();
        let orchestrator = connected(&bed).await;

        for recipient in EdgeCaseAddresses::invalid() {
            let request = TransferRequest::new(amount("1"), BASE, OPTIMISM, recipient);
            let err = orchestrator.bridge(&request).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{recipient:?}");
        }
        assert!(bed.journal.is_empty());
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let bed = TestBed::new();
        let orchestrator = orchestrator(&bed);

        assert_eq!(orchestrator.deposit(&amount("1")).await.unwrap_err(), FreyaError::NoSigner);
        assert_eq!(orchestrator.withdraw(&amount("1")).await.unwrap_err(), FreyaError::NoSigner);
        assert_eq!(
            orchestrator.bridge(&request("1", BASE, OPTIMISM)).await.unwrap_err(),
            FreyaError::NoSigner
        );
        assert!(bed.journal.is_empty());
        assert_eq!(orchestrator.state(), OperationState::Idle);
    }

    #[test]
    fn test_request_uses_default_route() {
        let bed = TestBed::new();
        let orchestrator = orchestrator(&bed);
        let request = orchestrator.request("1.5", RECIPIENT).unwrap();
        assert_eq!(request.source_chain, BASE);
        assert_eq!(request.target_chain, OPTIMISM);
        assert_eq!(request.amount, amount("1.5"));
        assert_eq!(orchestrator.default_route(), (BASE, OPTIMISM));

        let rerouted = common::orchestrator(&bed).with_default_route(ZORA, "0x82").unwrap();
        assert_eq!(rerouted.default_route(), (ZORA, "0x82"));
        assert!(common::orchestrator(&bed).with_default_route("0x1", BASE).is_err());
    }

    proptest! {
        #[test]
        fn test_non_positive_amounts_make_zero_calls(amount in non_positive_amount()) {
            let bed = TestBed::new();
            let results = tokio_test::block_on(async {
                let orchestrator = connected(&bed).await;
                vec![
                    orchestrator.deposit(&amount).await.map(|_| ()),
                    orchestrator.withdraw(&amount).await.map(|_| ()),
                    orchestrator
                        .bridge(&TransferRequest::new(amount, BASE, OPTIMISM, RECIPIENT))
                        .await
                        .map(|_| ()),
                ]
            });
            for result in results {
                prop_assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::InvalidInput));
            }
            prop_assert!(bed.journal.is_empty());
        }
    }
}

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_reads_initial_balances() {
        let bed = TestBed::new();
        bed.ledger.set_token_balance(chains::BASE_SEPOLIA, bed.account, units("0.75", 18));
        let orchestrator = orchestrator(&bed);

        assert_eq!(orchestrator.connect().await.unwrap(), bed.account);

        let native = orchestrator.balances().native_balance(chains::BASE_SEPOLIA).unwrap();
        assert_eq!(native.raw, U256::from(TestBed::NATIVE_SEED_WEI));
        let bridged = orchestrator.balances().bridged_balance(chains::BASE_SEPOLIA).unwrap();
        assert_eq!(bridged.formatted, "0.750000000000000000");
    }

    #[tokio::test]
    async fn test_connect_rejected_by_user() {
        let bed = TestBed::new();
        bed.wallet.fail_connect(WalletError::UserRejected("User denied account access".into()));
        let orchestrator = orchestrator(&bed);

        let err = orchestrator.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserRejected);
        assert!(!orchestrator.session().is_connected());
    }

    #[tokio::test]
    async fn test_switch_chain_refreshes_balances() {
        let bed = TestBed::new();
        let orchestrator = connected(&bed).await;

        orchestrator.switch_chain(ZORA).await.unwrap();

        assert_eq!(orchestrator.session().active_chain_id(), Some(chains::ZORA));
        assert!(orchestrator.balances().native_balance(chains::ZORA).unwrap().is_fresh());
        assert!(!orchestrator.balances().native_balance(chains::BASE_SEPOLIA).unwrap().is_fresh());
        assert_eq!(
            orchestrator.switch_chain("0x1").await.unwrap_err().kind(),
            ErrorKind::UnsupportedChain
        );
    }

    #[tokio::test]
    async fn test_disconnect_blocks_operations() {
        let bed = TestBed::new();
        let orchestrator = connected(&bed).await;
        bed.wallet.set_accounts(vec![]);

        assert_eq!(orchestrator.deposit(&amount("1")).await.unwrap_err(), FreyaError::NoSigner);
    }
}
