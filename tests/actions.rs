use alloy::{
    dyn_abi::DynSolValue,
    primitives::{
        TxHash,
        U256,
    },
    sol_types::{
        Revert,
        SolError,
    },
};
use red_packet::{
    ActionError,
    ActionKind,
    ActionOutcome,
    ActionStatus,
    ChainError,
    abi::{
        data_logger,
        data_storage,
        red_packet as red,
    },
    chain::{
        ReceiptOutcome,
        TxHandle,
    },
    controller::{
        ActionGroup,
        CONNECT_PROMPT,
        STORAGE_FEE,
        StorageDraft,
        TransferDraft,
    },
    test_helpers::*,
};
use tokio::sync::mpsc;

fn milli_eth(milli: u64) -> U256 {
    U256::from(milli) * U256::from(10u64).pow(U256::from(15u64))
}

#[tokio::test]
async fn run__claim_without_wallet_prompts_to_connect() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.playground();

    // when
    let outcome = playground.run(ActionKind::Claim).await;

    // then
    assert_eq!(outcome, ActionOutcome::Rejected(ActionError::NotConnected));
    assert_eq!(playground.status(), CONNECT_PROMPT);
    assert!(ctx.caller.writes().is_empty());
    assert!(!playground.is_in_flight(ActionGroup::RedPacket));
}

#[tokio::test]
async fn run__deposit_moves_funds_clears_input_and_refreshes() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.deposit_input = String::from("1.5");

    // when
    let outcome = playground.run(ActionKind::Deposit).await;

    // then
    let ActionOutcome::Succeeded { handle, refresh } = outcome else {
        panic!("deposit did not succeed: {outcome:?}");
    };
    assert_eq!(handle.hash, TxHash::repeat_byte(1));
    assert!(refresh.failed.is_empty());

    let writes = ctx.caller.writes();
    assert_eq!(writes.len(), 1);
    let (call, from) = &writes[0];
    assert_eq!(call.function, red::DEPOSIT);
    assert_eq!(call.target, contracts().red_packet);
    assert_eq!(call.value, milli_eth(1500));
    assert_eq!(*from, alice());

    assert!(playground.deposit_input.is_empty());
    assert_eq!(playground.session().balance, Some(milli_eth(8500)));
    assert_eq!(playground.snapshot().total_balance, Some(milli_eth(1500)));
    assert_eq!(playground.status(), "Deposited 1.5 ETH");
    assert_eq!(
        playground.pending(ActionGroup::RedPacket).map(|p| p.status),
        Some(ActionStatus::Succeeded)
    );
}

#[tokio::test]
async fn run__reports_each_lifecycle_stage_in_order() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    playground.set_progress_listener(tx);

    // when
    playground.run(ActionKind::Claim).await;

    // then
    let mut seen = Vec::new();
    while let Ok(update) = rx.try_recv() {
        assert_eq!(update.kind, ActionKind::Claim);
        seen.push(update.status);
    }
    assert_eq!(
        seen,
        vec![
            ActionStatus::Idle,
            ActionStatus::Validating,
            ActionStatus::Submitting,
            ActionStatus::Confirming,
            ActionStatus::Succeeded,
        ]
    );
}

#[tokio::test]
async fn run__user_rejection_fails_without_refresh() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.deposit_input = String::from("1");
    ctx.caller.push_write_result(Err(ChainError::user_rejected()));
    let reads_before = ctx.caller.read_calls();

    // when
    let outcome = playground.run(ActionKind::Deposit).await;

    // then
    assert_eq!(
        outcome,
        ActionOutcome::Failed(ActionError::CallRejectedByUser(String::from(
            "User rejected the request."
        )))
    );
    assert_eq!(ctx.caller.read_calls(), reads_before);
    assert_eq!(ctx.waiter.waits(), 0);
    assert_eq!(playground.deposit_input, "1");
    assert_eq!(playground.session().balance, Some(eth(10)));
    assert_eq!(
        playground.recent_errors(),
        vec![String::from("Request rejected: User rejected the request.")]
    );
    assert_eq!(
        playground.status(),
        "Deposit failed: Request rejected: User rejected the request."
    );
    assert_eq!(
        playground.pending(ActionGroup::RedPacket).map(|p| p.status),
        Some(ActionStatus::Failed)
    );
    assert!(!playground.is_in_flight(ActionGroup::RedPacket));
}

#[tokio::test]
async fn run__revert_reason_surfaces_in_dispatch_failure() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    let revert = Revert {
        reason: String::from("red packet is empty"),
    };
    ctx.caller
        .push_write_result(Err(ChainError::reverted(revert.abi_encode())));

    // when
    let outcome = playground.run(ActionKind::Claim).await;

    // then
    assert_eq!(
        outcome,
        ActionOutcome::Failed(ActionError::CallDispatchFailed(String::from(
            "red packet is empty"
        )))
    );
    assert_eq!(
        playground.status(),
        "Claim failed: Transaction failed: red packet is empty"
    );
}

#[tokio::test]
async fn run__reverted_receipt_is_a_confirmation_failure() {
    // given
    let mut ctx = TestContext::new();
    ctx.waiter = FakeWaiter::with_outcome(Ok(ReceiptOutcome {
        success: false,
        block_number: Some(7),
    }));
    let mut playground = ctx.connected_playground().await;
    let reads_before = ctx.caller.read_calls();

    // when
    let outcome = playground.run(ActionKind::Clear).await;

    // then
    assert_eq!(
        outcome,
        ActionOutcome::Failed(ActionError::ConfirmationFailed(String::from(
            "transaction reverted in block 7"
        )))
    );
    assert_eq!(ctx.caller.read_calls(), reads_before);
}

#[tokio::test]
async fn run__in_flight_flag_spans_dispatch_to_settlement() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    let flag = playground.in_flight_flag(ActionGroup::RedPacket);
    let other_group = playground.in_flight_flag(ActionGroup::TransferLog);
    let gate = ctx.waiter.hold();
    assert!(!flag.is_set());

    // when
    let run = playground.run(ActionKind::Claim);
    tokio::pin!(run);
    let first_poll = futures::poll!(&mut run);

    // then
    assert!(first_poll.is_pending());
    assert!(flag.is_set());
    assert!(!other_group.is_set());
    assert_eq!(ctx.caller.writes().len(), 1);

    gate.release();
    let outcome = run.await;
    assert!(matches!(outcome, ActionOutcome::Succeeded { .. }));
    assert!(!flag.is_set());
}

#[tokio::test]
async fn run__dropping_the_action_mid_confirmation_releases_the_group() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    let flag = playground.in_flight_flag(ActionGroup::RedPacket);
    let _gate = ctx.waiter.hold();

    // when
    {
        let run = playground.run(ActionKind::Claim);
        tokio::pin!(run);
        assert!(futures::poll!(&mut run).is_pending());
        assert!(flag.is_set());
    }

    // then
    assert!(!flag.is_set());
    assert_eq!(ctx.caller.writes().len(), 1);
}

#[tokio::test]
async fn run__abandoned_confirmation_fails_and_releases_the_group() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    let flag = playground.in_flight_flag(ActionGroup::RedPacket);
    let abandon = playground.abandon_handle();
    let _gate = ctx.waiter.hold();
    let reads_before = ctx.caller.read_calls();

    // when
    let outcome = {
        let run = playground.run(ActionKind::Claim);
        tokio::pin!(run);
        assert!(futures::poll!(&mut run).is_pending());
        abandon.abandon();
        run.await
    };

    // then
    let ActionOutcome::Failed(ActionError::ConfirmationFailed(message)) = outcome else {
        panic!("expected a confirmation failure, got {outcome:?}");
    };
    assert!(message.contains("may still be pending"), "{message}");
    assert!(!flag.is_set());
    assert_eq!(ctx.caller.read_calls(), reads_before);
}

#[tokio::test]
async fn run__deposit_rejects_bad_amount_before_dispatch() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.deposit_input = String::from("0");

    // when
    let outcome = playground.run(ActionKind::Deposit).await;

    // then
    assert_eq!(outcome, ActionOutcome::Rejected(ActionError::InvalidAmount));
    assert!(ctx.caller.writes().is_empty());
    assert_eq!(playground.deposit_input, "0");
    assert_eq!(
        playground.pending(ActionGroup::RedPacket).map(|p| p.status),
        Some(ActionStatus::Idle)
    );
}

#[tokio::test]
async fn run__submit_log_requires_every_field() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.transfer_draft = TransferDraft {
        from: alice().to_string(),
        to: bob().to_string(),
        amount: String::from("2"),
        description: String::from("   "),
    };

    // when
    let outcome = playground.run(ActionKind::SubmitLog).await;

    // then
    assert_eq!(
        outcome,
        ActionOutcome::Rejected(ActionError::InvalidInput(String::from(
            "Fill in from, to, amount and description"
        )))
    );
    assert!(ctx.caller.writes().is_empty());
}

#[tokio::test]
async fn run__submit_log_rejects_malformed_address() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.transfer_draft = TransferDraft {
        from: alice().to_string(),
        to: String::from("0x1234"),
        amount: String::from("2"),
        description: String::from("rent"),
    };

    // when
    let outcome = playground.run(ActionKind::SubmitLog).await;

    // then
    assert_eq!(
        outcome,
        ActionOutcome::Rejected(ActionError::InvalidInput(String::from(
            "`to` is not a valid address"
        )))
    );
}

#[tokio::test]
async fn run__submit_log_sends_record_and_clears_draft() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.transfer_draft = TransferDraft {
        from: alice().to_string(),
        to: bob().to_string(),
        amount: String::from("2"),
        description: String::from(" rent "),
    };

    // when
    let outcome = playground.run(ActionKind::SubmitLog).await;

    // then
    assert!(matches!(outcome, ActionOutcome::Succeeded { .. }));
    let writes = ctx.caller.writes();
    let (call, _) = &writes[0];
    assert_eq!(call.target, contracts().data_logger);
    assert_eq!(call.function, data_logger::SUBMIT_TRANSFER_RECORD);
    assert!(call.value.is_zero());
    assert_eq!(
        call.args,
        vec![
            DynSolValue::Address(alice()),
            DynSolValue::Address(bob()),
            uint(eth(2)),
            DynSolValue::String(String::from("rent")),
        ]
    );
    assert_eq!(playground.transfer_draft, TransferDraft::default());
    assert_eq!(playground.status(), "Transfer record submitted");
}

#[tokio::test]
async fn run__groups_settle_independently() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    ctx.caller.push_write_result(Ok(TxHandle {
        hash: TxHash::repeat_byte(0x42),
    }));

    // when
    let claim = playground.run(ActionKind::Claim).await;

    // then
    assert!(matches!(
        claim,
        ActionOutcome::Succeeded { handle, .. } if handle.hash == TxHash::repeat_byte(0x42)
    ));
    assert!(playground.pending(ActionGroup::TransferLog).is_none());
}

fn storage_draft(chain_id: u64, amount: &str) -> StorageDraft {
    StorageDraft {
        chain_id,
        amount: String::from(amount),
        data_hash: String::from(" QmRecordHash "),
        metadata: String::from("invoice 7"),
    }
}

#[tokio::test]
async fn run__store_data_pays_fee_and_keeps_chain_choice() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.storage_draft = storage_draft(137, "25");

    // when
    let outcome = playground.run(ActionKind::StoreData).await;

    // then
    assert!(matches!(outcome, ActionOutcome::Succeeded { .. }));
    let writes = ctx.caller.writes();
    let (call, from) = &writes[0];
    assert_eq!(call.target, contracts().data_storage);
    assert_eq!(call.function, data_storage::STORE_DATA_WITH_USDT);
    assert_eq!(call.value, STORAGE_FEE);
    assert_eq!(*from, alice());
    assert_eq!(
        call.args[..4],
        [
            uint(U256::from(137)),
            uint(eth(25)),
            DynSolValue::String(String::from("QmRecordHash")),
            DynSolValue::String(String::from("invoice 7")),
        ]
    );
    assert!(matches!(call.args[4], DynSolValue::FixedBytes(_, 32)));
    assert_eq!(playground.session().balance, Some(eth(10) - STORAGE_FEE));
    assert_eq!(
        playground.storage_draft,
        StorageDraft {
            chain_id: 137,
            ..StorageDraft::default()
        }
    );
    assert_eq!(playground.status(), "Data record stored");
}

#[tokio::test]
async fn run__store_data_requires_every_field() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.storage_draft = StorageDraft {
        metadata: String::new(),
        ..storage_draft(1, "5")
    };

    // when
    let outcome = playground.run(ActionKind::StoreData).await;

    // then
    assert_eq!(
        outcome,
        ActionOutcome::Rejected(ActionError::InvalidInput(String::from(
            "Fill in amount, data hash and metadata"
        )))
    );
    assert!(ctx.caller.writes().is_empty());
}

#[tokio::test]
async fn run__store_data_rejects_unlisted_chain() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.storage_draft = storage_draft(10, "5");

    // when
    let outcome = playground.run(ActionKind::StoreData).await;

    // then
    assert_eq!(
        outcome,
        ActionOutcome::Rejected(ActionError::InvalidInput(String::from(
            "chain 10 is not supported"
        )))
    );
}

#[tokio::test]
async fn run__store_data_rejects_zero_amount() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.storage_draft = storage_draft(56, "0");

    // when
    let outcome = playground.run(ActionKind::StoreData).await;

    // then
    assert_eq!(outcome, ActionOutcome::Rejected(ActionError::InvalidAmount));
    assert_eq!(playground.storage_draft.amount, "0");
    assert!(!playground.is_in_flight(ActionGroup::DataStorage));
}
