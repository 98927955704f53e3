use red_packet::{
    ActionError,
    ChainChangePolicy,
    ChainError,
    chain::WalletEvent,
    controller::{
        CONNECT_PROMPT,
        TransferDraft,
    },
    observer::WalletWatcher,
    snapshot::ContractSnapshot,
    test_helpers::*,
};

const SEPOLIA_CHAIN_ID: u64 = 11155111;

/// Alice holds 10 ETH but has not yet granted the app access.
fn unauthorized_context() -> TestContext {
    let wallet = FakeWallet::new(vec![alice()]);
    wallet.set_balance(alice(), eth(10));
    TestContext {
        caller: FakeCaller::linked_to(&wallet).with_defaults(bob()),
        wallet,
        waiter: FakeWaiter::new(),
    }
}

#[tokio::test]
async fn init_probe__without_authorization_asks_to_connect() {
    // given
    let ctx = unauthorized_context();
    let mut playground = ctx.playground();

    // when
    let probed = playground.init_probe().await;

    // then
    assert_eq!(probed, None);
    assert_eq!(ctx.wallet.requests(), 0);
    assert_eq!(playground.status(), CONNECT_PROMPT);
    assert!(!playground.session().is_connected());
}

#[tokio::test]
async fn connect__adopts_first_account_and_refreshes() {
    // given
    let ctx = unauthorized_context();
    let mut playground = ctx.playground();

    // when
    let connected = playground.connect().await;

    // then
    assert_eq!(connected, Ok(alice()));
    assert_eq!(ctx.wallet.requests(), 1);
    assert_eq!(playground.session().address, Some(alice()));
    assert_eq!(playground.session().balance, Some(eth(10)));
    assert_eq!(
        playground.session().network.as_ref().map(|n| n.chain_id),
        Some(HARDHAT_CHAIN_ID)
    );
    assert_eq!(playground.snapshot().owner, Some(bob()));
    assert_eq!(playground.status(), "Wallet connected");
}

#[tokio::test]
async fn connect__user_rejection_leaves_session_empty() {
    // given
    let ctx = unauthorized_context();
    ctx.wallet.reject_requests(ChainError::user_rejected());
    let mut playground = ctx.playground();

    // when
    let connected = playground.connect().await;

    // then
    assert_eq!(
        connected,
        Err(ActionError::CallRejectedByUser(String::from(
            "User rejected the request."
        )))
    );
    assert!(!playground.session().is_connected());
    assert_eq!(
        playground.status(),
        "Connection failed: User rejected the request."
    );
    assert_eq!(
        playground.recent_errors(),
        vec![String::from("User rejected the request.")]
    );
}

#[tokio::test]
async fn connect__empty_account_list_is_not_a_connection() {
    // given
    let ctx = unauthorized_context();
    ctx.wallet.set_accounts(Vec::new());
    let mut playground = ctx.playground();

    // when
    let connected = playground.connect().await;

    // then
    assert_eq!(connected, Err(ActionError::NotConnected));
    assert!(!playground.session().is_connected());
}

#[tokio::test]
async fn disconnect__clears_session_and_drafts() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.deposit_input = String::from("2");
    playground.transfer_draft.description = String::from("rent");

    // when
    playground.disconnect();

    // then
    assert!(!playground.session().is_connected());
    assert_eq!(playground.snapshot(), &ContractSnapshot::default());
    assert!(playground.deposit_input.is_empty());
    assert_eq!(playground.transfer_draft, TransferDraft::default());
    assert_eq!(playground.status(), "Wallet disconnected");
    assert_eq!(playground.init_probe().await, None);
}

#[tokio::test]
async fn on_wallet_event__account_switch_reloads_for_new_account() {
    // given
    let ctx = TestContext::new();
    ctx.wallet.set_balance(bob(), eth(4));
    let mut playground = ctx.connected_playground().await;

    // when
    let report = playground
        .on_wallet_event(WalletEvent::AccountsChanged(vec![bob(), alice()]))
        .await;

    // then
    assert!(report.is_some_and(|r| r.failed.is_empty()));
    assert_eq!(playground.session().address, Some(bob()));
    assert_eq!(playground.session().balance, Some(eth(4)));
    assert_eq!(playground.status(), format!("Account changed to {}", bob()));
}

#[tokio::test]
async fn on_wallet_event__no_accounts_resets_everything() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.deposit_input = String::from("1");

    // when
    let report = playground
        .on_wallet_event(WalletEvent::AccountsChanged(Vec::new()))
        .await;

    // then
    assert!(report.is_none());
    assert!(!playground.session().is_connected());
    assert_eq!(playground.session().balance, None);
    assert!(playground.claim_records().is_empty());
    assert!(playground.deposit_input.is_empty());
    assert_eq!(playground.status(), CONNECT_PROMPT);
}

#[tokio::test]
async fn on_wallet_event__same_chain_is_ignored() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    let reads_before = ctx.caller.read_calls();

    // when
    let report = playground
        .on_wallet_event(WalletEvent::ChainChanged(HARDHAT_CHAIN_ID))
        .await;

    // then
    assert!(report.is_none());
    assert_eq!(ctx.caller.read_calls(), reads_before);
}

#[tokio::test]
async fn on_wallet_event__chain_switch_full_reload_starts_over() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    playground.deposit_input = String::from("1");
    ctx.wallet.set_chain_id(SEPOLIA_CHAIN_ID);

    // when
    playground
        .on_wallet_event(WalletEvent::ChainChanged(SEPOLIA_CHAIN_ID))
        .await;

    // then
    assert!(playground.deposit_input.is_empty());
    assert_eq!(playground.session().address, Some(alice()));
    assert_eq!(
        playground.session().network.as_ref().map(|n| n.chain_id),
        Some(SEPOLIA_CHAIN_ID)
    );
    assert_eq!(playground.status(), "Wallet connected");
}

#[tokio::test]
async fn on_wallet_event__chain_switch_in_place_keeps_drafts() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx
        .connected_playground()
        .await
        .with_chain_change_policy(ChainChangePolicy::ReloadInPlace);
    playground.deposit_input = String::from("1");
    ctx.wallet.set_chain_id(SEPOLIA_CHAIN_ID);

    // when
    let report = playground
        .on_wallet_event(WalletEvent::ChainChanged(SEPOLIA_CHAIN_ID))
        .await;

    // then
    assert!(report.is_some());
    assert_eq!(playground.deposit_input, "1");
    assert_eq!(
        playground.session().network.as_ref().map(|n| n.chain_id),
        Some(SEPOLIA_CHAIN_ID)
    );
    assert_eq!(
        playground.status(),
        format!("Switched to chain {SEPOLIA_CHAIN_ID}")
    );
}

#[tokio::test]
async fn wallet_watcher__feeds_external_account_switch_into_playground() {
    // given
    let ctx = TestContext::new();
    let mut playground = ctx.connected_playground().await;
    let mut watcher = WalletWatcher::new();
    watcher.observe(vec![alice()], HARDHAT_CHAIN_ID);
    ctx.wallet.set_accounts(vec![bob()]);

    // when
    let events = watcher.observe(vec![bob()], HARDHAT_CHAIN_ID);
    for event in events {
        playground.on_wallet_event(event).await;
    }

    // then
    assert_eq!(playground.session().address, Some(bob()));
}
