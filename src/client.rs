use crate::ui;
use alloy::primitives::{
    Address,
    address,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use red_packet::{
    ActionKind,
    ActionOutcome,
    ChainChangePolicy,
    ContractAddresses,
    Playground,
    chain::WalletEvent,
    controller::{
        ActionGroup,
        PendingAction,
        StorageDraft,
        TransferDraft,
    },
    deployment::{
        DeploymentEnv,
        DeploymentRecord,
        DeploymentStore,
    },
    observer::WalletWatcher,
    rpc::RpcClient,
    session::WalletSession,
    snapshot::{
        ClaimRecord,
        ContractSnapshot,
        DataRecord,
        TransferRecord,
    },
    wallets,
};
use std::{
    path::PathBuf,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    debug,
    info,
    warn,
};

pub const DEFAULT_LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_SEPOLIA_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const DEFAULT_MAINNET_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";
/// Where a fresh hardhat node puts the Red, DataLogger and USDTDataStorage
/// deployments.
pub const LOCAL_RED_PACKET: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
pub const LOCAL_DATA_LOGGER: Address = address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");
pub const LOCAL_DATA_STORAGE: Address = address!("0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9");
const WALLET_POLL_INTERVAL: Duration = Duration::from_secs(2);
const LOCAL_RECEIPT_POLL: Duration = Duration::from_millis(250);

type AppPlayground = Playground<RpcClient, RpcClient, RpcClient>;

#[derive(Clone, Debug)]
pub enum NetworkTarget {
    Local { url: String },
    Sepolia { url: String },
    Mainnet { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Local { url }
            | NetworkTarget::Sepolia { url }
            | NetworkTarget::Mainnet { url } => url,
        }
    }

    pub fn deployment_env(&self) -> DeploymentEnv {
        match self {
            NetworkTarget::Local { .. } => DeploymentEnv::Local,
            NetworkTarget::Sepolia { .. } => DeploymentEnv::Sepolia,
            NetworkTarget::Mainnet { .. } => DeploymentEnv::Mainnet,
        }
    }
}

#[derive(Clone, Debug)]
pub enum WalletConfig {
    /// An encrypted keystore file, unlocked with a prompted password.
    Keystore { name: String, dir: PathBuf },
    /// Accounts managed and signed for by the RPC endpoint itself.
    ExternalSigner,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub wallet: WalletConfig,
    pub red_packet: Option<Address>,
    pub data_logger: Option<Address>,
    pub data_storage: Option<Address>,
    pub chain_change: ChainChangePolicy,
}

/// What one frame shows. Captured from the playground between actions and
/// patched from progress updates while one runs.
#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub endpoint: String,
    pub session: WalletSession,
    pub contracts: ContractAddresses,
    pub contract: ContractSnapshot,
    pub claim_records: Vec<ClaimRecord>,
    pub transfer_records: Vec<TransferRecord>,
    pub data_records: Vec<DataRecord>,
    pub red_packet_action: Option<PendingAction>,
    pub transfer_log_action: Option<PendingAction>,
    pub data_storage_action: Option<PendingAction>,
    pub red_packet_busy: bool,
    pub transfer_log_busy: bool,
    pub data_storage_busy: bool,
    pub deposit_input: String,
    pub transfer_draft: TransferDraft,
    pub storage_draft: StorageDraft,
    pub status: String,
    pub errors: Vec<String>,
}

impl AppSnapshot {
    fn capture(playground: &AppPlayground, endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            session: playground.session().clone(),
            contracts: playground.contracts(),
            contract: playground.snapshot().clone(),
            claim_records: playground.claim_records().to_vec(),
            transfer_records: playground.transfer_records().to_vec(),
            data_records: playground.data_records().to_vec(),
            red_packet_action: playground.pending(ActionGroup::RedPacket).cloned(),
            transfer_log_action: playground.pending(ActionGroup::TransferLog).cloned(),
            data_storage_action: playground.pending(ActionGroup::DataStorage).cloned(),
            red_packet_busy: playground.is_in_flight(ActionGroup::RedPacket),
            transfer_log_busy: playground.is_in_flight(ActionGroup::TransferLog),
            data_storage_busy: playground.is_in_flight(ActionGroup::DataStorage),
            deposit_input: playground.deposit_input.clone(),
            transfer_draft: playground.transfer_draft.clone(),
            storage_draft: playground.storage_draft.clone(),
            status: playground.status().to_owned(),
            errors: playground.recent_errors(),
        }
    }

    fn apply_progress(&mut self, action: PendingAction) {
        let busy = action.status.is_busy();
        if !action.message.is_empty() {
            self.status = action.message.clone();
            self.errors.clear();
        }
        match action.kind.group() {
            ActionGroup::RedPacket => {
                self.red_packet_busy = busy;
                self.red_packet_action = Some(action);
            }
            ActionGroup::TransferLog => {
                self.transfer_log_busy = busy;
                self.transfer_log_action = Some(action);
            }
            ActionGroup::DataStorage => {
                self.data_storage_busy = busy;
                self.data_storage_action = Some(action);
            }
        }
    }
}

/// Picks contract addresses: flags first, then the deployment record for the
/// endpoint, then the hardhat defaults on a local chain.
fn resolve_contracts(
    config: &AppConfig,
    record: Option<&DeploymentRecord>,
) -> Result<ContractAddresses> {
    let local = matches!(config.network, NetworkTarget::Local { .. });
    let pick = |flag: Option<Address>,
                from_record: Option<Address>,
                local_default: Address,
                name: &str|
     -> Result<Address> {
        flag.or(from_record)
            .or(local.then_some(local_default))
            .ok_or_else(|| {
                eyre!(
                    "No {name} address for {}; pass it explicitly or record a deployment under .deployments/{}",
                    config.network.url(),
                    config.network.deployment_env().dir_name()
                )
            })
    };
    Ok(ContractAddresses {
        red_packet: pick(
            config.red_packet,
            record.map(|r| r.red_packet_address),
            LOCAL_RED_PACKET,
            "Red contract",
        )?,
        data_logger: pick(
            config.data_logger,
            record.map(|r| r.data_logger_address),
            LOCAL_DATA_LOGGER,
            "DataLogger contract",
        )?,
        data_storage: pick(
            config.data_storage,
            record.and_then(|r| r.data_storage_address),
            LOCAL_DATA_STORAGE,
            "USDTDataStorage contract",
        )?,
    })
}

fn load_contracts(config: &AppConfig) -> Result<ContractAddresses> {
    let all_flagged = config.red_packet.is_some()
        && config.data_logger.is_some()
        && config.data_storage.is_some();
    let record = if all_flagged {
        None
    } else {
        let store = DeploymentStore::new(config.network.deployment_env())?;
        store
            .latest_for(config.network.url())
            .wrap_err_with(|| format!("reading {}", store.path().display()))?
    };
    if let Some(record) = &record {
        info!(deployed_at = %record.deployed_at, "using recorded deployment");
    }
    resolve_contracts(config, record.as_ref())
}

fn build_rpc_client(config: &AppConfig) -> Result<RpcClient> {
    let url = config.network.url();
    let client = match &config.wallet {
        WalletConfig::Keystore { name, dir } => {
            let descriptor = wallets::find_keystore(dir, name)?;
            let signer = wallets::unlock_keystore(&descriptor)?;
            RpcClient::with_local_signer(url, signer)?
        }
        WalletConfig::ExternalSigner => RpcClient::with_node_signer(url)?,
    };
    Ok(match config.network {
        NetworkTarget::Local { .. } => client.with_receipt_poll(LOCAL_RECEIPT_POLL),
        _ => client,
    })
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let contracts = load_contracts(&config)?;
    let rpc = build_rpc_client(&config)?;
    info!(
        red_packet = %contracts.red_packet,
        data_logger = %contracts.data_logger,
        data_storage = %contracts.data_storage,
        policy = %config.chain_change,
        "playground configured"
    );
    let playground = Playground::new(rpc.clone(), rpc.clone(), rpc.clone(), contracts)
        .with_chain_change_policy(config.chain_change);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        playground,
        rpc,
        config.network.url(),
        &mut ui_state,
        &mut input_events,
    )
    .await;
    ui::terminal_exit()?;
    res
}

fn show_processing_status(
    ui_state: &mut ui::UiState,
    snapshot: &mut AppSnapshot,
    message: impl Into<String>,
    context: &'static str,
) -> Result<()> {
    snapshot.status = message.into();
    snapshot.errors.clear();
    ui::draw(ui_state, snapshot).wrap_err(context)
}

enum WatcherCommand {
    /// The app connected or disconnected by itself; don't report that back.
    Rebaseline(Vec<Address>),
    Shutdown,
}

async fn wallet_watcher(
    poll_interval: Duration,
    rpc: RpcClient,
    mut cmd_rx: mpsc::UnboundedReceiver<WatcherCommand>,
    event_tx: mpsc::UnboundedSender<WalletEvent>,
) -> Result<()> {
    async fn poll(
        rpc: &RpcClient,
        watcher: &mut WalletWatcher,
        event_tx: &mpsc::UnboundedSender<WalletEvent>,
    ) -> Result<()> {
        let (accounts, chain_id) = tokio::try_join!(rpc.authorized_accounts(), rpc.chain_id())
            .wrap_err("polling the wallet failed")?;
        for event in watcher.observe(accounts, chain_id) {
            event_tx
                .send(event)
                .map_err(|_| eyre!("wallet event receiver dropped"))?;
        }
        Ok(())
    }

    let mut watcher = WalletWatcher::new();
    let mut ticker = time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = poll(&rpc, &mut watcher, &event_tx).await {
                    warn!(?err, "wallet poll failed");
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(WatcherCommand::Rebaseline(accounts)) => {
                        watcher.reset_accounts(accounts);
                    }
                    Some(WatcherCommand::Shutdown) | None => break,
                }
            }
        }
    }
    Ok(())
}

struct LoopIo<'a> {
    ui_state: &'a mut ui::UiState,
    input_events: &'a mut ui::InputEventReceiver,
    progress_rx: mpsc::UnboundedReceiver<PendingAction>,
    wallet_event_rx: mpsc::UnboundedReceiver<WalletEvent>,
}

enum ActionEnd {
    Settled(Vec<WalletEvent>),
    Quit,
}

/// Drives one action to completion while keeping the screen live: progress
/// updates are drawn, Esc abandons the confirmation wait, and wallet events
/// are held back until the action settles.
async fn drive_action(
    playground: &mut AppPlayground,
    kind: ActionKind,
    endpoint: &str,
    io: &mut LoopIo<'_>,
) -> Result<ActionEnd> {
    let mut snapshot = AppSnapshot::capture(playground, endpoint);
    let abandon = playground.abandon_handle();
    let mut deferred = Vec::new();
    let outcome = {
        let run = playground.run(kind);
        tokio::pin!(run);
        loop {
            tokio::select! {
                outcome = &mut run => break Some(outcome),
                Some(progress) = io.progress_rx.recv() => {
                    snapshot.apply_progress(progress);
                    ui::draw(io.ui_state, &snapshot)
                        .wrap_err("draw after action progress failed")?;
                }
                Some(event) = io.wallet_event_rx.recv() => {
                    debug!(?event, "deferring wallet event until the action settles");
                    deferred.push(event);
                }
                _ = tokio::signal::ctrl_c() => break None,
                raw_ev = ui::next_raw_event(io.input_events) => {
                    match ui::interpret_event(io.ui_state, raw_ev?) {
                        Some(ui::UserEvent::Abandon) => abandon.abandon(),
                        Some(ui::UserEvent::Quit) => break None,
                        Some(ui::UserEvent::Redraw) => {
                            ui::draw(io.ui_state, &snapshot)
                                .wrap_err("draw during action failed")?;
                        }
                        Some(other) => debug!(?other, "input ignored while an action is in flight"),
                        None => {}
                    }
                }
            }
        }
    };
    while io.progress_rx.try_recv().is_ok() {}
    match outcome {
        Some(outcome) => {
            match &outcome {
                ActionOutcome::Succeeded { handle, refresh } => info!(
                    ?kind,
                    hash = %handle.hash,
                    failed_reads = refresh.failed.len(),
                    "action succeeded"
                ),
                ActionOutcome::Failed(err) => warn!(?kind, error = %err, "action failed"),
                ActionOutcome::Rejected(err) => info!(?kind, error = %err, "action rejected"),
                ActionOutcome::Ignored => debug!(?kind, "action ignored"),
            }
            Ok(ActionEnd::Settled(deferred))
        }
        None => {
            warn!(?kind, "quitting with an action in flight");
            Ok(ActionEnd::Quit)
        }
    }
}

async fn run_loop(
    mut playground: AppPlayground,
    rpc: RpcClient,
    endpoint: &str,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    tracing::info!("Running app loop");
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    playground.set_progress_listener(progress_tx);

    let mut snapshot = AppSnapshot::capture(&playground, endpoint);
    show_processing_status(
        ui_state,
        &mut snapshot,
        "Looking for an authorized account...",
        "initial draw failed",
    )?;
    playground.init_probe().await;
    ui::draw(ui_state, &AppSnapshot::capture(&playground, endpoint))
        .wrap_err("draw after initial probe failed")?;

    let (watch_cmd_tx, watch_cmd_rx) = mpsc::unbounded_channel();
    let (wallet_event_tx, wallet_event_rx) = mpsc::unbounded_channel();
    let watcher_handle = tokio::spawn(wallet_watcher(
        WALLET_POLL_INTERVAL,
        rpc,
        watch_cmd_rx,
        wallet_event_tx,
    ));
    let mut io = LoopIo {
        ui_state,
        input_events,
        progress_rx,
        wallet_event_rx,
    };
    let mut watcher_closed = false;

    loop {
        let mut pending_events = Vec::new();
        tokio::select! {
            maybe_event = io.wallet_event_rx.recv() => {
                match maybe_event {
                    Some(event) => pending_events.push(event),
                    None => {
                        warn!("wallet watcher channel closed");
                        watcher_closed = true;
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
            raw_ev = ui::next_raw_event(io.input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(io.ui_state, event) else {
                    continue;
                };
                let mut snapshot = AppSnapshot::capture(&playground, endpoint);
                let kind = match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw | ui::UserEvent::Abandon => None,
                    ui::UserEvent::Connect => {
                        show_processing_status(
                            io.ui_state,
                            &mut snapshot,
                            "Connecting...",
                            "draw while connecting failed",
                        )?;
                        if let Err(err) = playground.connect().await {
                            debug!(error = %err, "connect did not complete");
                        }
                        let accounts = playground.session().address.into_iter().collect();
                        let _ = watch_cmd_tx.send(WatcherCommand::Rebaseline(accounts));
                        None
                    }
                    ui::UserEvent::Disconnect => {
                        playground.disconnect();
                        let _ = watch_cmd_tx.send(WatcherCommand::Rebaseline(Vec::new()));
                        None
                    }
                    ui::UserEvent::Refresh => {
                        show_processing_status(
                            io.ui_state,
                            &mut snapshot,
                            "Refreshing...",
                            "draw while refreshing failed",
                        )?;
                        playground.reload().await;
                        None
                    }
                    ui::UserEvent::Claim => Some(ActionKind::Claim),
                    ui::UserEvent::Clear => Some(ActionKind::Clear),
                    ui::UserEvent::ConfirmDeposit(amount) => {
                        playground.deposit_input = amount;
                        Some(ActionKind::Deposit)
                    }
                    ui::UserEvent::ConfirmLog(draft) => {
                        playground.transfer_draft = draft;
                        Some(ActionKind::SubmitLog)
                    }
                    ui::UserEvent::ConfirmStore(draft) => {
                        playground.storage_draft = draft;
                        Some(ActionKind::StoreData)
                    }
                };
                if let Some(kind) = kind {
                    match drive_action(&mut playground, kind, endpoint, &mut io).await? {
                        ActionEnd::Settled(deferred) => pending_events = deferred,
                        ActionEnd::Quit => break,
                    }
                }
            }
        }
        for event in pending_events {
            playground.on_wallet_event(event).await;
        }
        ui::draw(io.ui_state, &AppSnapshot::capture(&playground, endpoint))
            .wrap_err("draw after update failed")?;
    }

    let _ = watch_cmd_tx.send(WatcherCommand::Shutdown);
    match watcher_handle.await {
        Ok(Ok(())) => {
            if watcher_closed {
                return Err(eyre!(
                    "Wallet watcher exited unexpectedly; check the RPC connection"
                ));
            }
        }
        Ok(Err(err)) => {
            return Err(err).wrap_err("wallet watcher failed");
        }
        Err(err) => {
            return Err(eyre!(err)).wrap_err("wallet watcher panicked");
        }
    }
    Ok(())
}
