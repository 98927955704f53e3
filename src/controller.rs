//! Drives one write from user intent to a confirmed or failed outcome, the
//! same way for every action the playground offers.

use crate::{
    abi::{
        CallSpec,
        ContractInterface,
        data_logger,
        data_storage,
        red_packet,
    },
    amount::validate_amount,
    chain::{
        ContractCaller,
        ReceiptOutcome,
        ReceiptWaiter,
        TxHandle,
        WalletProvider,
    },
    error::ActionError,
    observer::ChainChangePolicy,
    refresh::RefreshReport,
    session::WalletSession,
    snapshot::{
        ClaimRecord,
        ContractSnapshot,
        DataRecord,
        TransferRecord,
    },
};
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{
        Address,
        B256,
        U256,
        keccak256,
    },
};
use chrono::Utc;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{
            AtomicBool,
            Ordering,
        },
    },
};
use tokio::sync::{
    Notify,
    mpsc,
};
use tracing::{
    error,
    info,
    warn,
};

const MAX_ERRORS: usize = 50;
const VISIBLE_ERRORS: usize = 5;
pub const CONNECT_PROMPT: &str = "Please connect a wallet first";
/// Paid with every stored data record: 0.0001 ETH.
pub const STORAGE_FEE: U256 = U256::from_limbs([100_000_000_000_000, 0, 0, 0]);
/// Chains a data record can be filed under.
pub const STORAGE_CHAINS: [(u64, &str); 4] = [
    (1, "Ethereum mainnet"),
    (56, "BSC mainnet"),
    (137, "Polygon"),
    (97, "BSC testnet"),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ActionKind {
    Claim,
    Clear,
    Deposit,
    SubmitLog,
    StoreData,
}

impl ActionKind {
    pub fn group(self) -> ActionGroup {
        match self {
            ActionKind::Claim | ActionKind::Clear | ActionKind::Deposit => {
                ActionGroup::RedPacket
            }
            ActionKind::SubmitLog => ActionGroup::TransferLog,
            ActionKind::StoreData => ActionGroup::DataStorage,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Claim => "Claim",
            ActionKind::Clear => "Clear",
            ActionKind::Deposit => "Deposit",
            ActionKind::SubmitLog => "Submit log",
            ActionKind::StoreData => "Store data",
        };
        write!(f, "{name}")
    }
}

/// Actions sharing a group share one in-flight flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ActionGroup {
    RedPacket,
    TransferLog,
    DataStorage,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionStatus {
    Idle,
    Validating,
    Submitting,
    Confirming,
    Succeeded,
    Failed,
}

impl ActionStatus {
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            ActionStatus::Validating | ActionStatus::Submitting | ActionStatus::Confirming
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub status: ActionStatus,
    pub message: String,
}

/// Everything needed to run one action: the call and what to say on success.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionPlan {
    pub kind: ActionKind,
    pub call: CallSpec,
    pub success_message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    /// Another action of the same group was still in flight.
    Ignored,
    /// Stopped before any call was made.
    Rejected(ActionError),
    Succeeded {
        handle: TxHandle,
        refresh: RefreshReport,
    },
    Failed(ActionError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ContractAddresses {
    pub red_packet: Address,
    pub data_logger: Address,
    pub data_storage: Address,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransferDraft {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub description: String,
}

impl TransferDraft {
    fn is_complete(&self) -> bool {
        [&self.from, &self.to, &self.amount, &self.description]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// The data-storage form. Only `chain_id` survives a successful submit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StorageDraft {
    pub chain_id: u64,
    pub amount: String,
    pub data_hash: String,
    pub metadata: String,
}

impl Default for StorageDraft {
    fn default() -> Self {
        Self {
            chain_id: STORAGE_CHAINS[0].0,
            amount: String::new(),
            data_hash: String::new(),
            metadata: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InFlightFlag(Arc<AtomicBool>);

impl InFlightFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn try_acquire(&self) -> Option<InFlightGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightGuard(self.0.clone()))
    }
}

/// Clears the flag when dropped, so every exit path releases it.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Lets another task give up on the confirmation wait of the running action.
#[derive(Clone, Debug, Default)]
pub struct AbandonHandle(Arc<Notify>);

impl AbandonHandle {
    pub fn abandon(&self) {
        self.0.notify_waiters();
    }
}

pub struct Playground<W, C, R> {
    pub(crate) wallet: W,
    pub(crate) caller: C,
    pub(crate) waiter: R,
    pub(crate) contracts: ContractAddresses,
    pub(crate) chain_change: ChainChangePolicy,
    pub(crate) session: WalletSession,
    pub(crate) snapshot: ContractSnapshot,
    pub(crate) claim_records: Vec<ClaimRecord>,
    pub(crate) transfer_records: Vec<TransferRecord>,
    pub(crate) data_records: Vec<DataRecord>,
    pub deposit_input: String,
    pub transfer_draft: TransferDraft,
    pub storage_draft: StorageDraft,
    status: String,
    errors: Vec<String>,
    pending: HashMap<ActionGroup, PendingAction>,
    red_packet_flag: InFlightFlag,
    transfer_log_flag: InFlightFlag,
    data_storage_flag: InFlightFlag,
    abandon: AbandonHandle,
    progress: Option<mpsc::UnboundedSender<PendingAction>>,
}

impl<W, C, R> Playground<W, C, R> {
    pub fn new(wallet: W, caller: C, waiter: R, contracts: ContractAddresses) -> Self {
        Self {
            wallet,
            caller,
            waiter,
            contracts,
            chain_change: ChainChangePolicy::default(),
            session: WalletSession::default(),
            snapshot: ContractSnapshot::default(),
            claim_records: Vec::new(),
            transfer_records: Vec::new(),
            data_records: Vec::new(),
            deposit_input: String::new(),
            transfer_draft: TransferDraft::default(),
            storage_draft: StorageDraft::default(),
            status: String::from("Ready"),
            errors: Vec::new(),
            pending: HashMap::new(),
            red_packet_flag: InFlightFlag::default(),
            transfer_log_flag: InFlightFlag::default(),
            data_storage_flag: InFlightFlag::default(),
            abandon: AbandonHandle::default(),
            progress: None,
        }
    }

    pub fn with_chain_change_policy(mut self, policy: ChainChangePolicy) -> Self {
        self.chain_change = policy;
        self
    }

    /// Every status transition of a running action is also sent here.
    pub fn set_progress_listener(&mut self, tx: mpsc::UnboundedSender<PendingAction>) {
        self.progress = Some(tx);
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn snapshot(&self) -> &ContractSnapshot {
        &self.snapshot
    }

    pub fn claim_records(&self) -> &[ClaimRecord] {
        &self.claim_records
    }

    pub fn transfer_records(&self) -> &[TransferRecord] {
        &self.transfer_records
    }

    /// Records the connected account stored, newest first.
    pub fn data_records(&self) -> &[DataRecord] {
        &self.data_records
    }

    pub fn contracts(&self) -> ContractAddresses {
        self.contracts
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Most recent errors, newest first.
    pub fn recent_errors(&self) -> Vec<String> {
        self.errors.iter().rev().take(VISIBLE_ERRORS).cloned().collect()
    }

    pub fn pending(&self, group: ActionGroup) -> Option<&PendingAction> {
        self.pending.get(&group)
    }

    pub fn in_flight_flag(&self, group: ActionGroup) -> InFlightFlag {
        match group {
            ActionGroup::RedPacket => self.red_packet_flag.clone(),
            ActionGroup::TransferLog => self.transfer_log_flag.clone(),
            ActionGroup::DataStorage => self.data_storage_flag.clone(),
        }
    }

    pub fn is_in_flight(&self, group: ActionGroup) -> bool {
        self.in_flight_flag(group).is_set()
    }

    pub fn abandon_handle(&self) -> AbandonHandle {
        self.abandon.clone()
    }

    pub(crate) fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.errors.clear();
    }

    pub(crate) fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    fn transition(&mut self, kind: ActionKind, status: ActionStatus, message: impl Into<String>) {
        let action = PendingAction {
            kind,
            status,
            message: message.into(),
        };
        info!(?kind, ?status, message = %action.message, "action transition");
        if let Some(tx) = &self.progress {
            let _ = tx.send(action.clone());
        }
        self.pending.insert(kind.group(), action);
    }

    /// Fails with [`ActionError::NotConnected`] and prompts to connect when no
    /// account is available.
    pub fn guard_connection(&mut self) -> Result<Address, ActionError> {
        match self.session.address {
            Some(address) => Ok(address),
            None => {
                self.set_status(CONNECT_PROMPT);
                Err(ActionError::NotConnected)
            }
        }
    }

    /// Builds the call for `kind` from the current drafts, validating input.
    pub fn plan_for(&self, kind: ActionKind) -> Result<ActionPlan, ActionError> {
        let red = self.contracts.red_packet;
        let plan = match kind {
            ActionKind::Claim => ActionPlan {
                kind,
                call: CallSpec::new(red, ContractInterface::RedPacket, red_packet::CLAIM),
                success_message: String::from("Red packet claimed"),
            },
            ActionKind::Clear => ActionPlan {
                kind,
                call: CallSpec::new(red, ContractInterface::RedPacket, red_packet::CLEAR),
                success_message: String::from("Red packet cleared"),
            },
            ActionKind::Deposit => {
                let wei = validate_amount(&self.deposit_input)?;
                ActionPlan {
                    kind,
                    call: CallSpec::new(red, ContractInterface::RedPacket, red_packet::DEPOSIT)
                        .with_value(wei),
                    success_message: format!(
                        "Deposited {} ETH",
                        self.deposit_input.trim()
                    ),
                }
            }
            ActionKind::SubmitLog => {
                let draft = &self.transfer_draft;
                if !draft.is_complete() {
                    return Err(ActionError::InvalidInput(String::from(
                        "Fill in from, to, amount and description",
                    )));
                }
                let from = parse_address("from", &draft.from)?;
                let to = parse_address("to", &draft.to)?;
                let amount = validate_amount(&draft.amount)?;
                ActionPlan {
                    kind,
                    call: CallSpec::new(
                        self.contracts.data_logger,
                        ContractInterface::DataLogger,
                        data_logger::SUBMIT_TRANSFER_RECORD,
                    )
                    .with_args(vec![
                        DynSolValue::Address(from),
                        DynSolValue::Address(to),
                        DynSolValue::Uint(amount, 256),
                        DynSolValue::String(draft.description.trim().to_owned()),
                    ]),
                    success_message: String::from("Transfer record submitted"),
                }
            }
            ActionKind::StoreData => {
                let draft = &self.storage_draft;
                if [&draft.amount, &draft.data_hash, &draft.metadata]
                    .iter()
                    .any(|field| field.trim().is_empty())
                {
                    return Err(ActionError::InvalidInput(String::from(
                        "Fill in amount, data hash and metadata",
                    )));
                }
                if !STORAGE_CHAINS.iter().any(|(id, _)| *id == draft.chain_id) {
                    return Err(ActionError::InvalidInput(format!(
                        "chain {} is not supported",
                        draft.chain_id
                    )));
                }
                let amount = validate_amount(&draft.amount)?;
                let reference = storage_reference(
                    self.session.address.unwrap_or_default(),
                    draft.amount.trim(),
                );
                ActionPlan {
                    kind,
                    call: CallSpec::new(
                        self.contracts.data_storage,
                        ContractInterface::DataStorage,
                        data_storage::STORE_DATA_WITH_USDT,
                    )
                    .with_value(STORAGE_FEE)
                    .with_args(vec![
                        DynSolValue::Uint(U256::from(draft.chain_id), 256),
                        DynSolValue::Uint(amount, 256),
                        DynSolValue::String(draft.data_hash.trim().to_owned()),
                        DynSolValue::String(draft.metadata.trim().to_owned()),
                        DynSolValue::FixedBytes(reference, 32),
                    ]),
                    success_message: String::from("Data record stored"),
                }
            }
        };
        Ok(plan)
    }

    fn clear_draft(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Deposit => self.deposit_input.clear(),
            ActionKind::SubmitLog => self.transfer_draft = TransferDraft::default(),
            ActionKind::StoreData => {
                self.storage_draft = StorageDraft {
                    chain_id: self.storage_draft.chain_id,
                    ..StorageDraft::default()
                }
            }
            ActionKind::Claim | ActionKind::Clear => {}
        }
    }

    pub(crate) fn reset_state(&mut self) {
        self.session.clear();
        self.snapshot = ContractSnapshot::default();
        self.claim_records.clear();
        self.transfer_records.clear();
        self.data_records.clear();
        self.deposit_input.clear();
        self.transfer_draft = TransferDraft::default();
        self.storage_draft = StorageDraft::default();
    }
}

/// Client-side reference filed with a data record: a hash over the sender,
/// the submit time and the entered amount.
fn storage_reference(sender: Address, amount: &str) -> B256 {
    keccak256(format!("{sender}-{}-{amount}", Utc::now().timestamp_millis()))
}

fn parse_address(field: &str, text: &str) -> Result<Address, ActionError> {
    text.trim()
        .parse::<Address>()
        .map_err(|_| ActionError::InvalidInput(format!("`{field}` is not a valid address")))
}

impl<W, C, R> Playground<W, C, R>
where
    W: WalletProvider,
    C: ContractCaller,
    R: ReceiptWaiter,
{
    /// Runs `kind` through guard, validation, dispatch and confirmation, then
    /// refreshes on success. A trigger while the group is busy is a no-op.
    pub async fn run(&mut self, kind: ActionKind) -> ActionOutcome {
        let flag = self.in_flight_flag(kind.group());
        if flag.is_set() {
            info!(?kind, "action already in flight; ignoring trigger");
            return ActionOutcome::Ignored;
        }
        let from = match self.guard_connection() {
            Ok(from) => from,
            Err(err) => return ActionOutcome::Rejected(err),
        };
        let Some(_guard) = flag.try_acquire() else {
            return ActionOutcome::Ignored;
        };

        self.transition(kind, ActionStatus::Idle, "");
        self.transition(kind, ActionStatus::Validating, format!("{kind}: validating..."));
        let plan = match self.plan_for(kind) {
            Ok(plan) => plan,
            Err(err) => {
                self.transition(kind, ActionStatus::Idle, err.to_string());
                self.set_status(err.to_string());
                return ActionOutcome::Rejected(err);
            }
        };

        self.transition(
            kind,
            ActionStatus::Submitting,
            format!("{kind}: waiting for the wallet..."),
        );
        self.set_status(format!("{kind}: submitting transaction..."));
        let handle = match self.dispatch(&plan.call, from).await {
            Ok(handle) => handle,
            Err(err) => return self.on_settled(&plan, Err(err)).await,
        };

        let message = format!("{kind}: {} submitted, waiting for confirmation...", handle.hash);
        self.transition(kind, ActionStatus::Confirming, message.clone());
        self.set_status(message);
        let result = self.await_confirmation(&handle).await.map(|_| handle);
        self.on_settled(&plan, result).await
    }

    /// Issues the single write call. Never retried.
    pub async fn dispatch(&self, call: &CallSpec, from: Address) -> Result<TxHandle, ActionError> {
        info!(%call, %from, value = %call.value, "dispatching call");
        self.caller
            .write(call, from)
            .await
            .map_err(|err| ActionError::from_dispatch(&err))
    }

    /// Waits until the transaction settles, or until the wait is abandoned
    /// through [`AbandonHandle`]. Abandoning leaves the chain transaction alone.
    pub async fn await_confirmation(
        &self,
        handle: &TxHandle,
    ) -> Result<ReceiptOutcome, ActionError> {
        let abandoned = self.abandon.0.notified();
        tokio::select! {
            result = self.waiter.wait(handle) => match result {
                Ok(outcome) if outcome.success => Ok(outcome),
                Ok(outcome) => Err(ActionError::ConfirmationFailed(match outcome.block_number {
                    Some(block) => format!("transaction reverted in block {block}"),
                    None => String::from("transaction reverted"),
                })),
                Err(err) => Err(ActionError::from_confirmation(&err)),
            },
            _ = abandoned => {
                warn!(hash = %handle.hash, "confirmation wait abandoned");
                Err(ActionError::ConfirmationFailed(format!(
                    "confirmation abandoned; transaction {} may still be pending",
                    handle.hash
                )))
            }
        }
    }

    pub async fn on_settled(
        &mut self,
        plan: &ActionPlan,
        result: Result<TxHandle, ActionError>,
    ) -> ActionOutcome {
        let kind = plan.kind;
        match result {
            Ok(handle) => {
                info!(?kind, hash = %handle.hash, "action confirmed");
                self.clear_draft(kind);
                let refresh = self.refresh().await;
                let message = if refresh.failed.is_empty() {
                    plan.success_message.clone()
                } else {
                    format!(
                        "{} ({} reads failed, showing last known values)",
                        plan.success_message,
                        refresh.failed.len()
                    )
                };
                self.transition(kind, ActionStatus::Succeeded, message.clone());
                self.set_status(message);
                ActionOutcome::Succeeded { handle, refresh }
            }
            Err(err) => {
                let message = err.to_string();
                self.transition(kind, ActionStatus::Failed, message.clone());
                self.set_status(format!("{kind} failed: {message}"));
                self.push_errors(vec![message]);
                ActionOutcome::Failed(err)
            }
        }
    }
}
