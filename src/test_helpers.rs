//! In-memory wallet, contract and receipt fakes for driving a [`Playground`]
//! without a node.

use crate::{
    abi::{
        CallSpec,
        data_logger,
        data_storage,
        red_packet,
    },
    chain::{
        ContractCaller,
        ReceiptOutcome,
        ReceiptWaiter,
        TxHandle,
        WalletProvider,
    },
    controller::{
        ContractAddresses,
        Playground,
    },
    error::{
        ChainError,
        ChainResult,
    },
    session::NetworkInfo,
};
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{
        Address,
        TxHash,
        U256,
    },
};
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};
use tokio::sync::Notify;

pub const HARDHAT_CHAIN_ID: u64 = 31337;

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

pub fn contracts() -> ContractAddresses {
    ContractAddresses {
        red_packet: Address::repeat_byte(0x0e),
        data_logger: Address::repeat_byte(0x0d),
        data_storage: Address::repeat_byte(0x0c),
    }
}

pub fn eth(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(18u64))
}

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
struct WalletState {
    accounts: Vec<Address>,
    authorized: bool,
    request_error: Option<ChainError>,
    balances: HashMap<Address, U256>,
    balance_error: Option<ChainError>,
    chain_id: u64,
    requests: usize,
    balance_reads: usize,
}

#[derive(Clone, Debug)]
pub struct FakeWallet {
    state: Arc<Mutex<WalletState>>,
}

impl FakeWallet {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            state: Arc::new(Mutex::new(WalletState {
                accounts,
                authorized: false,
                request_error: None,
                balances: HashMap::new(),
                balance_error: None,
                chain_id: HARDHAT_CHAIN_ID,
                requests: 0,
                balance_reads: 0,
            })),
        }
    }

    /// A wallet that has already granted access to `address`.
    pub fn authorized(address: Address) -> Self {
        let wallet = Self::new(vec![address]);
        lock(&wallet.state).authorized = true;
        wallet
    }

    pub fn set_balance(&self, address: Address, wei: U256) {
        lock(&self.state).balances.insert(address, wei);
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        lock(&self.state)
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    pub fn reject_requests(&self, err: ChainError) {
        lock(&self.state).request_error = Some(err);
    }

    pub fn fail_balance_reads(&self, err: Option<ChainError>) {
        lock(&self.state).balance_error = err;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        lock(&self.state).chain_id = chain_id;
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        lock(&self.state).accounts = accounts;
    }

    pub fn requests(&self) -> usize {
        lock(&self.state).requests
    }

    pub fn balance_reads(&self) -> usize {
        lock(&self.state).balance_reads
    }

    fn spend(&self, address: Address, wei: U256) {
        let mut state = lock(&self.state);
        let balance = state.balances.entry(address).or_default();
        *balance = balance.saturating_sub(wei);
    }
}

impl WalletProvider for FakeWallet {
    async fn request_accounts(&self) -> ChainResult<Vec<Address>> {
        let mut state = lock(&self.state);
        state.requests += 1;
        if let Some(err) = state.request_error.clone() {
            return Err(err);
        }
        state.authorized = true;
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> ChainResult<Vec<Address>> {
        let state = lock(&self.state);
        if state.authorized {
            Ok(state.accounts.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn balance(&self, address: Address) -> ChainResult<U256> {
        let mut state = lock(&self.state);
        state.balance_reads += 1;
        if let Some(err) = state.balance_error.clone() {
            return Err(err);
        }
        Ok(state.balances.get(&address).copied().unwrap_or_default())
    }

    async fn network(&self) -> ChainResult<NetworkInfo> {
        Ok(NetworkInfo::from_chain_id(lock(&self.state).chain_id))
    }

    fn disconnect(&self) {
        lock(&self.state).authorized = false;
    }
}

#[derive(Debug)]
struct CallerState {
    reads: HashMap<&'static str, ChainResult<Vec<DynSolValue>>>,
    write_results: VecDeque<ChainResult<TxHandle>>,
    writes: Vec<(CallSpec, Address)>,
    read_log: Vec<CallSpec>,
    read_calls: usize,
    next_hash: u8,
}

/// Serves scripted reads by function name. Successful deposits move value
/// from the linked wallet into the scripted `totalBalance`.
#[derive(Clone, Debug)]
pub struct FakeCaller {
    state: Arc<Mutex<CallerState>>,
    wallet: Option<FakeWallet>,
}

impl Default for FakeCaller {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCaller {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CallerState {
                reads: HashMap::new(),
                write_results: VecDeque::new(),
                writes: Vec::new(),
                read_log: Vec::new(),
                read_calls: 0,
                next_hash: 1,
            })),
            wallet: None,
        }
    }

    pub fn linked_to(wallet: &FakeWallet) -> Self {
        Self {
            wallet: Some(wallet.clone()),
            ..Self::new()
        }
    }

    /// Scripts every read the playground issues with a plausible value.
    pub fn with_defaults(self, owner: Address) -> Self {
        self.set_read(red_packet::OWNER, Ok(vec![DynSolValue::Address(owner)]));
        self.set_read(red_packet::TOTAL_BALANCE, Ok(vec![uint(U256::ZERO)]));
        self.set_read(red_packet::TOTAL_COUNT, Ok(vec![uint(U256::ZERO)]));
        self.set_read(red_packet::IS_EQUAL, Ok(vec![DynSolValue::Bool(false)]));
        self.set_read(red_packet::GET_USER, Ok(vec![DynSolValue::Array(Vec::new())]));
        self.set_read(
            data_logger::GET_ALL_TRANSFER_RECORDS,
            Ok(vec![DynSolValue::Array(Vec::new())]),
        );
        self.set_read(
            data_storage::GET_DATA_BY_SENDER,
            Ok(vec![DynSolValue::Array(Vec::new())]),
        );
        self
    }

    pub fn set_read(&self, function: &'static str, result: ChainResult<Vec<DynSolValue>>) {
        lock(&self.state).reads.insert(function, result);
    }

    /// Queues the result of the next write. Unscripted writes succeed.
    pub fn push_write_result(&self, result: ChainResult<TxHandle>) {
        lock(&self.state).write_results.push_back(result);
    }

    pub fn writes(&self) -> Vec<(CallSpec, Address)> {
        lock(&self.state).writes.clone()
    }

    pub fn read_calls(&self) -> usize {
        lock(&self.state).read_calls
    }

    /// Every read issued for `function`, oldest first.
    pub fn reads_of(&self, function: &str) -> Vec<CallSpec> {
        lock(&self.state)
            .read_log
            .iter()
            .filter(|call| call.function == function)
            .cloned()
            .collect()
    }

    fn credit_total_balance(state: &mut CallerState, wei: U256) {
        let current = match state.reads.get(red_packet::TOTAL_BALANCE) {
            Some(Ok(values)) => match values.first() {
                Some(DynSolValue::Uint(v, _)) => *v,
                _ => U256::ZERO,
            },
            _ => U256::ZERO,
        };
        state
            .reads
            .insert(red_packet::TOTAL_BALANCE, Ok(vec![uint(current + wei)]));
    }
}

impl ContractCaller for FakeCaller {
    async fn read(&self, call: &CallSpec) -> ChainResult<Vec<DynSolValue>> {
        let mut state = lock(&self.state);
        state.read_calls += 1;
        state.read_log.push(call.clone());
        state.reads.get(call.function).cloned().unwrap_or_else(|| {
            Err(ChainError::msg(format!("no scripted result for {call}")))
        })
    }

    async fn write(&self, call: &CallSpec, from: Address) -> ChainResult<TxHandle> {
        let result = {
            let mut state = lock(&self.state);
            state.writes.push((call.clone(), from));
            let result = state.write_results.pop_front().unwrap_or_else(|| {
                let hash = TxHash::repeat_byte(state.next_hash);
                state.next_hash = state.next_hash.wrapping_add(1);
                Ok(TxHandle { hash })
            });
            if result.is_ok() && call.function == red_packet::DEPOSIT {
                Self::credit_total_balance(&mut state, call.value);
            }
            result
        };
        if result.is_ok()
            && !call.value.is_zero()
            && let Some(wallet) = &self.wallet
        {
            wallet.spend(from, call.value);
        }
        result
    }
}

#[derive(Debug)]
struct WaiterState {
    outcome: ChainResult<ReceiptOutcome>,
    gate: Option<Arc<Notify>>,
    waits: usize,
}

#[derive(Clone, Debug)]
pub struct FakeWaiter {
    state: Arc<Mutex<WaiterState>>,
}

impl Default for FakeWaiter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWaiter {
    pub fn new() -> Self {
        Self::with_outcome(Ok(ReceiptOutcome {
            success: true,
            block_number: Some(1),
        }))
    }

    pub fn with_outcome(outcome: ChainResult<ReceiptOutcome>) -> Self {
        Self {
            state: Arc::new(Mutex::new(WaiterState {
                outcome,
                gate: None,
                waits: 0,
            })),
        }
    }

    /// Holds every wait until [`WaiterGate::release`] is called.
    pub fn hold(&self) -> WaiterGate {
        let gate = Arc::new(Notify::new());
        lock(&self.state).gate = Some(gate.clone());
        WaiterGate(gate)
    }

    pub fn waits(&self) -> usize {
        lock(&self.state).waits
    }
}

impl ReceiptWaiter for FakeWaiter {
    async fn wait(&self, _handle: &TxHandle) -> ChainResult<ReceiptOutcome> {
        let gate = {
            let mut state = lock(&self.state);
            state.waits += 1;
            state.gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        lock(&self.state).outcome.clone()
    }
}

#[derive(Clone, Debug)]
pub struct WaiterGate(Arc<Notify>);

impl WaiterGate {
    pub fn release(&self) {
        self.0.notify_one();
    }
}

pub type FakePlayground = Playground<FakeWallet, FakeCaller, FakeWaiter>;

pub struct TestContext {
    pub wallet: FakeWallet,
    pub caller: FakeCaller,
    pub waiter: FakeWaiter,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Alice is authorized and holds 10 ETH; every read is scripted.
    pub fn new() -> Self {
        let wallet = FakeWallet::authorized(alice());
        wallet.set_balance(alice(), eth(10));
        let caller = FakeCaller::linked_to(&wallet).with_defaults(bob());
        Self {
            wallet,
            caller,
            waiter: FakeWaiter::new(),
        }
    }

    pub fn playground(&self) -> FakePlayground {
        Playground::new(
            self.wallet.clone(),
            self.caller.clone(),
            self.waiter.clone(),
            contracts(),
        )
    }

    /// A playground that already adopted Alice and ran its first refresh.
    pub async fn connected_playground(&self) -> FakePlayground {
        let mut playground = self.playground();
        playground.init_probe().await;
        playground
    }
}

pub fn uint(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}
