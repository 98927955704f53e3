//! The three collaborators the playground drives: a wallet, a contract call
//! layer and a receipt waiter.

use crate::{
    abi::CallSpec,
    error::ChainError,
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

/// Handle to a submitted, possibly unconfirmed, transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TxHandle {
    pub hash: TxHash,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReceiptOutcome {
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Changes the wallet reports on its own schedule.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

pub trait WalletProvider {
    /// Asks the wallet for account access, prompting the user if needed.
    fn request_accounts(&self) -> impl Future<Output = Result<Vec<Address>, ChainError>>;

    /// Accounts already authorized, without prompting.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>, ChainError>>;

    fn balance(&self, address: Address) -> impl Future<Output = Result<U256, ChainError>>;

    fn network(&self) -> impl Future<Output = Result<NetworkInfo, ChainError>>;

    /// Forgets the authorization granted by [`WalletProvider::request_accounts`].
    fn disconnect(&self);
}

pub trait ContractCaller {
    fn read(
        &self,
        call: &CallSpec,
    ) -> impl Future<Output = Result<Vec<DynSolValue>, ChainError>>;

    fn write(
        &self,
        call: &CallSpec,
        from: Address,
    ) -> impl Future<Output = Result<TxHandle, ChainError>>;
}

pub trait ReceiptWaiter {
    fn wait(
        &self,
        handle: &TxHandle,
    ) -> impl Future<Output = Result<ReceiptOutcome, ChainError>>;
}
