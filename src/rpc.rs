//! JSON-RPC implementation of the wallet, call and receipt traits.

use crate::{
    abi::CallSpec,
    chain::{
        ContractCaller,
        ReceiptOutcome,
        ReceiptWaiter,
        TxHandle,
        WalletProvider,
    },
    error::ChainError,
    session::NetworkInfo,
};
use alloy::{
    dyn_abi::DynSolValue,
    network::{
        EthereumWallet,
        ReceiptResponse,
        TransactionBuilder,
    },
    primitives::{
        Address,
        U256,
    },
    providers::{
        DynProvider,
        Provider,
        ProviderBuilder,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::{
    sync::{
        Arc,
        atomic::{
            AtomicBool,
            Ordering,
        },
    },
    time::Duration,
};
use tokio::time;
use tracing::{
    debug,
    info,
};

const METHOD_NOT_FOUND: i64 = -32601;
pub const DEFAULT_RECEIPT_POLL: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SignerMode {
    /// Transactions are signed locally with a decrypted keystore.
    Keystore(Address),
    /// The node holds the keys and signs `eth_sendTransaction` itself.
    Node,
}

#[derive(Clone)]
pub struct RpcClient {
    provider: DynProvider,
    signer: SignerMode,
    authorized: Arc<AtomicBool>,
    receipt_poll: Duration,
}

impl RpcClient {
    pub fn with_local_signer(url: &str, signer: PrivateKeySigner) -> Result<Self> {
        let rpc_url = url
            .parse()
            .wrap_err_with(|| format!("Invalid RPC URL: {url}"))?;
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(rpc_url)
            .erased();
        info!(%address, %url, "using keystore signer");
        Ok(Self {
            provider,
            signer: SignerMode::Keystore(address),
            authorized: Arc::new(AtomicBool::new(false)),
            receipt_poll: DEFAULT_RECEIPT_POLL,
        })
    }

    pub fn with_node_signer(url: &str) -> Result<Self> {
        let rpc_url = url
            .parse()
            .wrap_err_with(|| format!("Invalid RPC URL: {url}"))?;
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();
        info!(%url, "using node-managed accounts");
        Ok(Self {
            provider,
            signer: SignerMode::Node,
            authorized: Arc::new(AtomicBool::new(false)),
            receipt_poll: DEFAULT_RECEIPT_POLL,
        })
    }

    pub fn with_receipt_poll(mut self, interval: Duration) -> Self {
        self.receipt_poll = interval;
        self
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_chain_id().await?)
    }

    /// Accounts visible to the app right now: empty until connected.
    pub async fn authorized_accounts(&self) -> Result<Vec<Address>, ChainError> {
        if !self.authorized.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        match self.signer {
            SignerMode::Keystore(address) => Ok(vec![address]),
            SignerMode::Node => Ok(self.provider.get_accounts().await?),
        }
    }

    async fn request_node_accounts(&self) -> Result<Vec<Address>, ChainError> {
        let requested = self
            .provider
            .raw_request::<_, Vec<Address>>("eth_requestAccounts".into(), [(); 0])
            .await;
        match requested {
            Ok(accounts) => Ok(accounts),
            Err(err) => {
                let err = ChainError::from(err);
                if err.code == Some(METHOD_NOT_FOUND) {
                    debug!("eth_requestAccounts unsupported; falling back to eth_accounts");
                    Ok(self.provider.get_accounts().await?)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn transaction(&self, call: &CallSpec) -> Result<TransactionRequest, ChainError> {
        Ok(TransactionRequest::default()
            .with_to(call.target)
            .with_input(call.calldata()?))
    }
}

impl WalletProvider for RpcClient {
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        let accounts = match self.signer {
            SignerMode::Keystore(address) => vec![address],
            SignerMode::Node => self.request_node_accounts().await?,
        };
        if !accounts.is_empty() {
            self.authorized.store(true, Ordering::SeqCst);
        }
        Ok(accounts)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        self.authorized_accounts().await
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn network(&self) -> Result<NetworkInfo, ChainError> {
        Ok(NetworkInfo::from_chain_id(self.chain_id().await?))
    }

    fn disconnect(&self) {
        self.authorized.store(false, Ordering::SeqCst);
    }
}

impl ContractCaller for RpcClient {
    async fn read(&self, call: &CallSpec) -> Result<Vec<DynSolValue>, ChainError> {
        let tx = self.transaction(call)?;
        let output = self.provider.call(tx).await?;
        call.decode_output(&output)
    }

    async fn write(&self, call: &CallSpec, from: Address) -> Result<TxHandle, ChainError> {
        let tx = self.transaction(call)?.with_from(from).with_value(call.value);
        let pending = self.provider.send_transaction(tx).await?;
        let hash = *pending.tx_hash();
        info!(%hash, %call, "transaction submitted");
        Ok(TxHandle { hash })
    }
}

impl ReceiptWaiter for RpcClient {
    async fn wait(&self, handle: &TxHandle) -> Result<ReceiptOutcome, ChainError> {
        let mut ticker = time::interval(self.receipt_poll);
        loop {
            ticker.tick().await;
            let receipt = self
                .provider
                .get_transaction_receipt(handle.hash)
                .await
                .map_err(|e| {
                    ChainError::msg("could not fetch the receipt").with_cause(e.into())
                })?;
            if let Some(receipt) = receipt {
                let outcome = ReceiptOutcome {
                    success: ReceiptResponse::status(&receipt),
                    block_number: ReceiptResponse::block_number(&receipt),
                };
                debug!(hash = %handle.hash, ?outcome, "receipt received");
                return Ok(outcome);
            }
        }
    }
}
