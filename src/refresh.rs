//! Re-reads everything the playground displays. Reads run concurrently and
//! settle independently: a failed read keeps the previous value.

use crate::{
    abi::{
        CallSpec,
        ContractInterface,
        data_logger,
        data_storage,
        red_packet,
    },
    chain::{
        ContractCaller,
        WalletProvider,
    },
    controller::Playground,
    error::{
        ActionError,
        ChainError,
    },
    snapshot::{
        decode_address,
        decode_bool,
        decode_claim_records,
        decode_data_records,
        decode_transfer_records,
        decode_uint,
    },
};
use alloy::dyn_abi::DynSolValue;
use std::fmt;
use tracing::{
    debug,
    warn,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ReadField {
    Balance,
    Network,
    Owner,
    TotalBalance,
    TotalCount,
    IsEqual,
    ClaimRecords,
    TransferRecords,
    DataRecords,
}

impl fmt::Display for ReadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadField::Balance => "balance",
            ReadField::Network => "network",
            ReadField::Owner => "owner",
            ReadField::TotalBalance => "totalBalance",
            ReadField::TotalCount => "totalCount",
            ReadField::IsEqual => "isEqual",
            ReadField::ClaimRecords => "claim records",
            ReadField::TransferRecords => "transfer records",
            ReadField::DataRecords => "data records",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub updated: Vec<ReadField>,
    pub failed: Vec<(ReadField, ActionError)>,
}

impl RefreshReport {
    fn record<T>(
        &mut self,
        field: ReadField,
        result: Result<T, ChainError>,
        apply: impl FnOnce(T),
    ) {
        match result {
            Ok(value) => {
                apply(value);
                self.updated.push(field);
            }
            Err(err) => {
                let err = ActionError::from_read(&err);
                warn!(%field, error = %err, "read failed; keeping previous value");
                self.failed.push((field, err));
            }
        }
    }
}

impl<W, C, R> Playground<W, C, R>
where
    W: WalletProvider,
    C: ContractCaller,
{
    /// Issues every read at once and applies each success as a full
    /// replacement of its field. Balance and data records are per account and
    /// only read while one is connected.
    pub async fn refresh(&mut self) -> RefreshReport {
        let red = self.contracts.red_packet;
        let logger = self.contracts.data_logger;
        let owner_call = CallSpec::new(red, ContractInterface::RedPacket, red_packet::OWNER);
        let total_balance_call =
            CallSpec::new(red, ContractInterface::RedPacket, red_packet::TOTAL_BALANCE);
        let total_count_call =
            CallSpec::new(red, ContractInterface::RedPacket, red_packet::TOTAL_COUNT);
        let is_equal_call =
            CallSpec::new(red, ContractInterface::RedPacket, red_packet::IS_EQUAL);
        let claims_call = CallSpec::new(red, ContractInterface::RedPacket, red_packet::GET_USER);
        let transfers_call = CallSpec::new(
            logger,
            ContractInterface::DataLogger,
            data_logger::GET_ALL_TRANSFER_RECORDS,
        );
        let address = self.session.address;
        let data_call = address.map(|sender| {
            CallSpec::new(
                self.contracts.data_storage,
                ContractInterface::DataStorage,
                data_storage::GET_DATA_BY_SENDER,
            )
            .with_args(vec![DynSolValue::Address(sender)])
        });

        let (
            balance,
            network,
            owner,
            total_balance,
            total_count,
            is_equal,
            claims,
            transfers,
            data_records,
        ) = {
            let wallet = &self.wallet;
            let caller = &self.caller;
            tokio::join!(
                async {
                    match address {
                        Some(address) => Some(wallet.balance(address).await),
                        None => None,
                    }
                },
                wallet.network(),
                read_with(caller, &owner_call, decode_address),
                read_with(caller, &total_balance_call, decode_uint),
                read_with(caller, &total_count_call, decode_uint),
                read_with(caller, &is_equal_call, decode_bool),
                read_with(caller, &claims_call, decode_claim_records),
                read_with(caller, &transfers_call, decode_transfer_records),
                async {
                    match &data_call {
                        Some(call) => Some(read_with(caller, call, decode_data_records).await),
                        None => None,
                    }
                },
            )
        };

        let mut report = RefreshReport::default();
        if let Some(balance) = balance {
            report.record(ReadField::Balance, balance, |v| self.session.balance = Some(v));
        }
        report.record(ReadField::Network, network, |v| self.session.network = Some(v));
        report.record(ReadField::Owner, owner, |v| self.snapshot.owner = Some(v));
        report.record(ReadField::TotalBalance, total_balance, |v| {
            self.snapshot.total_balance = Some(v)
        });
        report.record(ReadField::TotalCount, total_count, |v| {
            self.snapshot.total_count = Some(v)
        });
        report.record(ReadField::IsEqual, is_equal, |v| self.snapshot.is_equal = Some(v));
        report.record(ReadField::ClaimRecords, claims, |v| self.claim_records = v);
        report.record(ReadField::TransferRecords, transfers, |v| {
            self.transfer_records = v
        });
        if let Some(data_records) = data_records {
            report.record(ReadField::DataRecords, data_records, |v| {
                self.data_records = v
            });
        }
        debug!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "refresh settled"
        );
        report
    }

    /// A refresh the user asked for: the outcome lands in the status line and
    /// each failed read in the error list.
    pub async fn reload(&mut self) -> RefreshReport {
        let report = self.refresh().await;
        if report.failed.is_empty() {
            self.set_status("Refreshed");
        } else {
            self.set_status(format!(
                "Refreshed; {} of {} reads failed, showing last known values",
                report.failed.len(),
                report.failed.len() + report.updated.len()
            ));
            self.push_errors(
                report
                    .failed
                    .iter()
                    .map(|(field, err)| format!("{field}: {err}"))
                    .collect(),
            );
        }
        report
    }
}

async fn read_with<C, T>(
    caller: &C,
    call: &CallSpec,
    decode: impl FnOnce(&[DynSolValue]) -> Result<T, ChainError>,
) -> Result<T, ChainError>
where
    C: ContractCaller,
{
    let values = caller.read(call).await?;
    decode(&values)
}
