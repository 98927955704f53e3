//! Read-side mirror of contract state, and the record shapes decoded from
//! contract read results.

use crate::error::ChainError;
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{
        Address,
        B256,
        U256,
    },
};

/// Last known Red contract state. Every field is replaced from a fresh read,
/// never edited in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub owner: Option<Address>,
    pub total_balance: Option<U256>,
    pub total_count: Option<U256>,
    pub is_equal: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimRecord {
    pub holder: Address,
    pub amount: U256,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    pub id: U256,
    pub submitter: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub description: String,
    pub timestamp: u64,
}

/// One entry of the USDT data-storage log, as returned by `getDataBySender`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataRecord {
    pub sender: Address,
    pub usdt_contract: Address,
    pub chain_id: u64,
    pub amount: U256,
    pub data_hash: String,
    pub metadata: String,
    pub timestamp: u64,
    pub tx_hash: B256,
}

impl ClaimRecord {
    pub fn from_value(value: &DynSolValue) -> Result<Self, ChainError> {
        let fields = record_fields(value, 3, "claim record")?;
        Ok(Self {
            holder: address_at(fields, 0)?,
            amount: uint_at(fields, 1)?,
            timestamp: uint_at(fields, 2)?.saturating_to::<u64>(),
        })
    }
}

impl TransferRecord {
    pub fn from_value(value: &DynSolValue) -> Result<Self, ChainError> {
        let fields = record_fields(value, 7, "transfer record")?;
        Ok(Self {
            id: uint_at(fields, 0)?,
            submitter: address_at(fields, 1)?,
            from: address_at(fields, 2)?,
            to: address_at(fields, 3)?,
            amount: uint_at(fields, 4)?,
            description: string_at(fields, 5)?,
            timestamp: uint_at(fields, 6)?.saturating_to::<u64>(),
        })
    }
}

impl DataRecord {
    pub fn from_value(value: &DynSolValue) -> Result<Self, ChainError> {
        let fields = record_fields(value, 8, "data record")?;
        Ok(Self {
            sender: address_at(fields, 0)?,
            usdt_contract: address_at(fields, 1)?,
            chain_id: uint_at(fields, 2)?.saturating_to::<u64>(),
            amount: uint_at(fields, 3)?,
            data_hash: string_at(fields, 4)?,
            metadata: string_at(fields, 5)?,
            timestamp: uint_at(fields, 6)?.saturating_to::<u64>(),
            tx_hash: match &fields[7] {
                DynSolValue::FixedBytes(word, 32) => *word,
                _ => return Err(unexpected("bytes32", 7)),
            },
        })
    }
}

/// Decodes a `getUser()` result, newest claim first.
pub fn decode_claim_records(values: &[DynSolValue]) -> Result<Vec<ClaimRecord>, ChainError> {
    let mut records = list(values)?
        .iter()
        .map(ClaimRecord::from_value)
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(records)
}

/// Decodes a `getAllTransferRecords()` result, newest record first.
pub fn decode_transfer_records(
    values: &[DynSolValue],
) -> Result<Vec<TransferRecord>, ChainError> {
    let mut records = list(values)?
        .iter()
        .map(TransferRecord::from_value)
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    Ok(records)
}

/// Decodes a `getDataBySender(address)` result, newest record first.
pub fn decode_data_records(values: &[DynSolValue]) -> Result<Vec<DataRecord>, ChainError> {
    let mut records = list(values)?
        .iter()
        .map(DataRecord::from_value)
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(records)
}

pub fn decode_address(values: &[DynSolValue]) -> Result<Address, ChainError> {
    single(values)?
        .as_address()
        .ok_or_else(|| unexpected("address", 0))
}

pub fn decode_uint(values: &[DynSolValue]) -> Result<U256, ChainError> {
    single(values)?
        .as_uint()
        .map(|(value, _)| value)
        .ok_or_else(|| unexpected("uint256", 0))
}

pub fn decode_bool(values: &[DynSolValue]) -> Result<bool, ChainError> {
    single(values)?
        .as_bool()
        .ok_or_else(|| unexpected("bool", 0))
}

fn single(values: &[DynSolValue]) -> Result<&DynSolValue, ChainError> {
    match values {
        [value] => Ok(value),
        _ => Err(ChainError::msg(format!(
            "expected a single return value, got {}",
            values.len()
        ))),
    }
}

fn list(values: &[DynSolValue]) -> Result<&[DynSolValue], ChainError> {
    match single(values)? {
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => Ok(items),
        _ => Err(unexpected("array", 0)),
    }
}

// Struct results come back as tuples; positional arrays are accepted too.
fn record_fields<'a>(
    value: &'a DynSolValue,
    arity: usize,
    what: &str,
) -> Result<&'a [DynSolValue], ChainError> {
    let fields = match value {
        DynSolValue::Tuple(fields)
        | DynSolValue::Array(fields)
        | DynSolValue::FixedArray(fields) => fields.as_slice(),
        _ => return Err(ChainError::msg(format!("{what} is not a tuple"))),
    };
    if fields.len() != arity {
        return Err(ChainError::msg(format!(
            "{what} has {} fields, expected {arity}",
            fields.len()
        )));
    }
    Ok(fields)
}

fn address_at(fields: &[DynSolValue], idx: usize) -> Result<Address, ChainError> {
    fields[idx]
        .as_address()
        .ok_or_else(|| unexpected("address", idx))
}

fn uint_at(fields: &[DynSolValue], idx: usize) -> Result<U256, ChainError> {
    fields[idx]
        .as_uint()
        .map(|(value, _)| value)
        .ok_or_else(|| unexpected("uint256", idx))
}

fn string_at(fields: &[DynSolValue], idx: usize) -> Result<String, ChainError> {
    fields[idx]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| unexpected("string", idx))
}

fn unexpected(kind: &str, idx: usize) -> ChainError {
    ChainError::msg(format!("expected {kind} at position {idx}"))
}
