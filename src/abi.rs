//! Contract interfaces and the call descriptions built from them.

use crate::error::ChainError;
use alloy::{
    dyn_abi::{
        DynSolValue,
        FunctionExt,
        JsonAbiExt,
    },
    json_abi::{
        Function,
        JsonAbi,
    },
    primitives::{
        Address,
        Bytes,
        U256,
    },
};
use std::{
    fmt,
    sync::OnceLock,
};

const RED_PACKET_SIGNATURES: [&str; 8] = [
    "function owner() view returns (address)",
    "function totalBalance() view returns (uint256)",
    "function totalCount() view returns (uint256)",
    "function isEqual() view returns (bool)",
    "function getUser() view returns ((address,uint256,uint256)[])",
    "function deposit() payable",
    "function getRedPacked()",
    "function clearRedPacked()",
];

const DATA_LOGGER_SIGNATURES: [&str; 2] = [
    "function submitTransferRecord(address from, address to, uint256 amount, string description)",
    "function getAllTransferRecords() view returns ((uint256,address,address,address,uint256,string,uint256)[])",
];

const DATA_STORAGE_SIGNATURES: [&str; 2] = [
    "function storeDataWithUSDT(uint256 chainId, uint256 amount, string dataHash, string metadata, bytes32 txHash) payable",
    "function getDataBySender(address sender) view returns ((address,address,uint256,uint256,string,string,uint256,bytes32)[])",
];

pub mod red_packet {
    pub const OWNER: &str = "owner";
    pub const TOTAL_BALANCE: &str = "totalBalance";
    pub const TOTAL_COUNT: &str = "totalCount";
    pub const IS_EQUAL: &str = "isEqual";
    pub const GET_USER: &str = "getUser";
    pub const DEPOSIT: &str = "deposit";
    pub const CLAIM: &str = "getRedPacked";
    pub const CLEAR: &str = "clearRedPacked";
}

pub mod data_logger {
    pub const SUBMIT_TRANSFER_RECORD: &str = "submitTransferRecord";
    pub const GET_ALL_TRANSFER_RECORDS: &str = "getAllTransferRecords";
}

pub mod data_storage {
    pub const STORE_DATA_WITH_USDT: &str = "storeDataWithUSDT";
    pub const GET_DATA_BY_SENDER: &str = "getDataBySender";
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ContractInterface {
    RedPacket,
    DataLogger,
    DataStorage,
}

impl fmt::Display for ContractInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractInterface::RedPacket => "Red",
            ContractInterface::DataLogger => "DataLogger",
            ContractInterface::DataStorage => "USDTDataStorage",
        };
        write!(f, "{name}")
    }
}

struct InterfaceRegistry {
    red_packet: Result<JsonAbi, String>,
    data_logger: Result<JsonAbi, String>,
    data_storage: Result<JsonAbi, String>,
}

static REGISTRY: OnceLock<InterfaceRegistry> = OnceLock::new();

fn registry() -> &'static InterfaceRegistry {
    REGISTRY.get_or_init(|| {
        tracing::debug!("parsing contract interfaces");
        InterfaceRegistry {
            red_packet: JsonAbi::parse(RED_PACKET_SIGNATURES).map_err(|e| e.to_string()),
            data_logger: JsonAbi::parse(DATA_LOGGER_SIGNATURES)
                .map_err(|e| e.to_string()),
            data_storage: JsonAbi::parse(DATA_STORAGE_SIGNATURES)
                .map_err(|e| e.to_string()),
        }
    })
}

/// Parsed interface for `interface`, created on first use and shared after.
pub fn interface(interface: ContractInterface) -> Result<&'static JsonAbi, ChainError> {
    let parsed = match interface {
        ContractInterface::RedPacket => &registry().red_packet,
        ContractInterface::DataLogger => &registry().data_logger,
        ContractInterface::DataStorage => &registry().data_storage,
    };
    parsed.as_ref().map_err(|e| {
        ChainError::msg(format!("invalid {interface} interface definition: {e}"))
    })
}

pub fn function(
    iface: ContractInterface,
    name: &str,
) -> Result<&'static Function, ChainError> {
    interface(iface)?
        .function(name)
        .and_then(|overloads| overloads.first())
        .ok_or_else(|| ChainError::msg(format!("{iface} has no function `{name}`")))
}

/// One contract call: where it goes, what it invokes, and what it carries.
#[derive(Clone, Debug, PartialEq)]
pub struct CallSpec {
    pub target: Address,
    pub interface: ContractInterface,
    pub function: &'static str,
    pub args: Vec<DynSolValue>,
    pub value: U256,
}

impl CallSpec {
    pub fn new(target: Address, interface: ContractInterface, function: &'static str) -> Self {
        Self {
            target,
            interface,
            function,
            args: Vec::new(),
            value: U256::ZERO,
        }
    }

    pub fn with_args(mut self, args: Vec<DynSolValue>) -> Self {
        self.args = args;
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn calldata(&self) -> Result<Bytes, ChainError> {
        let function = function(self.interface, self.function)?;
        function
            .abi_encode_input(&self.args)
            .map(Bytes::from)
            .map_err(|e| {
                ChainError::msg(format!("failed to encode `{}` call: {e}", self.function))
            })
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<DynSolValue>, ChainError> {
        let function = function(self.interface, self.function)?;
        function.abi_decode_output(data).map_err(|e| {
            ChainError::msg(format!("failed to decode `{}` result: {e}", self.function))
                .with_short_message("Contract returned an unexpected value.")
        })
    }
}

impl fmt::Display for CallSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.interface, self.function)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn interface__is_parsed_once_and_shared() {
        // when
        let first = interface(ContractInterface::RedPacket).unwrap();
        let second = interface(ContractInterface::RedPacket).unwrap();

        // then
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn function__knows_every_red_packet_call() {
        for name in [
            red_packet::OWNER,
            red_packet::TOTAL_BALANCE,
            red_packet::TOTAL_COUNT,
            red_packet::IS_EQUAL,
            red_packet::GET_USER,
            red_packet::DEPOSIT,
            red_packet::CLAIM,
            red_packet::CLEAR,
        ] {
            assert!(function(ContractInterface::RedPacket, name).is_ok(), "{name}");
        }
    }

    #[test]
    fn calldata__encodes_store_data_arguments() {
        // given
        let call = CallSpec::new(
            Address::ZERO,
            ContractInterface::DataStorage,
            data_storage::STORE_DATA_WITH_USDT,
        )
        .with_args(vec![
            DynSolValue::Uint(U256::from(56), 256),
            DynSolValue::Uint(U256::from(1000), 256),
            DynSolValue::String(String::from("QmHash")),
            DynSolValue::String(String::from("invoice 7")),
            DynSolValue::FixedBytes(alloy::primitives::B256::repeat_byte(0xab), 32),
        ]);
        let selector = function(ContractInterface::DataStorage, data_storage::STORE_DATA_WITH_USDT)
            .unwrap()
            .selector();

        // when
        let data = call.calldata().unwrap();

        // then
        assert_eq!(&data[..4], selector.as_slice());
        assert!(function(ContractInterface::DataStorage, data_storage::GET_DATA_BY_SENDER).is_ok());
    }

    #[test]
    fn function__unknown_name_is_an_error() {
        let err = function(ContractInterface::DataLogger, "deposit").unwrap_err();
        assert_eq!(
            err.message.as_deref(),
            Some("DataLogger has no function `deposit`")
        );
    }

    #[test]
    fn calldata__starts_with_function_selector() {
        // given
        let target = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
        let call = CallSpec::new(target, ContractInterface::RedPacket, red_packet::CLAIM);
        let expected = function(ContractInterface::RedPacket, red_packet::CLAIM)
            .unwrap()
            .selector();

        // when
        let data = call.calldata().unwrap();

        // then
        assert_eq!(&data[..4], expected.as_slice());
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn calldata__wrong_argument_count_is_an_error() {
        // given
        let call = CallSpec::new(
            Address::ZERO,
            ContractInterface::DataLogger,
            data_logger::SUBMIT_TRANSFER_RECORD,
        )
        .with_args(vec![DynSolValue::Bool(true)]);

        // when
        let result = call.calldata();

        // then
        assert!(result.is_err());
    }
}
