use alloy::primitives::{
    Address,
    U256,
};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkInfo {
    pub chain_id: u64,
    pub name: Option<String>,
}

impl NetworkInfo {
    pub fn from_chain_id(chain_id: u64) -> Self {
        let name = match chain_id {
            1 => Some("mainnet"),
            11155111 => Some("sepolia"),
            31337 => Some("hardhat"),
            _ => None,
        };
        Self {
            chain_id,
            name: name.map(str::to_owned),
        }
    }
}

impl fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({})", self.chain_id),
            None => write!(f, "Chain {}", self.chain_id),
        }
    }
}

/// The connected account as last reported by the wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletSession {
    pub address: Option<Address>,
    pub network: Option<NetworkInfo>,
    pub balance: Option<U256>,
}

impl WalletSession {
    pub fn connected(address: Address) -> Self {
        Self {
            address: Some(address),
            ..Self::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
