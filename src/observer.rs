//! Keeps the wallet session in step with changes made outside the app:
//! connect and disconnect requests, account switches and chain switches.

use crate::{
    chain::{
        ContractCaller,
        WalletEvent,
        WalletProvider,
    },
    controller::{
        CONNECT_PROMPT,
        Playground,
    },
    error::ActionError,
    normalize::normalize_error,
    refresh::RefreshReport,
};
use alloy::primitives::Address;
use std::{
    fmt,
    str::FromStr,
};
use tracing::{
    info,
    warn,
};

/// What to do when the wallet switches chains.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ChainChangePolicy {
    /// Keep the session, take the new chain id and re-read everything.
    ReloadInPlace,
    /// Drop all state and start over from the initialization probe.
    #[default]
    FullReload,
}

impl FromStr for ChainChangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-place" => Ok(ChainChangePolicy::ReloadInPlace),
            "reload" => Ok(ChainChangePolicy::FullReload),
            other => Err(format!(
                "unknown chain change policy `{other}`; expected `reload` or `in-place`"
            )),
        }
    }
}

impl fmt::Display for ChainChangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainChangePolicy::ReloadInPlace => write!(f, "in-place"),
            ChainChangePolicy::FullReload => write!(f, "reload"),
        }
    }
}

impl<W, C, R> Playground<W, C, R>
where
    W: WalletProvider,
    C: ContractCaller,
{
    /// Asks the wallet for access and adopts its first account.
    pub async fn connect(&mut self) -> Result<Address, ActionError> {
        self.set_status("Connecting...");
        let accounts = match self.wallet.request_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                let message = normalize_error(&err);
                self.set_status(format!("Connection failed: {message}"));
                self.push_errors(vec![message.clone()]);
                return Err(if err.is_user_rejection() {
                    ActionError::CallRejectedByUser(message)
                } else {
                    ActionError::NotConnected
                });
            }
        };
        let Some(address) = accounts.first().copied() else {
            self.set_status("Connection failed: the wallet returned no accounts");
            return Err(ActionError::NotConnected);
        };
        info!(%address, "wallet connected");
        self.adopt_account(address).await;
        self.set_status("Wallet connected");
        Ok(address)
    }

    pub fn disconnect(&mut self) {
        self.wallet.disconnect();
        self.reset_state();
        info!("wallet disconnected");
        self.set_status("Wallet disconnected");
    }

    /// Re-derives the session from accounts the wallet already authorized,
    /// without prompting.
    pub async fn init_probe(&mut self) -> Option<Address> {
        match self.wallet.accounts().await {
            Ok(accounts) => match accounts.first().copied() {
                Some(address) => {
                    info!(%address, "found authorized account");
                    self.adopt_account(address).await;
                    self.set_status("Wallet connected");
                    Some(address)
                }
                None => {
                    self.set_status(CONNECT_PROMPT);
                    None
                }
            },
            Err(err) => {
                let message = normalize_error(&err);
                warn!(error = %message, "initial account probe failed");
                self.set_status(CONNECT_PROMPT);
                self.push_errors(vec![message]);
                None
            }
        }
    }

    pub async fn on_wallet_event(&mut self, event: WalletEvent) -> Option<RefreshReport> {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                None => {
                    info!("wallet reported no accounts; clearing session");
                    self.reset_state();
                    self.set_status(CONNECT_PROMPT);
                    None
                }
                Some(address) => {
                    info!(%address, "wallet switched account");
                    let report = self.adopt_account(address).await;
                    self.set_status(format!("Account changed to {address}"));
                    Some(report)
                }
            },
            WalletEvent::ChainChanged(chain_id) => {
                let known = self.session.network.as_ref().map(|n| n.chain_id);
                if known == Some(chain_id) {
                    return None;
                }
                info!(chain_id, policy = %self.chain_change, "wallet switched chain");
                match self.chain_change {
                    ChainChangePolicy::ReloadInPlace => {
                        let report = self.refresh().await;
                        self.set_status(format!("Switched to chain {chain_id}"));
                        Some(report)
                    }
                    ChainChangePolicy::FullReload => {
                        self.reset_state();
                        self.init_probe().await;
                        None
                    }
                }
            }
        }
    }

    async fn adopt_account(&mut self, address: Address) -> RefreshReport {
        if self.session.address != Some(address) {
            self.session.clear();
            self.session.address = Some(address);
        }
        self.refresh().await
    }
}

/// Turns periodic polls of the wallet into change events.
#[derive(Clone, Debug, Default)]
pub struct WalletWatcher {
    accounts: Option<Vec<Address>>,
    chain_id: Option<u64>,
}

impl WalletWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest poll and returns what changed since the previous one.
    /// The first poll only establishes a baseline.
    pub fn observe(&mut self, accounts: Vec<Address>, chain_id: u64) -> Vec<WalletEvent> {
        let mut events = Vec::new();
        match &self.accounts {
            Some(previous) if *previous != accounts => {
                events.push(WalletEvent::AccountsChanged(accounts.clone()));
            }
            _ => {}
        }
        match self.chain_id {
            Some(previous) if previous != chain_id => {
                events.push(WalletEvent::ChainChanged(chain_id));
            }
            _ => {}
        }
        self.accounts = Some(accounts);
        self.chain_id = Some(chain_id);
        events
    }

    /// Forget the baseline, e.g. after the app itself connected or disconnected.
    pub fn reset_accounts(&mut self, accounts: Vec<Address>) {
        self.accounts = Some(accounts);
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn observe__first_poll_sets_baseline_without_events() {
        let mut watcher = WalletWatcher::new();
        let events = watcher.observe(vec![Address::repeat_byte(1)], 31337);
        assert!(events.is_empty());
    }

    #[test]
    fn observe__reports_account_and_chain_changes() {
        // given
        let mut watcher = WalletWatcher::new();
        watcher.observe(vec![Address::repeat_byte(1)], 31337);

        // when
        let events = watcher.observe(vec![Address::repeat_byte(2)], 11155111);

        // then
        assert_eq!(
            events,
            vec![
                WalletEvent::AccountsChanged(vec![Address::repeat_byte(2)]),
                WalletEvent::ChainChanged(11155111),
            ]
        );
    }

    #[test]
    fn observe__unchanged_poll_is_quiet() {
        let mut watcher = WalletWatcher::new();
        watcher.observe(vec![], 1);
        assert!(watcher.observe(vec![], 1).is_empty());
    }

    #[test]
    fn chain_change_policy__parses_cli_values() {
        assert_eq!(
            "in-place".parse::<ChainChangePolicy>(),
            Ok(ChainChangePolicy::ReloadInPlace)
        );
        assert_eq!("reload".parse::<ChainChangePolicy>(), Ok(ChainChangePolicy::FullReload));
        assert!("sometimes".parse::<ChainChangePolicy>().is_err());
    }
}
