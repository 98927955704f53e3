use crate::session::NetworkInfo;
use alloy::primitives::{
    Address,
    U256,
    utils::format_ether,
};
use chrono::DateTime;

const PLACEHOLDER: &str = "-";
const FRACTION_DIGITS: usize = 6;

/// Cuts a decimal string to six fraction digits, dropping trailing zeros.
pub fn trim_value(value: &str) -> String {
    match value.split_once('.') {
        Some((whole, fraction)) => {
            let cut = &fraction[..fraction.len().min(FRACTION_DIGITS)];
            let cut = cut.trim_end_matches('0');
            if cut.is_empty() {
                whole.to_owned()
            } else {
                format!("{whole}.{cut}")
            }
        }
        None => value.to_owned(),
    }
}

pub fn format_eth(wei: Option<U256>) -> String {
    match wei {
        Some(wei) => trim_value(&format_ether(wei)),
        None => String::from(PLACEHOLDER),
    }
}

pub fn short_address(address: Option<Address>) -> String {
    let Some(address) = address else {
        return String::from(PLACEHOLDER);
    };
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

pub fn full_address(address: Option<Address>) -> String {
    address
        .map(|a| a.to_checksum(None))
        .unwrap_or_else(|| String::from(PLACEHOLDER))
}

/// Seconds since the epoch rendered as `YYYY/MM/DD HH:MM:SS` in UTC.
pub fn format_timestamp(seconds: Option<u64>) -> String {
    seconds
        .filter(|s| *s > 0)
        .and_then(|s| i64::try_from(s).ok())
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y/%m/%d %H:%M:%S").to_string())
        .unwrap_or_else(|| String::from(PLACEHOLDER))
}

pub fn describe_network(network: Option<&NetworkInfo>) -> String {
    network
        .map(ToString::to_string)
        .unwrap_or_else(|| String::from(PLACEHOLDER))
}

pub fn format_flag(flag: Option<bool>) -> String {
    match flag {
        Some(true) => String::from("yes"),
        Some(false) => String::from("no"),
        None => String::from(PLACEHOLDER),
    }
}
