//! Flattens wallet and chain failures into one line for the status panel.

use crate::error::ChainError;
use alloy::sol_types::{
    Revert,
    SolError,
};

pub const UNKNOWN_ERROR: &str = "unknown error";

/// Picks the most specific message available, in this order: short message or
/// reason, a decoded `Error(string)` revert, the first message found on the
/// cause chain, the error's own message, then [`UNKNOWN_ERROR`].
pub fn normalize_error(err: &ChainError) -> String {
    if let Some(short) = non_blank(err.short_message.as_deref())
        .or_else(|| non_blank(err.reason.as_deref()))
    {
        return short.to_owned();
    }

    if let Some(reason) = err
        .chain()
        .filter_map(|e| e.revert_data.as_ref())
        .find_map(|data| decode_revert_reason(data))
    {
        return reason;
    }

    let from_cause = err.chain().skip(1).find_map(|cause| {
        non_blank(cause.short_message.as_deref())
            .or_else(|| non_blank(cause.reason.as_deref()))
            .or_else(|| non_blank(cause.message.as_deref()))
    });
    if let Some(message) = from_cause {
        return message.to_owned();
    }

    non_blank(err.message.as_deref())
        .map(str::to_owned)
        .unwrap_or_else(|| String::from(UNKNOWN_ERROR))
}

/// Decodes a standard `Error(string)` revert payload (selector `0x08c379a0`).
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < 4 || data[..4] != Revert::SELECTOR {
        return None;
    }
    Revert::abi_decode(data)
        .ok()
        .map(|revert| revert.reason)
        .filter(|reason| !reason.trim().is_empty())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
