use alloy::{
    primitives::Bytes,
    transports::{
        RpcError,
        TransportErrorKind,
    },
};
use std::fmt;
use thiserror::Error;

/// JSON-RPC code wallets use when the user declines a request (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// A failure reported by the wallet or chain, kept in the loose shape providers
/// hand back so that [`crate::normalize`] can pick the most useful message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainError {
    pub code: Option<i64>,
    pub short_message: Option<String>,
    pub reason: Option<String>,
    pub revert_data: Option<Bytes>,
    pub message: Option<String>,
    pub cause: Option<Box<ChainError>>,
}

impl ChainError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn user_rejected() -> Self {
        Self {
            code: Some(USER_REJECTED_CODE),
            short_message: Some(String::from("User rejected the request.")),
            ..Self::default()
        }
    }

    pub fn reverted(data: impl Into<Bytes>) -> Self {
        Self {
            message: Some(String::from("execution reverted")),
            revert_data: Some(data.into()),
            ..Self::default()
        }
    }

    pub fn with_short_message(mut self, short: impl Into<String>) -> Self {
        self.short_message = Some(short.into());
        self
    }

    pub fn with_cause(mut self, cause: ChainError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Walks this error and its causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &ChainError> {
        std::iter::successors(Some(self), |e| e.cause.as_deref())
    }

    pub fn is_user_rejection(&self) -> bool {
        self.chain().any(|e| {
            if e.code == Some(USER_REJECTED_CODE) {
                return true;
            }
            [&e.short_message, &e.message].into_iter().flatten().any(|m| {
                let m = m.to_lowercase();
                m.contains("user rejected") || m.contains("user denied")
            })
        })
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::normalize::normalize_error(self))
    }
}

impl std::error::Error for ChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl From<RpcError<TransportErrorKind>> for ChainError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        match err {
            RpcError::ErrorResp(payload) => {
                let revert_data = payload
                    .data
                    .as_ref()
                    .and_then(|raw| serde_json::from_str::<String>(raw.get()).ok())
                    .and_then(|text| {
                        let stripped = text.strip_prefix("0x").unwrap_or(&text);
                        hex::decode(stripped).ok()
                    })
                    .filter(|bytes| !bytes.is_empty())
                    .map(Bytes::from);
                let short_message = (payload.code == USER_REJECTED_CODE)
                    .then(|| String::from("User rejected the request."));
                Self {
                    code: Some(payload.code),
                    short_message,
                    reason: None,
                    revert_data,
                    message: Some(payload.message.to_string()),
                    cause: None,
                }
            }
            RpcError::Transport(kind) => {
                Self::msg(kind.to_string()).with_short_message("Network request failed.")
            }
            RpcError::NullResp => Self::msg("node returned an empty response"),
            other => Self::msg(other.to_string()),
        }
    }
}

/// Everything an action on the playground can end with, other than success.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("Please connect a wallet first")]
    NotConnected,
    #[error("Enter a positive ETH amount")]
    InvalidAmount,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Request rejected: {0}")]
    CallRejectedByUser(String),
    #[error("Transaction failed: {0}")]
    CallDispatchFailed(String),
    #[error("Confirmation failed: {0}")]
    ConfirmationFailed(String),
    #[error("Read failed: {0}")]
    ReadFailed(String),
}

impl ActionError {
    /// Classifies a failed write dispatch.
    pub fn from_dispatch(err: &ChainError) -> Self {
        let message = crate::normalize::normalize_error(err);
        if err.is_user_rejection() {
            ActionError::CallRejectedByUser(message)
        } else {
            ActionError::CallDispatchFailed(message)
        }
    }

    pub fn from_confirmation(err: &ChainError) -> Self {
        ActionError::ConfirmationFailed(crate::normalize::normalize_error(err))
    }

    pub fn from_read(err: &ChainError) -> Self {
        ActionError::ReadFailed(crate::normalize::normalize_error(err))
    }

    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ActionError::NotConnected
                | ActionError::InvalidAmount
                | ActionError::InvalidInput(_)
        )
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn is_user_rejection__detects_code_4001_anywhere_in_chain() {
        // given
        let err = ChainError::msg("transaction failed").with_cause(ChainError {
            code: Some(USER_REJECTED_CODE),
            ..ChainError::default()
        });

        // when
        let rejected = err.is_user_rejection();

        // then
        assert!(rejected);
    }

    #[test]
    fn is_user_rejection__matches_denied_signature_wording() {
        // given
        let err = ChainError::msg("MetaMask Tx Signature: User denied transaction signature.");

        // when
        let rejected = err.is_user_rejection();

        // then
        assert!(rejected);
    }

    #[test]
    fn from_dispatch__separates_rejections_from_other_failures() {
        // given
        let rejected = ChainError::user_rejected();
        let other = ChainError::msg("nonce too low");

        // when
        let a = ActionError::from_dispatch(&rejected);
        let b = ActionError::from_dispatch(&other);

        // then
        assert_eq!(
            a,
            ActionError::CallRejectedByUser(String::from("User rejected the request."))
        );
        assert_eq!(b, ActionError::CallDispatchFailed(String::from("nonce too low")));
    }

    #[test]
    fn is_local__only_for_errors_caught_before_any_call() {
        assert!(ActionError::NotConnected.is_local());
        assert!(ActionError::InvalidAmount.is_local());
        assert!(!ActionError::ReadFailed(String::from("x")).is_local());
    }
}
