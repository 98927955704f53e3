use crate::error::ActionError;
use alloy::primitives::{
    U256,
    utils::parse_ether,
};

/// Parses a user-entered ETH amount into wei. Empty, zero, negative and
/// non-decimal input is rejected before any call is formed.
pub fn validate_amount(text: &str) -> Result<U256, ActionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(ActionError::InvalidAmount);
    }
    let well_formed = trimmed.chars().all(|c| c.is_ascii_digit() || c == '.')
        && trimmed.chars().filter(|c| *c == '.').count() <= 1
        && trimmed.chars().any(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(ActionError::InvalidAmount);
    }
    let wei = parse_ether(trimmed).map_err(|_| ActionError::InvalidAmount)?;
    if wei.is_zero() {
        return Err(ActionError::InvalidAmount);
    }
    Ok(wei)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn validate_amount__parses_decimal_eth_into_wei() {
        // given
        let input = "0.01";

        // when
        let wei = validate_amount(input).unwrap();

        // then
        assert_eq!(wei, U256::from(10_000_000_000_000_000u64));
    }

    #[test]
    fn validate_amount__rejects_empty_zero_and_negative() {
        for input in ["", "   ", "0", "0.0", "-1", "-0.5"] {
            assert_eq!(
                validate_amount(input),
                Err(ActionError::InvalidAmount),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn validate_amount__rejects_non_numeric_text() {
        for input in ["abc", "1e18", "1.2.3", ".", "0x10"] {
            assert_eq!(
                validate_amount(input),
                Err(ActionError::InvalidAmount),
                "input {input:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn validate_amount__positive_decimals_parse_above_zero(
            whole in 0u64..1_000_000,
            fraction in 0u64..1_000_000,
        ) {
            prop_assume!(whole > 0 || fraction > 0);
            let input = format!("{whole}.{fraction:06}");
            let wei = validate_amount(&input).unwrap();
            prop_assert!(wei > U256::ZERO);
        }

        #[test]
        fn validate_amount__negative_inputs_always_fail(value in 0u64..1_000_000) {
            let input = format!("-{value}");
            prop_assert_eq!(validate_amount(&input), Err(ActionError::InvalidAmount));
        }
    }
}
