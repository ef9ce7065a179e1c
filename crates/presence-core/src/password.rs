//! Battery-derived password
//!
//! The valid password is a fixed prefix followed by the decimal digit-sum of
//! the current battery percentage, e.g. battery 87% gives `<prefix>15`.
//! It is a public function of device state, not a secret.

use crate::{Error, Result, PASSWORD_PREFIX};

/// Sum of the decimal digits of `value`
///
/// `digit_sum(0)` is 0.
pub fn digit_sum(mut value: u32) -> u32 {
    let mut sum = 0;
    while value > 0 {
        sum += value % 10;
        value /= 10;
    }
    sum
}

/// Checks a raw battery reading and narrows it to a percentage
pub fn battery_percent(raw: u32) -> Result<u8> {
    if raw > 100 {
        return Err(Error::InvalidBatteryPercent(raw));
    }
    Ok(raw as u8)
}

/// Password policy derived from the battery level
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordPolicy {
    prefix: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(PASSWORD_PREFIX)
    }
}

impl PasswordPolicy {
    /// Create a policy with a custom prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The fixed password prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The single password accepted at the given battery level
    pub fn expected_password(&self, battery_percent: u8) -> String {
        format!("{}{}", self.prefix, digit_sum(u32::from(battery_percent)))
    }

    /// Exact comparison against the expected password, no trimming
    pub fn validate(&self, candidate: &str, battery_percent: u8) -> bool {
        candidate == self.expected_password(battery_percent)
    }
}
