use std::fmt;

use rand::{thread_rng, Rng};

/// Number of digits in a verification code
pub const CODE_WIDTH: usize = 6;

/// Largest numeric value a code can take
const CODE_MAX: u32 = 999_999;

/// Fixed-width, zero-padded numeric verification code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Generate a code uniformly at random in `[0, 999999]`
    pub fn generate() -> Self {
        let value = thread_rng().gen_range(0..=CODE_MAX);
        Self(format!("{value:0width$}", width = CODE_WIDTH))
    }

    /// Parse a user-submitted code, discarding surrounding whitespace
    pub fn parse(code: String) -> Result<Self, String> {
        let code = code.trim();
        if code.len() == CODE_WIDTH && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_owned()))
        } else {
            Err(format!("{code} is not a {CODE_WIDTH}-digit verification code"))
        }
    }
}

impl AsRef<str> for VerificationCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
