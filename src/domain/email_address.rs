use std::fmt;

use validator::ValidateEmail;

/// Email address, trimmed and checked against the `local@domain` grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse email address, discarding surrounding whitespace
    pub fn parse(email: String) -> Result<Self, String> {
        let email = email.trim().to_owned();
        if email.validate_email() {
            Ok(Self(email))
        } else {
            Err(format!("{email} is not a valid email address"))
        }
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
