use std::fmt;

/// Action gated by a verification code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Register,
    Unregister,
}

impl Intent {
    /// Subject line of the email carrying the verification code
    pub const fn subject(self) -> &'static str {
        match self {
            Self::Register => "Comic Digest Subscription - Verification Code",
            Self::Unregister => "Comic Digest Unsubscription - Verification Code",
        }
    }

    /// Short description of the requested action, as shown to the user
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Register => "subscribe to",
            Self::Unregister => "unsubscribe from",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => f.write_str("register"),
            Self::Unregister => f.write_str("unregister"),
        }
    }
}
