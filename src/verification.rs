mod ledger;
mod protocol;

pub use ledger::{LedgerError, VerificationEntry, VerificationLedger, TTL_RETAIN, TTL_VALIDATE};
pub use protocol::{ProtocolError, VerificationProtocol};
