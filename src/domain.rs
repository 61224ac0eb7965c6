mod email_address;
mod intent;
mod verification_code;

pub use email_address::EmailAddress;
pub use intent::Intent;
pub use verification_code::{VerificationCode, CODE_WIDTH};
