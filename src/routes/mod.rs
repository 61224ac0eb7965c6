mod healthcheck;
mod helpers;
mod subscriptions;
mod unsubscriptions;

pub use healthcheck::*;
pub use subscriptions::*;
pub use unsubscriptions::*;
