use std::fmt;
use std::sync::Arc;

use anyhow::Context;

use super::{LedgerError, VerificationLedger};
use crate::domain::{EmailAddress, Intent, VerificationCode};
use crate::email_client::EmailClient;
use crate::store::StoreError;
use crate::subscribers::{SubscriberError, SubscriberSet};
use crate::telemetry::spawn_blocking_with_tracing;
use crate::utils::error_chain_fmt;

/// Verification protocol error
#[derive(thiserror::Error)]
pub enum ProtocolError {
    #[error("{0}")]
    ValidationError(String),
    #[error("This email address is already subscribed")]
    AlreadyExists,
    #[error("This email address is not subscribed")]
    NotRegistered,
    #[error("Invalid or expired verification code")]
    InvalidOrExpired,
    #[error("Failed to apply the confirmed request")]
    ApplyError(#[source] SubscriberError),
    #[error("Failed to access the record store")]
    IoError(#[from] StoreError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<LedgerError> for ProtocolError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::InvalidOrExpired => Self::InvalidOrExpired,
            LedgerError::Store(e) => Self::IoError(e),
        }
    }
}

/// Issues verification codes and applies the intent they gate once confirmed
#[derive(Clone)]
pub struct VerificationProtocol {
    subscribers: SubscriberSet,
    ledger: VerificationLedger,
    email_client: Arc<EmailClient>,
}

impl VerificationProtocol {
    pub fn new(
        subscribers: SubscriberSet,
        ledger: VerificationLedger,
        email_client: Arc<EmailClient>,
    ) -> Self {
        Self {
            subscribers,
            ledger,
            email_client,
        }
    }

    /// Issue a code for `email` and mail it; a failed delivery does not fail the request
    #[tracing::instrument(
        name = "Requesting a verification code",
        skip(self, email),
        fields(subscriber_email = %email)
    )]
    pub async fn request_action(&self, email: String, intent: Intent) -> Result<(), ProtocolError> {
        let email = EmailAddress::parse(email).map_err(ProtocolError::ValidationError)?;
        let code = VerificationCode::generate();

        // Check the subscription state and store the code
        let subscribers = self.subscribers.clone();
        let ledger = self.ledger.clone();
        let (stored_email, stored_code) = (email.clone(), code.clone());
        spawn_blocking_with_tracing(move || -> Result<(), ProtocolError> {
            let subscribed = subscribers.contains(stored_email.as_ref())?;
            match intent {
                Intent::Register if subscribed => Err(ProtocolError::AlreadyExists),
                Intent::Unregister if !subscribed => Err(ProtocolError::NotRegistered),
                _ => Ok(ledger.issue(stored_email.as_ref(), stored_code.as_ref())?),
            }
        })
        .await
        .context("Failed to spawn blocking task")??;

        self.deliver_code(&email, &code, intent).await;
        Ok(())
    }

    /// Consume a code for `email` and apply `intent` to the subscriber set
    #[tracing::instrument(
        name = "Confirming a verification code",
        skip(self, email, code),
        fields(subscriber_email = %email)
    )]
    pub async fn confirm_action(
        &self,
        email: String,
        code: String,
        intent: Intent,
    ) -> Result<(), ProtocolError> {
        // Malformed input can't match any entry, so it gets the same answer as a wrong code
        let (Ok(email), Ok(code)) = (EmailAddress::parse(email), VerificationCode::parse(code))
        else {
            return Err(ProtocolError::InvalidOrExpired);
        };

        let subscribers = self.subscribers.clone();
        let ledger = self.ledger.clone();
        spawn_blocking_with_tracing(move || -> Result<(), ProtocolError> {
            ledger.validate(email.as_ref(), code.as_ref())?;
            match intent {
                Intent::Register => subscribers.add(email.as_ref()),
                Intent::Unregister => subscribers.remove(email.as_ref()),
            }
            .map_err(ProtocolError::ApplyError)?;
            tracing::info!("Confirmed request to {intent} {email}");
            Ok(())
        })
        .await
        .context("Failed to spawn blocking task")??;
        Ok(())
    }

    /// Mail the code, logging failures
    async fn deliver_code(&self, email: &EmailAddress, code: &VerificationCode, intent: Intent) {
        let action = intent.describe();
        let html_body = format!(
            "Hello!<br />\
            You asked to {action} the daily comic digest.<br />\
            Your verification code is: <strong>{code}</strong><br />\
            It expires in 10 minutes. If you didn't make this request, please ignore this email."
        );
        let text_body = format!(
            "Hello!\n\
            You asked to {action} the daily comic digest.\n\
            Your verification code is: {code}\n\
            It expires in 10 minutes. If you didn't make this request, please ignore this email."
        );

        if let Err(e) = self
            .email_client
            .send_email(email, intent.subject(), &html_body, &text_body)
            .await
        {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "Failed to deliver the verification code to {}", email
            );
        }
    }
}
