use std::path::PathBuf;
use std::sync::Arc;
use std::{env, time};

use config::{Config, ConfigError, Environment, File};
use secrecy::SecretString;
use url::Url;

use crate::clock::Clock;
use crate::comic_client::ComicClient;
use crate::domain::EmailAddress;
use crate::email_client::EmailClient;
use crate::store::{FileStore, StoreError};
use crate::subscribers::SubscriberSet;
use crate::verification::VerificationLedger;

/// Settings
#[derive(Clone, serde::Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub storage: StorageSettings,
    pub email_client: EmailClientSettings,
    pub digest: DigestSettings,
}

impl Settings {
    /// Get settings from configuration files
    pub fn get_config() -> Result<Self, ConfigError> {
        let path = env::current_dir().map_err(|e| ConfigError::Foreign(Box::new(e)))?;
        let config_dir = path.join("configuration");

        // Detect the running environment (default: `dev`)
        let env: Env = env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "dev".into())
            .try_into()
            .map_err(ConfigError::Message)?;

        // Read the configuration from files and environment variables
        Config::builder()
            // Base configuration file
            .add_source(File::from(config_dir.join("base.yaml")).required(true))
            // Environment-specific configuration file
            .add_source(
                File::from(config_dir.join(format!("{}.yaml", env.as_str()))).required(true),
            )
            // Environment variables (e.g., `COMIC_DIGEST__APPLICATION__APP_PORT=8888`
            // would set Settings.application.app_port to 8888)
            .add_source(Environment::with_prefix("COMIC_DIGEST").separator("__"))
            .build()?
            .try_deserialize()
    }
}

/// Application settings
#[derive(Clone, serde::Deserialize)]
pub struct ApplicationSettings {
    pub app_host: String,
    pub app_port: u16,
}

/// Record store settings
#[derive(Clone, serde::Deserialize)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub subscribers_file: String,
    pub verification_file: String,
}

impl StorageSettings {
    /// Open the file-backed subscriber set and verification ledger
    pub fn open(
        &self,
        clock: Arc<dyn Clock>,
    ) -> Result<(SubscriberSet, VerificationLedger), StoreError> {
        let subscribers = FileStore::open(self.data_dir.join(&self.subscribers_file))?;
        let codes = FileStore::open(self.data_dir.join(&self.verification_file))?;
        Ok((
            SubscriberSet::new(Arc::new(subscribers)),
            VerificationLedger::new(Arc::new(codes), clock),
        ))
    }
}

/// Email client settings
#[derive(Clone, serde::Deserialize)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub authorization_token: SecretString,
    pub timeout_millis: u64,
}

impl EmailClientSettings {
    /// Build the email client
    pub fn client(self) -> anyhow::Result<EmailClient> {
        let base_url = self.base_url()?;
        let sender_email = self.sender_email().map_err(anyhow::Error::msg)?;
        let timeout = self.timeout();
        Ok(EmailClient::new(
            base_url,
            sender_email,
            self.authorization_token,
            timeout,
        )?)
    }

    /// Parse base URL
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    /// Parse sender email
    pub fn sender_email(&self) -> Result<EmailAddress, String> {
        EmailAddress::parse(self.sender_email.clone())
    }

    /// Get configured timeout
    pub const fn timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_millis)
    }
}

/// Digest settings
#[derive(Clone, serde::Deserialize)]
pub struct DigestSettings {
    pub base_url: String,
    pub unsubscribe_url: String,
    pub interval_secs: u64,
    pub timeout_millis: u64,
}

impl DigestSettings {
    /// Build the comic client
    pub fn client(&self) -> anyhow::Result<ComicClient> {
        let base_url = Url::parse(&self.base_url)?;
        let unsubscribe_url = Url::parse(&self.unsubscribe_url)?;
        Ok(ComicClient::new(
            base_url,
            unsubscribe_url,
            time::Duration::from_millis(self.timeout_millis),
        )?)
    }

    /// Time between two digest cycles
    pub const fn interval(&self) -> time::Duration {
        time::Duration::from_secs(self.interval_secs)
    }
}

/// Available runtime environments
#[derive(Debug)]
pub enum Env {
    Development,
    Production,
}

impl Env {
    /// Represent environment as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::Production => "prd",
        }
    }
}

impl TryFrom<String> for Env {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "dev" => Ok(Self::Development),
            "prd" => Ok(Self::Production),
            other => Err(format!(
                "`{other}` is not a supported environment. Use either `dev` or `prd`"
            )),
        }
    }
}
