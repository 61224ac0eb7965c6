use std::sync::Arc;
use std::{io, net};

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;

use crate::clock::{Clock, SystemClock};
use crate::configuration::Settings;
use crate::routes::{
    confirm_subscription, confirm_unsubscription, healthcheck, subscribe, unsubscribe,
    unsubscribe_form,
};
use crate::verification::VerificationProtocol;

/// Application
pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    /// Build an application based on settings
    pub fn build(config: Settings) -> anyhow::Result<Self> {
        Self::build_with_clock(config, Arc::new(SystemClock))
    }

    /// Build an application based on settings and a time source
    pub fn build_with_clock(config: Settings, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        // Open the record stores and build the email client
        let (subscribers, ledger) = config.storage.open(clock)?;
        let email_client = config.email_client.client()?;
        let protocol = VerificationProtocol::new(subscribers, ledger, Arc::new(email_client));

        // Run the HTTP server and return its data
        let listener = net::TcpListener::bind(format!(
            "{}:{}",
            config.application.app_host, config.application.app_port
        ))?;
        let port = listener.local_addr()?.port();
        let server = run_server(listener, protocol)?;
        Ok(Self { server, port })
    }

    /// Get application port
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Run application until it is stopped
    pub async fn run_until_stopped(self) -> io::Result<()> {
        self.server.await
    }
}

/// Run the HTTP server
pub fn run_server(
    listener: net::TcpListener,
    protocol: VerificationProtocol,
) -> io::Result<Server> {
    // Prepare data to be added the application context
    let protocol = web::Data::new(protocol);

    // Start the HTTP server
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/healthcheck", web::get().to(healthcheck))
            .route("/subscriptions", web::post().to(subscribe))
            .route("/subscriptions/confirm", web::post().to(confirm_subscription))
            .route("/unsubscriptions", web::get().to(unsubscribe_form))
            .route("/unsubscriptions", web::post().to(unsubscribe))
            .route(
                "/unsubscriptions/confirm",
                web::post().to(confirm_unsubscription),
            )
            .app_data(protocol.clone())
    })
    .listen(listener)?
    .run())
}
