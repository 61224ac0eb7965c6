use std::io;

use comic_digest::configuration::Settings;
use comic_digest::digest_worker::DigestWorker;
use comic_digest::startup::Application;
use comic_digest::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
#[allow(clippy::redundant_pub_crate)]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = get_subscriber("comic_digest".into(), "info".into(), io::stdout);
    init_subscriber(subscriber);

    // Retrieve settings
    let config = Settings::get_config()?;

    // Prepare the application and the digest worker
    let application = Application::build(config.clone())?.run_until_stopped();
    let worker = DigestWorker::build(config)?.run_until_stopped();

    // Run both tasks concurrently, return as soon as one of the tasks completes or errors out
    tokio::select! {
        r = application => r?,
        r = worker => r?,
    }

    Ok(())
}
