// Utility to mail a single digest and sweep stale verification codes, e.g. from cron

use std::{env, io, process};

use comic_digest::configuration::Settings;
use comic_digest::digest_worker::DigestWorker;
use comic_digest::telemetry::{get_subscriber, init_subscriber};

/// Run one digest cycle and exit
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.len() > 1 {
        usage(&args[0]);
    }

    // Initialize logging
    let subscriber = get_subscriber("send_digest".into(), "info".into(), io::stdout);
    init_subscriber(subscriber);

    // Retrieve settings and run the cycle
    let config = Settings::get_config()?;
    let report = DigestWorker::build(config)?.run_once().await?;
    tracing::info!(
        sent = report.sent,
        failed = report.failed,
        swept = report.swept,
        "Digest sent"
    );

    Ok(())
}

/// Print usage information and exit
fn usage(prog: &str) {
    println!("Usage:");
    println!("{prog}");
    println!("\nSettings are read from ./configuration and COMIC_DIGEST__* variables.");

    process::exit(1);
}
