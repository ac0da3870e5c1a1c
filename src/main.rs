use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

mod config;
mod db;
mod domain;
mod errors;
mod migrator;
mod remote;


fn main() {
    // 1️⃣ Pick up a local .env, if any
    dotenvy::dotenv().ok();

    // 2️⃣ Logs go to stderr; stdout carries only the per-row lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::parse();

    // 3️⃣ Copy everything; row failures are printed, only setup failures are fatal
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = migrator::run(&config, &mut out) {
        eprintln!("❌ Migration aborted: {e}");
        std::process::exit(1);
    }
}
