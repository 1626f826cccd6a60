mod config;
mod digest;
mod email;
mod error;
mod fetcher;
mod post;
mod scheduler;
mod twitter;

use anyhow::Result;

use std::sync::Arc;

use crate::config::Config;
use crate::email::SmtpSender;
use crate::scheduler::{Schedule, Scheduler, SystemClock};
use crate::twitter::TwitterClient;

#[tokio::main]
async fn main() -> Result<()> {
    setup_env_and_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    tracing::info!("Starting service with configured credentials...");

    let schedule = Schedule {
        trigger_time: config.trigger_time,
        poll_interval: config.poll_interval,
        max_results: config.max_results,
    };
    let source = Arc::new(TwitterClient::new(&config));
    let transport = Arc::new(SmtpSender::new(&config));

    let mut scheduler = Scheduler::new(source, transport, Arc::new(SystemClock), schedule);
    scheduler.run_loop().await
}

pub fn setup_env_and_tracing() {
    dotenv::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
