//! Background bot worker.
//!
//! The worker runs on its own OS thread with a single-threaded tokio runtime,
//! so nothing it does can stall the liveness listener. The caller keeps a
//! [`BotHandle`] for lifecycle control; the only thing the two sides share is
//! a [`CancellationToken`].

use std::thread::JoinHandle;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    bot::{Bot, CommandSet, StartupLog},
    config::BotConfig,
    gateway::{RestClient, Session},
};

/// Owner's view of a running worker.
pub struct BotHandle {
    cancel: CancellationToken,
    thread: JoinHandle<anyhow::Result<()>>,
}

impl BotHandle {
    /// Ask the worker to close its connection and exit.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Token cancelled when the worker is stopped, including by the `quit` command.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the worker thread exits and return its result.
    pub fn join(self) -> anyhow::Result<()> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => anyhow::bail!("bot worker thread panicked"),
        }
    }
}

/// Start the worker on a new thread named `bot-worker`.
pub fn spawn(config: BotConfig, token: String) -> anyhow::Result<BotHandle> {
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();

    let thread = std::thread::Builder::new()
        .name("bot-worker".into())
        .spawn(move || {
            let result = run(&config, &token, worker_cancel);
            match &result {
                Ok(()) => info!("bot worker stopped"),
                Err(e) => error!("bot worker failed: {e:#}"),
            }
            result
        })
        .context("spawning bot worker thread")?;

    Ok(BotHandle { cancel, thread })
}

fn run(config: &BotConfig, token: &str, cancel: CancellationToken) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building bot worker runtime")?;

    runtime.block_on(async {
        let rest = RestClient::new(config, token)?;
        let mut bot = Bot::new(
            CommandSet::new(config.prefix()),
            StartupLog::new(&config.log_file),
        );

        info!(gateway = %config.gateway_url, prefix = %config.prefix(), "bot worker starting");
        Session::new(&config.gateway_url, token, &mut bot, &rest, cancel)
            .run()
            .await
            .context("gateway session ended")
    })
}
