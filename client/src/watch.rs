//! Interactive watch mode.
//!
//! A background task runs a sync cycle every interval while the console
//! reads commands line by line and prints each cycle's outcome. A timer
//! tick that lands while another cycle is running is skipped.

use crate::cli::ConsoleLine;
use crate::commands;
use crate::console::split_line;
use crate::error::{AppError, Result};
use crate::remote::RemoteStore;
use crate::status::Status;
use crate::sync::{failure_status, SyncEngine};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Timed cycle results waiting for the console
const UPDATE_BUFFER: usize = 16;
const READY: &str = "Ready. Automatic sync enabled.";
const HELP: &str = "Commands: list [--category C], categories, random, add <text> <category>, \
                    sync, conflicts, resolve <id> <keep-server|keep-local|dismiss>, \
                    simulate-conflict, help, quit";

/// Run watch mode on stdin and stdout until `quit`, end of input or Ctrl-C.
pub async fn run<R: RemoteStore + 'static>(engine: Arc<SyncEngine<R>>, interval: Duration) -> Result<()> {
    let (updates_tx, updates_rx) = mpsc::channel(UPDATE_BUFFER);
    let auto_sync = spawn_auto_sync(Arc::clone(&engine), interval, updates_tx);

    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();

    let result = tokio::select! {
        result = run_console(&engine, input, &mut output, updates_rx) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(())
        }
    };

    auto_sync.abort();
    result
}

/// Start the periodic sync task. The first cycle runs immediately.
///
/// The outcome of every cycle it runs is sent on `updates` as display
/// lines. The task stops once the receiving side is gone.
pub fn spawn_auto_sync<R: RemoteStore + 'static>(
    engine: Arc<SyncEngine<R>>,
    interval: Duration,
    updates: mpsc::Sender<Vec<String>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let lines = match engine.sync_now().await {
                Ok(report) => commands::sync_lines(&report),
                Err(AppError::SyncInProgress) => {
                    tracing::debug!("Skipping tick, sync already running");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Automatic sync failed");
                    vec![failure_status(&e).to_string()]
                }
            };
            if updates.send(lines).await.is_err() {
                break;
            }
        }
    })
}

/// Read commands from `input` and write their output to `output`, along
/// with any sync results arriving on `updates`.
pub async fn run_console<R, I, W>(
    engine: &SyncEngine<R>,
    input: I,
    output: &mut W,
    mut updates: mpsc::Receiver<Vec<String>>,
) -> Result<()>
where
    R: RemoteStore,
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_lines(output, &[READY.to_string()]).await?;

    let mut lines = input.lines();
    let mut updates_open = true;
    loop {
        tokio::select! {
            // Pending sync results are shown before the next command runs
            biased;

            update = updates.recv(), if updates_open => match update {
                Some(update) => write_lines(output, &update).await?,
                None => updates_open = false,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "quit" | "exit" => break,
                    "help" => write_lines(output, &[HELP.to_string()]).await?,
                    line => {
                        let out = match handle_line(engine, line).await {
                            Ok(out) => out,
                            Err(e) => vec![Status::error(e.to_string()).to_string()],
                        };
                        write_lines(output, &out).await?;
                    }
                }
            }
        }
    }
    Ok(())
}

async fn handle_line<R: RemoteStore>(engine: &SyncEngine<R>, line: &str) -> Result<Vec<String>> {
    let args = match split_line(line) {
        Ok(args) => args,
        Err(e) => return Ok(vec![Status::error(e.to_string()).to_string()]),
    };
    match ConsoleLine::try_parse_from(args) {
        Ok(parsed) => commands::execute(engine, parsed.command).await,
        Err(e) => Ok(vec![e.to_string().trim_end().to_string()]),
    }
}

async fn write_lines<W: AsyncWrite + Unpin>(output: &mut W, lines: &[String]) -> Result<()> {
    for line in lines {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }
    output.flush().await?;
    Ok(())
}
