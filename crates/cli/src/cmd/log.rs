//! Batch log demo
//!
//! Drives a batcher through a coalesced flush, a blocked flush and a clear,
//! then prints what it logged.

use crate::system_config::SystemConfig;
use anyhow::{Context, Result};
use batcher::{ActionBatcher, BatchOutcome};
use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub async fn run(config: &SystemConfig, name: &str) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let log = config.batch_log();
    let batcher = ActionBatcher::new(config.batcher_config(name), log.clone());

    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    batcher.add_listener("count", move || {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    // Three stages, two keys: one flush of two actions
    batcher.stage("alpha", || {});
    batcher.stage("beta", || {});
    batcher.stage("alpha", || {});
    batcher.run_pending();
    report("coalesced", batcher.completion().await);

    // Blocked while the timer elapses, flushed on unblock
    batcher.block("demo");
    batcher.run("gamma", || {});
    tokio::time::sleep(config.batcher_config(name).interval() + Duration::from_millis(10)).await;
    batcher.unblock("demo");
    report("blocked", batcher.completion().await);

    // Staged then thrown away
    batcher.stage("delta", || {});
    let discarded = batcher.completion();
    batcher.clear("demo");
    report("cleared", discarded.await);

    println!(
        "{} listener ran {} time{}\n",
        batcher.name().bold(),
        runs.load(Ordering::Relaxed),
        if runs.load(Ordering::Relaxed) == 1 { "" } else { "s" }
    );

    log.write_log(&mut std::io::stdout().lock(), None)?;
    batcher.dispose();
    Ok(())
}

fn report(label: &str, outcome: BatchOutcome) {
    match outcome {
        BatchOutcome::Flushed(report) => println!(
            "{} {:<10} {} action(s), {} listener(s), {} failure(s)",
            "✓".green(),
            label,
            report.actions,
            report.listeners,
            report.failures
        ),
        BatchOutcome::Discarded => println!("{} {:<10} discarded", "•".yellow(), label),
    }
}
