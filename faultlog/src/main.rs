use std::{
    fs::File,
    io::{BufReader, LineWriter},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use collect::{collect, Completion, EXIT_CODE};
use tracing::{info, level_filters::LevelFilter, warn};

mod collect;

#[derive(Debug, Parser)]
#[command(author, version = env!("VERSION"), about)]
struct Opt {
    #[clap(
        short,
        long,
        default_value = "/proc/pf_probe_B",
        help = "proc node of the page fault probe. it is read until the probe writes EXIT_CODE"
    )]
    source: PathBuf,

    #[clap(short, long, default_value = "./pf_probe_B.log", help = "file where collected events are written")]
    log: PathBuf,

    #[clap(long, default_value = "50ms", help = "sleep after every collected line")]
    interval: humantime::Duration,
}

fn main() -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    ctrlc::set_handler({
        let running = running.clone();
        move || {
            running.store(false, Ordering::Relaxed);
        }
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let opt = Opt::parse();
    info!("collecting page faults from {}", opt.source.display());

    let source = File::open(&opt.source).with_context(|| format!("failed to open probe {}", opt.source.display()))?;
    let log = File::create(&opt.log).with_context(|| format!("failed to create log {}", opt.log.display()))?;
    let collected = collect(
        BufReader::new(source),
        &mut LineWriter::new(log),
        opt.interval.into(),
        &running,
    )?;
    match collected.completion {
        Completion::ExitCode => info!(
            "reading from {} completed, {} lines written to {}",
            opt.source.display(),
            collected.lines,
            opt.log.display()
        ),
        Completion::EndOfInput => warn!(
            "{} ended before {}, {} lines written to {}",
            opt.source.display(),
            EXIT_CODE,
            collected.lines,
            opt.log.display()
        ),
        Completion::Interrupted => info!(
            "interrupted, {} lines written to {}",
            collected.lines,
            opt.log.display()
        ),
    }
    Ok(())
}
