use std::{
    io,
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use tracing::{debug, info, level_filters::LevelFilter};

use crate::buffer::SampleBuffer;

mod buffer;
mod hog;

// exit status of usage errors, observed as 255 by the parent
const USAGE_EXIT_CODE: i32 = -1;

#[derive(Debug, Parser)]
#[command(author, version = env!("VERSION"), about, args_conflicts_with_subcommands = true)]
struct Opt {
    #[clap(
        index(1),
        value_parser = clap::value_parser!(u64).range(1..),
        help = "number of desired page faults. buffer will span exactly that many pages"
    )]
    faults: Option<u64>,

    #[clap(
        long,
        default_value = "12s",
        help = "sleep before allocating the buffer, leaves time to attach a probe to the printed pid"
    )]
    delay: humantime::Duration,

    #[clap(long, default_value = "1s", help = "sleep between touching consecutive pages")]
    interval: humantime::Duration,

    #[clap(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Parser)]
enum Command {
    #[clap(
        about = "allocate chunks and retain them until interrupted. once memory is exhausted faults turn into major faults"
    )]
    Hog {
        #[clap(long, default_value = "1073741824", help = "size of every allocated chunk in bytes")]
        chunk: usize,
        #[clap(
            long,
            default_value = "1048576",
            value_parser = clap::value_parser!(u64).range(1..),
            help = "distance in bytes between touched bytes within the chunk"
        )]
        stride: u64,
        #[clap(long, default_value = "500ms", help = "sleep after every chunk")]
        interval: humantime::Duration,
        #[clap(long, help = "stop after allocating that many chunks")]
        limit: Option<usize>,
    },
}

fn parse_opt() -> Opt {
    match Opt::try_parse() {
        Ok(opt) => opt,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            process::exit(USAGE_EXIT_CODE);
        }
        // help and version
        Err(err) => err.exit(),
    }
}

fn missing_faults() -> ! {
    let err = Opt::command().error(
        ErrorKind::MissingRequiredArgument,
        "number of desired page faults is required",
    );
    let _ = err.print();
    process::exit(USAGE_EXIT_CODE);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let opt = parse_opt();
    info!("my pid :: {}", process::id());

    match opt.cmd {
        Some(Command::Hog {
            chunk,
            stride,
            interval,
            limit,
        }) => {
            let running = Arc::new(AtomicBool::new(true));
            ctrlc::set_handler({
                let running = running.clone();
                move || {
                    running.store(false, Ordering::Relaxed);
                }
            })?;
            let cfg = hog::Config {
                chunk,
                stride: usize::try_from(stride).context("stride doesn't fit into usize")?,
                interval: interval.into(),
                limit,
            };
            let stats = hog::hog(&cfg, &running)?;
            info!("allocated {} chunks, touched {} times. bye ...", stats.chunks, stats.touches);
        }
        None => {
            let Some(faults) = opt.faults else { missing_faults() };
            minor_faults(faults, opt.delay.into(), opt.interval.into())?;
        }
    }
    Ok(())
}

fn minor_faults(faults: u64, delay: Duration, interval: Duration) -> Result<()> {
    let page_size = page_size()?;
    info!("page size: {}", page_size);
    info!("size of integer: {}", SampleBuffer::ELEMENT_SIZE);
    thread::sleep(delay);

    let pages = usize::try_from(faults).context("number of faults doesn't fit into usize")?;
    let mut buffer = SampleBuffer::new(page_size, pages)?;
    info!(
        "allocated buffer with {} elements, {} per page",
        buffer.len(),
        buffer.elements_per_page()
    );
    let touched = buffer.touch_pages(interval, |offset| debug!("touched element at offset {}", offset));
    info!("touched {} pages. my work is done", touched);
    Ok(())
}

fn page_size() -> Result<usize> {
    let rst = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if rst <= 0 {
        return Err(io::Error::last_os_error()).context("sysconf(_SC_PAGESIZE)");
    }
    Ok(rst as usize)
}
