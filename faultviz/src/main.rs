use std::{
    fs::File,
    io::BufReader,
    path::PathBuf,
    process,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, info, level_filters::LevelFilter};

use crate::{grid::Grid, plot::ScatterPlot, record::FaultLog};

mod grid;
mod plot;
mod record;
mod trace;

// exit status of usage errors, observed as 255 by the parent
const USAGE_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlotMode {
    /// print the scatter plot to stdout
    Text,
    /// show the scatter plot on the alternate screen until a key is pressed
    Tui,
    /// skip the scatter plot
    None,
}

#[derive(Debug, Parser)]
#[command(author, version = env!("VERSION"), about)]
struct Opt {
    #[clap(index(1), help = "path of the log file with page fault events, as written by faultlog")]
    log: PathBuf,

    #[clap(long, value_enum, default_value_t = PlotMode::Text)]
    plot: PlotMode,

    #[clap(
        long,
        default_value = "154",
        value_parser = clap::value_parser!(u16).range(16..),
        help = "width of the text scatter plot"
    )]
    width: u16,

    #[clap(
        long,
        default_value = "40",
        value_parser = clap::value_parser!(u16).range(8..),
        help = "height of the text scatter plot"
    )]
    height: u16,

    #[clap(long, help = "path to the file where faults will be exported as chrome trace json")]
    export: Option<PathBuf>,
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
    process_file(&opt)
}

fn process_file(opt: &Opt) -> Result<()> {
    if !opt.log.exists() {
        println!("File {} doesn't exist ...", opt.log.display());
        return Ok(());
    }
    let file = File::open(&opt.log).with_context(|| format!("opening {}", opt.log.display()))?;
    let log = FaultLog::parse(BufReader::new(file)).with_context(|| format!("reading {}", opt.log.display()))?;
    info!("parsed {} page faults for process {}", log.len(), log.process_id());

    if let Some(destination) = &opt.export {
        trace::export(&log, destination)?;
        info!("trace is exported to {}", destination.display());
    }

    let (Some(plot), Some(grid)) = (ScatterPlot::new(&log), Grid::new(&log)) else {
        info!("no page faults in {}, nothing to plot", opt.log.display());
        return Ok(());
    };
    match opt.plot {
        PlotMode::Text => println!("{}", plot.render_text(opt.width, opt.height)),
        PlotMode::Tui => plot.show()?,
        PlotMode::None => {}
    }
    debug!("{} cells of the grid are marked", grid.marked());
    print!("{}", grid);
    Ok(())
}
