use std::{
    io::{BufRead, Write},
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use tracing::debug;

// probe writes this line once its buffer is drained
pub(crate) const EXIT_CODE: &str = "EXIT_CODE";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Completion {
    ExitCode,
    EndOfInput,
    Interrupted,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Collected {
    pub(crate) lines: usize,
    pub(crate) completion: Completion,
}

// collect copies lines from the probe into the log, every line is prefixed with its index.
// lines are echoed to stdout, the probe is polled no faster than once per interval.
pub(crate) fn collect(
    source: impl BufRead,
    log: &mut impl Write,
    interval: Duration,
    running: &AtomicBool,
) -> Result<Collected> {
    let mut lines = 0;
    for line in source.lines() {
        if !running.load(Ordering::Relaxed) {
            return Ok(Collected {
                lines,
                completion: Completion::Interrupted,
            });
        }
        let line = line.context("reading from probe")?;
        if line == EXIT_CODE {
            return Ok(Collected {
                lines,
                completion: Completion::ExitCode,
            });
        }
        let entry = format!("{:4}:: {}", lines, line);
        println!("{}", entry);
        writeln!(log, "{}", entry).context("writing to log")?;
        lines += 1;
        debug!("sleeping for {:?}", interval);
        thread::sleep(interval);
    }
    Ok(Collected {
        lines,
        completion: Completion::EndOfInput,
    })
}
