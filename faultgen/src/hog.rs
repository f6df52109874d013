use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use anyhow::{ensure, Context, Result};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) chunk: usize,
    pub(crate) stride: usize,
    pub(crate) interval: Duration,
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Stats {
    pub(crate) chunks: usize,
    pub(crate) touches: usize,
}

// hog keeps allocating chunks and never releases them until running is cleared,
// once resident memory exceeds what is available the kernel starts to swap and faults become major.
pub(crate) fn hog(cfg: &Config, running: &AtomicBool) -> Result<Stats> {
    ensure!(cfg.stride > 0, "stride must be positive");
    let mut stats = Stats::default();
    let mut retained: Vec<Vec<u8>> = vec![];
    while running.load(Ordering::Relaxed) {
        if cfg.limit.is_some_and(|limit| stats.chunks >= limit) {
            break;
        }
        let mut chunk = Vec::new();
        chunk
            .try_reserve_exact(cfg.chunk)
            .with_context(|| format!("allocating chunk {} of {} bytes", stats.chunks, cfg.chunk))?;
        // writing into spare capacity keeps untouched pages unbacked
        let spare = chunk.spare_capacity_mut();
        let mut touches = 0;
        for offset in (0..cfg.chunk).step_by(cfg.stride) {
            spare[offset].write(0);
            touches += 1;
        }
        retained.push(chunk);
        stats.chunks += 1;
        stats.touches += touches;
        debug!("chunk {} touched at {} offsets", stats.chunks, touches);
        thread::sleep(cfg.interval);
    }
    info!(
        "releasing {} chunks, {} bytes in total",
        retained.len(),
        retained.iter().map(|c| c.capacity()).sum::<usize>()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(limit: Option<usize>) -> Config {
        Config {
            chunk: 4 * 4096,
            stride: 4096,
            interval: Duration::ZERO,
            limit,
        }
    }

    #[test]
    fn test_stops_at_limit() {
        let running = AtomicBool::new(true);
        let stats = hog(&config(Some(3)), &running).expect("hog");
        assert_eq!(stats, Stats { chunks: 3, touches: 12 });
    }

    #[test]
    fn test_interrupted_before_start() {
        let running = AtomicBool::new(false);
        let stats = hog(&config(None), &running).expect("hog");
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn test_partial_stride() {
        let running = AtomicBool::new(true);
        let cfg = Config {
            chunk: 10,
            stride: 4,
            ..config(Some(1))
        };
        // offsets 0, 4, 8
        assert_eq!(hog(&cfg, &running).expect("hog").touches, 3);
    }

    #[test]
    fn test_zero_stride_rejected() {
        let running = AtomicBool::new(true);
        let cfg = Config {
            stride: 0,
            ..config(Some(1))
        };
        assert!(hog(&cfg, &running).is_err());
    }
}
