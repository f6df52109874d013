use std::fmt::{self, Display, Formatter};

use crate::record::FaultLog;

pub(crate) const ADDRESS_BUCKETS: usize = 32;
pub(crate) const TIME_BUCKETS: usize = 143;

const LABEL_WIDTH: usize = 10;
const BANNER: &str = "######################";

// buckets are max, max/2, max/3, ... so the resolution is finest close to zero
pub(crate) fn buckets(max: u64, count: usize) -> Vec<u64> {
    (1..=count as u64).map(|divisor| max / divisor).collect()
}

/// Index of the bucket closest to value. The first bucket wins on ties.
pub(crate) fn nearest(buckets: &[u64], value: u64) -> usize {
    buckets
        .iter()
        .enumerate()
        .min_by_key(|(_, bucket)| bucket.abs_diff(value))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Coarse density map of faults, addresses on rows and time on columns.
#[derive(Debug)]
pub(crate) struct Grid {
    process_id: i32,
    address_max: u64,
    address_buckets: Vec<u64>,
    time_buckets: Vec<u64>,
    cells: Vec<[bool; TIME_BUCKETS]>,
}

impl Grid {
    pub(crate) fn new(log: &FaultLog) -> Option<Self> {
        let address_max = log.addresses().max()?;
        let time_max = log.timestamps().max()?;
        let address_buckets = buckets(address_max, ADDRESS_BUCKETS);
        let time_buckets = buckets(time_max, TIME_BUCKETS);
        let mut cells = vec![[false; TIME_BUCKETS]; ADDRESS_BUCKETS];
        for record in log.records() {
            let row = nearest(&address_buckets, record.address);
            let col = nearest(&time_buckets, record.timestamp);
            cells[row][col] = true;
        }
        Some(Grid {
            process_id: log.process_id(),
            address_max,
            address_buckets,
            time_buckets,
            cells,
        })
    }

    pub(crate) fn marked(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| **cell).count()
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "{} Plot for Process Id {} {}", BANNER, self.process_id, BANNER)?;
        writeln!(f, "\n")?;
        for (label, row) in self.address_buckets.iter().zip(&self.cells) {
            let row = row.iter().map(|marked| if *marked { '*' } else { ' ' }).collect::<String>();
            writeln!(f, "{:>width$} | {}", label, row, width = LABEL_WIDTH)?;
        }
        writeln!(f, "{:width$} {}", "", "-".repeat(TIME_BUCKETS), width = LABEL_WIDTH)?;

        // time labels are written vertically, one digit per line, every other column is a tick.
        // number of lines follows the widest address label.
        let digits = self
            .time_buckets
            .iter()
            .map(|bucket| bucket.to_string().into_bytes())
            .collect::<Vec<_>>();
        let lines = self.address_max.to_string().len() + 1;
        for line in 0..lines {
            let labels = digits
                .iter()
                .enumerate()
                .map(|(col, digits)| {
                    if col % 2 == 0 {
                        '|'
                    } else {
                        digits.get(line).map(|d| *d as char).unwrap_or(' ')
                    }
                })
                .collect::<String>();
            writeln!(f, "{:width$} {}", "", labels, width = LABEL_WIDTH)?;
        }
        Ok(())
    }
}
