use std::{
    io::{self, BufRead},
    num::ParseIntError,
};

use tracing::{debug, warn};

const ADDRESS_MARKER: &str = "Address";
const TIME_MARKER: &str = "Time";

// fields are located by their position from the end of the line, for example:
//    0:: PID =     1234 Page Fault at Address 0x7ffc1000 at Time 1234567
// time is the last field, address is the 4th and pid is the 9th from the end.
const TIME_POSITION: usize = 1;
const ADDRESS_POSITION: usize = 4;
const PID_POSITION: usize = 9;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub(crate) enum ParseError {
    #[error("line has {0} fields, expected at least 9")]
    TooShort(usize),
    #[error("invalid {field} {value:?}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid address {value:?}")]
    InvalidAddress {
        value: String,
        #[source]
        source: LiteralError,
    },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub(crate) enum LiteralError {
    #[error("leading zeros in decimal literal")]
    LeadingZeros,
    #[error("misplaced digit separator")]
    Separator,
    #[error(transparent)]
    Digits(#[from] ParseIntError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FaultRecord {
    pub(crate) process_id: i32,
    pub(crate) address: u64,
    // nanoseconds
    pub(crate) timestamp: u64,
}

/// Parses a single log line.
///
/// Returns `None` for lines that are not fault events, that is lines that don't have both
/// `Address` and `Time` among space separated fields.
pub(crate) fn parse_line(line: &str) -> Option<Result<FaultRecord, ParseError>> {
    // splitting on every space keeps empty fields produced by padded numbers,
    // positions from the end are stable either way
    let fields = line.split(' ').collect::<Vec<_>>();
    if !(fields.contains(&ADDRESS_MARKER) && fields.contains(&TIME_MARKER)) {
        return None;
    }
    Some(parse_fields(&fields))
}

fn parse_fields(fields: &[&str]) -> Result<FaultRecord, ParseError> {
    let from_end = |position: usize| {
        fields
            .len()
            .checked_sub(position)
            .map(|i| fields[i])
            .ok_or(ParseError::TooShort(fields.len()))
    };
    let time = from_end(TIME_POSITION)?.trim_end_matches(['\n', '\r']);
    let address = from_end(ADDRESS_POSITION)?;
    let pid = from_end(PID_POSITION)?;
    Ok(FaultRecord {
        process_id: pid.parse().map_err(|source| ParseError::InvalidNumber {
            field: "pid",
            value: pid.to_string(),
            source,
        })?,
        address: parse_int_literal(address).map_err(|source| ParseError::InvalidAddress {
            value: address.to_string(),
            source,
        })?,
        timestamp: time.parse().map_err(|source| ParseError::InvalidNumber {
            field: "time",
            value: time.to_string(),
            source,
        })?,
    })
}

/// Parses an integer literal with the same rules as python `int(value, 0)`: radix is selected by
/// an optional `0x`, `0o` or `0b` prefix, a single `_` may separate digits, and decimal literals
/// can't have leading zeros.
pub(crate) fn parse_int_literal(value: &str) -> Result<u64, LiteralError> {
    let (digits, radix) = match value.get(..2) {
        Some("0x" | "0X") => (&value[2..], 16),
        Some("0o" | "0O") => (&value[2..], 8),
        Some("0b" | "0B") => (&value[2..], 2),
        _ => (value, 10),
    };
    // a separator is also allowed right after the prefix
    let digits = if radix == 10 {
        digits
    } else {
        digits.strip_prefix('_').unwrap_or(digits)
    };
    if digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(LiteralError::Separator);
    }
    let digits = digits.replace('_', "");
    if radix == 10 && digits.len() > 1 && digits.starts_with('0') && digits.bytes().any(|b| b != b'0') {
        return Err(LiteralError::LeadingZeros);
    }
    Ok(u64::from_str_radix(&digits, radix)?)
}

/// Fault events recorded for a single process.
#[derive(Debug, Default)]
pub(crate) struct FaultLog {
    process_id: i32,
    records: Vec<FaultRecord>,
}

impl FaultLog {
    pub(crate) fn parse(reader: impl BufRead) -> io::Result<Self> {
        let mut log = FaultLog::default();
        for (i, line) in reader.split(b'\n').enumerate() {
            let line = match String::from_utf8(line?) {
                Ok(line) => line,
                Err(err) => {
                    warn!("skipping line {}: {}", i + 1, err.utf8_error());
                    continue;
                }
            };
            match parse_line(&line) {
                Some(Ok(record)) => log.push(record),
                Some(Err(err)) => warn!("skipping line {}: {}", i + 1, err),
                None => debug!("line {} is not a fault event", i + 1),
            }
        }
        Ok(log)
    }

    // the first nonzero pid labels the whole log, files are expected to hold events for one process
    pub(crate) fn push(&mut self, record: FaultRecord) {
        if self.process_id == 0 {
            self.process_id = record.process_id;
        }
        self.records.push(record);
    }

    pub(crate) fn process_id(&self) -> i32 {
        self.process_id
    }

    pub(crate) fn records(&self) -> &[FaultRecord] {
        &self.records
    }

    pub(crate) fn addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.records.iter().map(|r| r.address)
    }

    pub(crate) fn timestamps(&self) -> impl Iterator<Item = u64> + '_ {
        self.records.iter().map(|r| r.timestamp)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}
