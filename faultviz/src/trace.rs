// subset of the events specified in chrome trace viewer documentation
// https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU/preview#heading=h.yr4qxyxotyw

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{
    ser::{SerializeSeq, SerializeStruct},
    Serialize, Serializer,
};
use serde_json::Serializer as JsonSerializer;

use crate::record::FaultLog;

const FAULT_EVENT: &str = "page_fault";
const ADDRESS_COUNTER: &str = "address";

#[derive(Debug, Serialize)]
enum TimeUnit {
    #[serde(rename = "ns")]
    Nanoseconds,
}

#[derive(Debug, Serialize)]
enum InstantPhase {
    #[serde(rename = "i")]
    Instant,
}

#[derive(Debug, Serialize)]
enum InstantScope {
    #[serde(rename = "p")]
    Process,
}

#[derive(Debug, Serialize)]
enum CounterPhase {
    C,
}

#[derive(Debug, Serialize)]
struct InstantArgs {
    address: String,
}

#[derive(Debug, Serialize)]
struct Instant {
    name: &'static str,
    #[serde(rename = "ph")]
    phase: InstantPhase,
    // microseconds
    #[serde(rename = "ts")]
    timestamp: f64,
    pid: i32,
    #[serde(rename = "s")]
    scope: InstantScope,
    args: InstantArgs,
}

#[derive(Debug, Serialize)]
struct CounterArgs {
    address: u64,
}

#[derive(Debug, Serialize)]
struct Counter {
    name: &'static str,
    #[serde(rename = "ph")]
    phase: CounterPhase,
    #[serde(rename = "ts")]
    timestamp: f64,
    pid: i32,
    args: CounterArgs,
}

/// Writes faults as chrome trace json. Every fault is an instant event,
/// additionally addresses are exported as a counter so that trace viewers draw them over time.
pub(crate) fn export(log: &FaultLog, out: &Path) -> Result<()> {
    let output = File::create(out).with_context(|| format!("creating {}", out.display()))?;
    let mut serializer = JsonSerializer::new(BufWriter::new(output));
    {
        let mut object = Serializer::serialize_struct(&mut serializer, "Object", 2)?;
        object.serialize_field("traceEvents", &Events(log))?;
        object.serialize_field("displayTimeUnit", &TimeUnit::Nanoseconds)?;
        SerializeStruct::end(object)?;
    }
    serializer.into_inner().flush()?;
    Ok(())
}

#[derive(Debug)]
struct Events<'a>(&'a FaultLog);

impl Serialize for Events<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let pid = self.0.process_id();
        let mut seq = serializer.serialize_seq(Some(self.0.len() * 2))?;
        for record in self.0.records() {
            let timestamp = record.timestamp as f64 / 1000.0;
            seq.serialize_element(&Instant {
                name: FAULT_EVENT,
                phase: InstantPhase::Instant,
                timestamp,
                pid,
                scope: InstantScope::Process,
                args: InstantArgs {
                    address: format!("{:#x}", record.address),
                },
            })?;
            seq.serialize_element(&Counter {
                name: ADDRESS_COUNTER,
                phase: CounterPhase::C,
                timestamp,
                pid,
                args: CounterArgs {
                    address: record.address,
                },
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::Value;
    use tempfile::tempdir;

    use super::*;
    use crate::record::FaultRecord;

    #[test]
    fn test_export() {
        let mut log = FaultLog::default();
        for (address, timestamp) in [(0x10, 1500), (0x20, 2500)] {
            log.push(FaultRecord {
                process_id: 77,
                address,
                timestamp,
            });
        }
        let dir = tempdir().expect("tempdir");
        let out = dir.path().join("trace.json");
        export(&log, &out).expect("export");

        let trace: Value = serde_json::from_str(&fs::read_to_string(&out).expect("read")).expect("json");
        assert_eq!(trace["displayTimeUnit"], "ns");
        let events = trace["traceEvents"].as_array().expect("events");
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["name"], FAULT_EVENT);
        assert_eq!(events[0]["ph"], "i");
        assert_eq!(events[0]["s"], "p");
        assert_eq!(events[0]["pid"], 77);
        assert_eq!(events[0]["ts"], 1.5);
        assert_eq!(events[0]["args"]["address"], "0x10");
        assert_eq!(events[3]["name"], ADDRESS_COUNTER);
        assert_eq!(events[3]["ph"], "C");
        assert_eq!(events[3]["ts"], 2.5);
        assert_eq!(events[3]["args"]["address"], 0x20);
    }

    #[test]
    fn test_export_empty_log() {
        let dir = tempdir().expect("tempdir");
        let out = dir.path().join("trace.json");
        export(&FaultLog::default(), &out).expect("export");
        let trace: Value = serde_json::from_str(&fs::read_to_string(&out).expect("read")).expect("json");
        assert_eq!(trace["traceEvents"].as_array().map(|events| events.len()), Some(0));
    }
}
