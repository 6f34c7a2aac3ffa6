//! Reading branch traces from text files.
//!
//! Each line of a trace holds a hexadecimal program counter and an
//! outcome letter, e.g. `4000f1 t`. Outcomes are `t` (taken) and `n`
//! (not taken).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::Pc;

/// A single branch execution parsed from a trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    /// The program counter value for this branch
    pub pc: Pc,

    /// The outcome evaluated for this branch
    pub taken: bool,
}

/// A branch trace parsed from a text file.
pub struct TextTrace {
    pub records: Vec<TraceRecord>,
    pub name: String,
}
impl TextTrace {
    /// Create a [`TextTrace`] from a file. Malformed lines are fatal.
    pub fn from_file(path: &str) -> Self {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let file = File::open(path)
            .unwrap_or_else(|e| panic!("failed to open trace {}: {}", path, e));

        let mut records = Vec::new();
        for (num, line) in BufReader::new(file).lines().enumerate() {
            let line = line
                .unwrap_or_else(|e| panic!("failed to read trace {}: {}", path, e));
            if line.trim().is_empty() {
                continue;
            }
            let record = Self::parse_line(&line)
                .unwrap_or_else(|| panic!("{}:{}: malformed trace line", path, num + 1));
            records.push(record);
        }
        Self { records, name }
    }

    /// Parse one `"<hex_pc> <t|n>"` line.
    pub fn parse_line(line: &str) -> Option<TraceRecord> {
        let mut fields = line.split_whitespace();
        let pc = Pc::from_str_radix(fields.next()?, 16).ok()?;
        let taken = match fields.next()? {
            "t" => true,
            "n" => false,
            _ => return None,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(TraceRecord { pc, taken })
    }

    /// Return the number of records.
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Return a slice of records.
    pub fn as_slice(&self) -> &[TraceRecord] {
        &self.records
    }
}
