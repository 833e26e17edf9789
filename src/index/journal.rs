//! Append-only journal of index modifications
//!
//! One record per line: `<crc32 as 8 hex digits> <json>`. The checksum
//! covers the JSON bytes. Any bad line makes replay fail; there is no
//! partial recovery.
//!
//! A failed append is truncated back to the previous length. When even that
//! fails the journal refuses further appends until it is rewritten.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::checksum::compute_checksum;
use super::errors::{IndexError, IndexResult};
use crate::content::ContentEntry;

pub const JOURNAL_FILE: &str = "index.journal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalRecord {
    Add { entries: Vec<ContentEntry> },
    Remove { identifiers: Vec<String> },
    Clear,
}

pub struct Journal {
    path: PathBuf,
    file: File,
    failed: bool,
}

impl Journal {
    /// Opens the journal in `dir`, creating it if needed, and returns the
    /// records already in it.
    pub fn open(dir: &Path) -> IndexResult<(Self, Vec<JournalRecord>)> {
        fs::create_dir_all(dir)?;
        let path = dir.join(JOURNAL_FILE);

        let records = if path.exists() {
            replay(&fs::read_to_string(&path)?)?
        } else {
            Vec::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok((
            Self {
                path,
                file,
                failed: false,
            },
            records,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends and syncs one record
    pub fn append(&mut self, record: &JournalRecord) -> IndexResult<()> {
        if self.failed {
            return Err(IndexError::JournalFailed(self.path.display().to_string()));
        }
        let line = encode(record)?;
        let start = self.file.metadata()?.len();
        if let Err(e) = write_line(&mut self.file, line.as_bytes()) {
            self.rollback(start);
            return Err(e.into());
        }
        Ok(())
    }

    /// Cuts a torn tail off the journal
    fn rollback(&mut self, len: u64) {
        let truncated = self
            .file
            .set_len(len)
            .and_then(|_| self.file.sync_data());
        if truncated.is_err() {
            self.failed = true;
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Replaces the journal with `records` (write to temp, then rename)
    pub fn rewrite(&mut self, records: &[JournalRecord]) -> IndexResult<()> {
        let tmp = self.path.with_extension("journal.tmp");
        {
            let mut out = File::create(&tmp)?;
            for record in records {
                out.write_all(encode(record)?.as_bytes())?;
            }
            out.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        self.file = OpenOptions::new().append(true).open(&self.path)?;
        self.failed = false;
        Ok(())
    }
}

fn write_line(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line)?;
    file.flush()?;
    file.sync_data()
}

fn encode(record: &JournalRecord) -> IndexResult<String> {
    let json = serde_json::to_string(record)?;
    Ok(format!("{:08x} {}\n", compute_checksum(json.as_bytes()), json))
}

fn replay(content: &str) -> IndexResult<Vec<JournalRecord>> {
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        let (checksum, json) = line.split_once(' ').ok_or_else(|| IndexError::MalformedRecord {
            line: line_no,
            reason: "missing checksum separator".to_string(),
        })?;
        let expected = u32::from_str_radix(checksum, 16).map_err(|e| IndexError::MalformedRecord {
            line: line_no,
            reason: format!("bad checksum field: {}", e),
        })?;
        let actual = compute_checksum(json.as_bytes());
        if actual != expected {
            return Err(IndexError::ChecksumMismatch {
                line: line_no,
                expected,
                actual,
            });
        }

        let record = serde_json::from_str(json).map_err(|e| IndexError::MalformedRecord {
            line: line_no,
            reason: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}
