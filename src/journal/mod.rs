use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::warn;

pub use record::{RecordParseError, TIMESTAMP_FORMAT, TransactionKind, TransactionRecord};
pub use reverse_lines::ReverseLines;

mod record;
mod reverse_lines;

pub const DEFAULT_LOG_PREFIX: &str = "tx_";

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Failed to append to transaction log `{}`: {source}", path.display())]
    Append { path: PathBuf, source: io::Error },
    #[error("Failed to read transaction log `{}`: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
}

/// Append-only transaction logs, one file per account.
///
/// Records are never cached in memory: appends go straight to disk and reads
/// scan the file from its end.
#[derive(Debug, Clone)]
pub struct TransactionLog {
    dir: PathBuf,
    prefix: String,
}

impl TransactionLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_prefix(dir, DEFAULT_LOG_PREFIX)
    }

    pub fn with_prefix(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// `<dir>/<prefix><account_id>.log`
    pub fn log_path(&self, account_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}.log", self.prefix, account_id))
    }

    pub fn append(&self, account_id: &str, record: &TransactionRecord) -> Result<(), JournalError> {
        let path = self.log_path(account_id);
        write_line(&path, &record.to_log_line())
            .map_err(|source| JournalError::Append { path, source })
    }

    /// Returns at most `limit` raw log lines, newest first.
    pub fn read_recent(&self, account_id: &str, limit: usize) -> Result<Vec<String>, JournalError> {
        let path = self.log_path(account_id);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let read_err = |source: io::Error| JournalError::Read {
            path: path.clone(),
            source,
        };
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(read_err(err)),
        };
        ReverseLines::new(file)
            .map_err(read_err)?
            .take(limit)
            .collect::<io::Result<Vec<_>>>()
            .map_err(read_err)
    }

    /// Like [`TransactionLog::read_recent`], but parses each line. Lines that don't
    /// parse are skipped with a warning, so fewer than `limit` records may come back.
    pub fn read_recent_records(
        &self,
        account_id: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, JournalError> {
        let lines = self.read_recent(account_id, limit)?;
        Ok(lines
            .iter()
            .filter_map(|line| match line.parse() {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(account_id, error = %err, "Skipping unreadable transaction log line");
                    None
                }
            })
            .collect())
    }
}

fn write_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    // one write call per record keeps appends from interleaving
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    file.write_all(buf.as_bytes())?;
    file.flush()
}
