use std::{
    collections::{BTreeMap, btree_map::Entry},
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    account::{Account, AccountId},
    command::is_safe_account_id,
};

const FIELD_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to read account table `{}`: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write account table `{}`: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Why a single table line was rejected.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("line is not valid UTF-8")]
    NotUtf8,
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("account id is empty")]
    EmptyId,
    #[error("account id `{0}` is not usable as a log file name")]
    UnsafeId(String),
    #[error("invalid balance `{value}`: {source}")]
    Balance {
        value: String,
        source: rust_decimal::Error,
    },
    #[error("balance {0} is negative")]
    NegativeBalance(Decimal),
}

#[derive(Debug, Error)]
#[error("Account `{0}` already exists")]
pub struct DuplicateAccount(pub AccountId);

#[derive(Serialize)]
struct AccountRow<'a> {
    id: &'a str,
    name: &'a str,
    pin: &'a str,
    balance: String,
}

#[derive(Deserialize)]
struct RawAccountRow {
    id: String,
    name: String,
    pin: String,
    balance: String,
}

/// In-memory account table, mirrored to a flat CSV file.
///
/// One record per line: `id,name,pin,balance`. Balances are always written with
/// two decimals. Accounts are kept sorted by id so the file is stable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccountTable {
    accounts: BTreeMap<AccountId, Account>,
}

impl AccountTable {
    /// Loads the table from `path`. Returns `None` when the file doesn't exist.
    pub fn load(path: &Path) -> Result<Option<Self>, TableError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(TableError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        Self::read_from(BufReader::new(file))
            .map(Some)
            .map_err(|source| TableError::Read {
                path: path.to_owned(),
                source,
            })
    }

    /// Decodes one account per line. Lines that fail to decode are skipped with a
    /// warning and never affect their neighbours.
    pub fn read_from<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut table = Self::default();
        for (index, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            let line_no = index + 1;
            let account = match decode_line(&line) {
                Ok(Some(account)) => account,
                Ok(None) => continue,
                Err(err) => {
                    warn!(line = line_no, error = %err, "Skipping invalid account line");
                    continue;
                }
            };
            if let Some(previous) = table.accounts.insert(account.id().to_owned(), account) {
                warn!(
                    line = line_no,
                    id = previous.id(),
                    "Duplicate account id, keeping the later line"
                );
            }
        }
        Ok(table)
    }

    pub fn write_to<W: Write>(&self, output: W) -> io::Result<()> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(output);
        for acc in self.accounts.values() {
            let row = AccountRow {
                id: acc.id(),
                name: acc.name(),
                pin: acc.pin(),
                balance: format!("{:.2}", acc.balance()),
            };
            writer.serialize(row)?;
        }
        writer.flush()
    }

    /// Replaces the file at `path` with the current table.
    ///
    /// The table is written to a temporary file next to `path`, synced, and then
    /// renamed over it, so readers observe either the old or the new table.
    pub fn persist(&self, path: &Path) -> Result<(), TableError> {
        let write_err = |source: io::Error| TableError::Write {
            path: path.to_owned(),
            source,
        };
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        self.write_to(tmp.as_file_mut()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        // a failed rename drops the temp file, which removes it
        tmp.persist(path).map_err(|err| write_err(err.error))?;
        debug!(path = %path.display(), accounts = self.len(), "Persisted account table");
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub(crate) fn find_mut(&mut self, id: &str) -> Option<&mut Account> {
        self.accounts.get_mut(id)
    }

    pub fn create(&mut self, account: Account) -> Result<&Account, DuplicateAccount> {
        match self.accounts.entry(account.id().to_owned()) {
            Entry::Occupied(entry) => Err(DuplicateAccount(entry.key().clone())),
            Entry::Vacant(entry) => Ok(&*entry.insert(account)),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Returns `Ok(None)` for blank lines.
fn decode_line(line: &[u8]) -> Result<Option<Account>, RecordError> {
    let line = std::str::from_utf8(line).map_err(|_| RecordError::NotUtf8)?;
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return Ok(None);
    }
    // names and pins are kept byte for byte, whitespace included
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(None);
    }
    if record.len() != FIELD_COUNT {
        return Err(RecordError::FieldCount(record.len()));
    }
    let row: RawAccountRow = record.deserialize(None)?;
    let id = row.id.trim();
    if id.is_empty() {
        return Err(RecordError::EmptyId);
    }
    if !is_safe_account_id(id) {
        return Err(RecordError::UnsafeId(id.to_owned()));
    }
    let balance = Decimal::from_str(row.balance.trim()).map_err(|source| RecordError::Balance {
        value: row.balance.clone(),
        source,
    })?;
    if balance < Decimal::ZERO {
        return Err(RecordError::NegativeBalance(balance));
    }
    Ok(Some(Account::new(id, row.name, row.pin, balance)))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    use super::*;

    fn sample_table() -> AccountTable {
        let mut table = AccountTable::default();
        table
            .create(Account::new("1001", "Demo User", "1234", dec!(1000)))
            .unwrap();
        table
            .create(Account::new("1002", "Doe, \"Jay\"", "0000", dec!(0.5)))
            .unwrap();
        table
            .create(Account::new("1003", "Plain", "pass,word", dec!(12.34)))
            .unwrap();
        table
    }

    fn encode(table: &AccountTable) -> String {
        let mut output = Vec::new();
        table.write_to(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn encoding_format() {
        assert_eq!(
            encode(&sample_table()),
            "1001,Demo User,1234,1000.00\n\
             1002,\"Doe, \"\"Jay\"\"\",0000,0.50\n\
             1003,Plain,\"pass,word\",12.34\n"
        );
    }

    #[test]
    fn encode_then_decode_reproduces_accounts() {
        let table = sample_table();
        let decoded = AccountTable::read_from(encode(&table).as_bytes()).unwrap();
        assert_eq!(decoded, table);
        let acc = decoded.find("1002").unwrap();
        assert_eq!(acc.name(), "Doe, \"Jay\"");
        assert_eq!(acc.balance(), dec!(0.50));
    }

    #[test]
    fn surrounding_whitespace_in_pin_and_name_survives() {
        let mut table = AccountTable::default();
        table.create(Account::new("7", " Spaced Name ", "1234 ", dec!(1))).unwrap();
        table.create(Account::new("8", "x", " 00 00", dec!(2))).unwrap();
        let decoded = AccountTable::read_from(encode(&table).as_bytes()).unwrap();
        assert_eq!(decoded, table);
        assert!(decoded.find("7").unwrap().pin_matches("1234 "));
        assert!(!decoded.find("7").unwrap().pin_matches("1234"));
        assert_eq!(decoded.find("8").unwrap().pin(), " 00 00");
    }

    #[test]
    fn padded_id_and_balance_are_accepted() {
        let table = AccountTable::read_from(" 9 ,Nine,9999, 9.50 \n".as_bytes()).unwrap();
        assert_eq!(table.find("9").unwrap().balance(), dec!(9.50));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let input = "1001,Demo User,1234,1000.00\n\
                     garbage line\n\
                     1002,\"Unclosed,0000,1.00\n\
                     1003,Bad Balance,0000,abc\n\
                     1004,Negative,0000,-1.00\n\
                     ,No Id,0000,1.00\n\
                     ../1006,Escape,0000,1.00\n\
                     \n\
                     1005,Last,9999,5.00\r\n";
        let table = AccountTable::read_from(input.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.find("1001").is_some());
        assert_eq!(table.find("1005").unwrap().balance(), dec!(5));
    }

    #[test]
    fn one_malformed_line_among_many() {
        let mut input = String::new();
        for id in 0..10 {
            input.push_str(&format!("{id},Name {id},1234,{id}.00\n"));
            if id == 4 {
                input.push_str("4a,broken\n");
            }
        }
        let table = AccountTable::read_from(input.as_bytes()).unwrap();
        assert_eq!(table.len(), 10);
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let mut input = b"1,A,1111,1.00\n".to_vec();
        input.extend_from_slice(b"2,\xff\xfe,1111,1.00\n");
        input.extend_from_slice(b"3,C,1111,3.00\n");
        let table = AccountTable::read_from(input.as_slice()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.find("2").is_none());
    }

    #[test]
    fn later_duplicate_wins() {
        let input = "1,First,1111,1.00\n1,Second,2222,2.00\n";
        let table = AccountTable::read_from(input.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.find("1").unwrap().name(), "Second");
    }

    #[test]
    fn create_reports_conflict() {
        let mut table = sample_table();
        let err = table
            .create(Account::new("1001", "Other", "1111", dec!(1)))
            .unwrap_err();
        assert_eq!(err.0, "1001");
        assert_eq!(table.find("1001").unwrap().name(), "Demo User");
        assert!(table.find("missing").is_none());
    }

    #[test]
    fn load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(
            AccountTable::load(&dir.path().join("accounts.csv"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn persist_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.csv");
        std::fs::write(&path, "stale content\n").unwrap();

        let mut table = sample_table();
        table.persist(&path).unwrap();
        assert_eq!(AccountTable::load(&path).unwrap().unwrap(), table);

        table
            .create(Account::new("2000", "New", "1111", dec!(3)))
            .unwrap();
        table.persist(&path).unwrap();
        assert_eq!(AccountTable::load(&path).unwrap().unwrap().len(), 4);

        // no temporary files left behind
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn persist_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("accounts.csv");
        let err = sample_table().persist(&path).unwrap_err();
        assert!(matches!(err, TableError::Write { .. }));
    }
}
