use std::path::{Path, PathBuf};

use rust_decimal::Decimal;

use crate::{account::Account, command::PinPolicy, journal::DEFAULT_LOG_PREFIX};

pub const DEFAULT_TABLE_FILE: &str = "accounts.csv";

/// Account created when a data directory has no account table yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAccount {
    pub id: String,
    pub name: String,
    pub pin: String,
    pub balance: Decimal,
}

impl Default for SeedAccount {
    fn default() -> Self {
        Self {
            id: "1001".to_string(),
            name: "Demo User".to_string(),
            pin: "1234".to_string(),
            balance: Decimal::new(1000_00, 2),
        }
    }
}

impl From<&SeedAccount> for Account {
    fn from(seed: &SeedAccount) -> Self {
        Account::new(
            seed.id.clone(),
            seed.name.clone(),
            seed.pin.clone(),
            seed.balance,
        )
    }
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Holds the account table and every transaction log.
    pub data_dir: PathBuf,
    pub table_file: String,
    pub log_prefix: String,
    pub pin_policy: PinPolicy,
    /// `None` starts a fresh data directory with an empty table.
    pub seed: Option<SeedAccount>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            table_file: DEFAULT_TABLE_FILE.to_string(),
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            pin_policy: PinPolicy::default(),
            seed: Some(SeedAccount::default()),
        }
    }
}

impl LedgerConfig {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_owned(),
            ..Default::default()
        }
    }

    pub fn with_pin_policy(mut self, pin_policy: PinPolicy) -> Self {
        self.pin_policy = pin_policy;
        self
    }

    pub fn table_path(&self) -> PathBuf {
        self.data_dir.join(&self.table_file)
    }
}
