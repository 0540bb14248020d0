use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    account::{Account, AccountError, AccountId},
    command::{AccountCommand, AccountCommandError, CreateAccountCommand, PinPolicy},
    config::{LedgerConfig, SeedAccount},
    journal::{JournalError, TransactionKind, TransactionLog, TransactionRecord},
    table::{AccountTable, DuplicateAccount, TableError},
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Account `{0}` not found")]
    AccountNotFound(AccountId),
    #[error(transparent)]
    DuplicateAccount(#[from] DuplicateAccount),
    #[error(transparent)]
    CommandErr(#[from] AccountCommandError),
    #[error(transparent)]
    AccountErr(#[from] AccountError),
    #[error(transparent)]
    TableErr(#[from] TableError),
    #[error(transparent)]
    JournalErr(#[from] JournalError),
}

/// Result of an accepted mutation.
///
/// The mutation stays applied even when writing it out failed; the flags tell
/// the caller whether it also reached disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub table_persisted: bool,
    pub log_appended: bool,
}

impl Receipt {
    pub fn is_durable(&self) -> bool {
        self.table_persisted && self.log_appended
    }
}

/// Owns the account table and coordinates every change to it.
///
/// A single lock serializes all mutations across all accounts. Each accepted
/// mutation is applied in memory, then the whole table is persisted, then one
/// record is appended to the account's transaction log.
pub struct Ledger {
    table_path: PathBuf,
    journal: TransactionLog,
    pin_policy: PinPolicy,
    table: Mutex<AccountTable>,
}

impl Ledger {
    /// Loads the account table from the configured data directory, seeding it
    /// when no table file exists yet.
    pub fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let table_path = config.table_path();
        let table = match AccountTable::load(&table_path)? {
            Some(table) if table.is_empty() => {
                warn!(path = %table_path.display(), "Account table exists but holds no accounts");
                table
            }
            Some(table) => {
                info!(path = %table_path.display(), accounts = table.len(), "Loaded account table");
                table
            }
            None => bootstrap(&table_path, config.seed.as_ref()),
        };
        Ok(Self {
            table_path,
            journal: TransactionLog::with_prefix(&config.data_dir, &config.log_prefix),
            pin_policy: config.pin_policy,
            table: Mutex::new(table),
        })
    }

    /// Snapshot of the account, if it exists.
    pub fn find(&self, account_id: &str) -> Option<Account> {
        self.lock().find(account_id).cloned()
    }

    /// Unknown accounts never authenticate.
    pub fn authenticate(&self, account_id: &str, pin: &str) -> bool {
        self.lock()
            .find(account_id)
            .is_some_and(|acc| acc.pin_matches(pin))
    }

    pub fn create_account(
        &self,
        account_id: &str,
        name: &str,
        pin: &str,
        initial_balance: Decimal,
    ) -> Result<Receipt, LedgerError> {
        let command =
            CreateAccountCommand::parse(account_id, name, pin, initial_balance, self.pin_policy)?;
        let mut table = self.lock();
        let account = table.create(Account::from(command))?;
        let account_id = account.id().to_owned();
        let balance = account.balance();

        let table_persisted = self.persist(&table);
        let log_appended = if balance > Decimal::ZERO {
            let record = TransactionRecord::new(
                now(),
                TransactionKind::Deposit,
                balance,
                balance,
                "Initial deposit",
            );
            self.append(&account_id, &record)
        } else {
            true
        };
        info!(%account_id, %balance, "Created account");
        Ok(Receipt {
            account_id,
            balance,
            table_persisted,
            log_appended,
        })
    }

    pub fn deposit(&self, account_id: &str, amount: Decimal) -> Result<Receipt, LedgerError> {
        self.execute(account_id, AccountCommand::deposit(amount)?)
    }

    pub fn withdraw(&self, account_id: &str, amount: Decimal) -> Result<Receipt, LedgerError> {
        self.execute(account_id, AccountCommand::withdraw(amount)?)
    }

    pub fn change_pin(&self, account_id: &str, new_pin: &str) -> Result<Receipt, LedgerError> {
        self.execute(account_id, AccountCommand::change_pin(new_pin, self.pin_policy)?)
    }

    /// Raw log lines of the account, newest first.
    pub fn recent_transactions(
        &self,
        account_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, LedgerError> {
        let table = self.lock();
        if table.find(account_id).is_none() {
            return Err(LedgerError::AccountNotFound(account_id.to_owned()));
        }
        Ok(self.journal.read_recent(account_id, limit)?)
    }

    pub fn recent_records(
        &self,
        account_id: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let table = self.lock();
        if table.find(account_id).is_none() {
            return Err(LedgerError::AccountNotFound(account_id.to_owned()));
        }
        Ok(self.journal.read_recent_records(account_id, limit)?)
    }

    fn execute(&self, account_id: &str, command: AccountCommand) -> Result<Receipt, LedgerError> {
        let mut table = self.lock();
        let account = table
            .find_mut(account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_owned()))?;
        let event = account.handle(command)?;
        account.apply(&event);
        let balance = account.balance();

        let table_persisted = self.persist(&table);
        let record = TransactionRecord::new(
            now(),
            event.kind(),
            event.amount(),
            balance,
            event.note(),
        );
        let log_appended = self.append(account_id, &record);
        info!(account_id, kind = %record.kind, %balance, "Applied transaction");
        Ok(Receipt {
            account_id: account_id.to_owned(),
            balance,
            table_persisted,
            log_appended,
        })
    }

    /// Persistence failures are logged and otherwise ignored: the in-memory table
    /// stays authoritative.
    fn persist(&self, table: &AccountTable) -> bool {
        match table.persist(&self.table_path) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "Failed to persist accounts");
                false
            }
        }
    }

    fn append(&self, account_id: &str, record: &TransactionRecord) -> bool {
        match self.journal.append(account_id, record) {
            Ok(()) => true,
            Err(err) => {
                error!(account_id, error = %err, "Failed to write transaction log");
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, AccountTable> {
        // every mutation leaves the table consistent before anything can panic
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn bootstrap(table_path: &Path, seed: Option<&SeedAccount>) -> AccountTable {
    let mut table = AccountTable::default();
    if let Some(seed) = seed {
        info!(account_id = %seed.id, "No account table found, creating demo account");
        // the table is empty, so this cannot conflict
        let _ = table.create(Account::from(seed));
    }
    if let Err(err) = table.persist(table_path) {
        error!(error = %err, "Failed to persist seeded account table");
    }
    table
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
