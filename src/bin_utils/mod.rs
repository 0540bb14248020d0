//! Bootstraps [`crate::ledger::Ledger`] for the command line binary: one request in,
//! plain text out. Lives in the library so integration tests can drive it.

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use rust_decimal::Decimal;

use crate::{account::Account, ledger::Ledger};
use printer::{print_balance, print_history, print_receipt};

pub mod printer;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Subcommand)]
pub enum Request {
    /// Show the current balance
    Balance {
        account: String,
        #[arg(long)]
        pin: String,
    },
    /// Add money to the account
    Deposit {
        account: String,
        amount: Decimal,
        #[arg(long)]
        pin: String,
    },
    /// Take money out of the account
    Withdraw {
        account: String,
        amount: Decimal,
        #[arg(long)]
        pin: String,
    },
    /// Replace the account PIN
    ChangePin {
        account: String,
        new_pin: String,
        #[arg(long)]
        pin: String,
    },
    /// List the most recent transactions, newest first
    History {
        account: String,
        #[arg(long)]
        pin: String,
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// Open a new account
    CreateAccount {
        account: String,
        name: String,
        #[arg(long)]
        pin: String,
        #[arg(long, default_value = "0")]
        initial: Decimal,
    },
}

pub struct Service<'l, 'w, W: 'w> {
    pub ledger: &'l Ledger,
    pub output: &'w mut W,
}

impl<'l, 'w, W> Service<'l, 'w, W>
where
    W: Write + 'w,
{
    pub fn run(self, request: Request) -> Result<()> {
        match request {
            Request::Balance { account, pin } => {
                let acc = self.log_in(&account, &pin)?;
                print_balance(self.output, &acc)
            }
            Request::Deposit {
                account,
                amount,
                pin,
            } => {
                self.log_in(&account, &pin)?;
                let receipt = self.ledger.deposit(&account, amount)?;
                print_receipt(self.output, &format!("Deposited {amount:.2}."), &receipt)
            }
            Request::Withdraw {
                account,
                amount,
                pin,
            } => {
                self.log_in(&account, &pin)?;
                let receipt = self.ledger.withdraw(&account, amount)?;
                print_receipt(self.output, &format!("Withdrew {amount:.2}."), &receipt)
            }
            Request::ChangePin {
                account,
                new_pin,
                pin,
            } => {
                self.log_in(&account, &pin)?;
                let receipt = self.ledger.change_pin(&account, &new_pin)?;
                print_receipt(self.output, "PIN changed.", &receipt)
            }
            Request::History {
                account,
                pin,
                limit,
            } => {
                self.log_in(&account, &pin)?;
                let lines = self.ledger.recent_transactions(&account, limit)?;
                print_history(self.output, &lines)
            }
            Request::CreateAccount {
                account,
                name,
                pin,
                initial,
            } => {
                let receipt = self.ledger.create_account(&account, &name, &pin, initial)?;
                print_receipt(
                    self.output,
                    &format!("Account {} created.", receipt.account_id),
                    &receipt,
                )
            }
        }
    }

    fn log_in(&self, account: &str, pin: &str) -> Result<Account> {
        let acc = self
            .ledger
            .find(account)
            .with_context(|| format!("Account `{account}` not found"))?;
        if !self.ledger.authenticate(account, pin) {
            bail!("Incorrect PIN for account `{account}`");
        }
        Ok(acc)
    }
}
