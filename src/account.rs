use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    command::{AccountCommand, CreateAccountCommand},
    journal::TransactionKind,
};

pub type AccountId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    Deposited { amount: Decimal },
    Withdrawn { amount: Decimal },
    PinChanged { pin: String },
}

impl AccountEvent {
    pub fn kind(&self) -> TransactionKind {
        match self {
            AccountEvent::Deposited { .. } => TransactionKind::Deposit,
            AccountEvent::Withdrawn { .. } => TransactionKind::Withdraw,
            AccountEvent::PinChanged { .. } => TransactionKind::PinChange,
        }
    }

    /// Amount written to the transaction log, zero for credential changes.
    pub fn amount(&self) -> Decimal {
        match self {
            AccountEvent::Deposited { amount } | AccountEvent::Withdrawn { amount } => *amount,
            AccountEvent::PinChanged { .. } => Decimal::ZERO,
        }
    }

    pub fn note(&self) -> &'static str {
        match self {
            AccountEvent::Deposited { .. } => "User deposit",
            AccountEvent::Withdrawn { .. } => "User withdrawal",
            AccountEvent::PinChanged { .. } => "User changed PIN",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Insufficient funds: balance is {balance:.2}, requested {requested:.2}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },
    #[error("Deposit of {amount:.2} would overflow the balance of {balance:.2}")]
    BalanceOverflow { balance: Decimal, amount: Decimal },
}

/// A single ledger account.
///
/// The PIN is kept and compared in clear text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    name: String,
    pin: String,
    balance: Decimal,
}

impl Account {
    pub fn new(
        id: impl Into<AccountId>,
        name: impl Into<String>,
        pin: impl Into<String>,
        balance: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pin: pin.into(),
            balance,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn pin_matches(&self, supplied: &str) -> bool {
        self.pin == supplied
    }

    pub fn apply(&mut self, event: &AccountEvent) {
        match event {
            AccountEvent::Deposited { amount } => {
                self.balance += *amount;
            }
            AccountEvent::Withdrawn { amount } => {
                self.balance -= *amount;
            }
            AccountEvent::PinChanged { pin } => {
                self.pin.clone_from(pin);
            }
        }
    }

    /// Decides which event a command produces. The account itself is not touched,
    /// the caller applies the event once it accepts it.
    pub fn handle(&self, command: AccountCommand) -> Result<AccountEvent, AccountError> {
        match command {
            AccountCommand::Deposit { amount } => match self.balance.checked_add(amount) {
                Some(_) => Ok(AccountEvent::Deposited { amount }),
                None => Err(AccountError::BalanceOverflow {
                    balance: self.balance,
                    amount,
                }),
            },
            AccountCommand::Withdraw { amount } => {
                if amount <= self.balance {
                    Ok(AccountEvent::Withdrawn { amount })
                } else {
                    Err(AccountError::InsufficientFunds {
                        balance: self.balance,
                        requested: amount,
                    })
                }
            }
            AccountCommand::ChangePin { new_pin } => Ok(AccountEvent::PinChanged { pin: new_pin }),
        }
    }
}

impl From<CreateAccountCommand> for Account {
    fn from(command: CreateAccountCommand) -> Self {
        Account::new(
            command.id,
            command.name,
            command.pin,
            command.initial_balance,
        )
    }
}
