use rust_decimal::{Decimal, prelude::Zero};
use thiserror::Error;

/// Monetary values never carry more fractional digits than this.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    Deposit,
    Withdraw,
    ChangePin,
    CreateAccount,
}

/// Rule a new PIN has to satisfy before it replaces the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinPolicy {
    /// At least this many characters, of any kind.
    MinLength(usize),
    /// Exactly this many ASCII digits.
    Digits(usize),
}

impl Default for PinPolicy {
    fn default() -> Self {
        PinPolicy::MinLength(4)
    }
}

impl PinPolicy {
    pub fn accepts(&self, pin: &str) -> bool {
        if pin.contains(['\n', '\r']) {
            return false;
        }
        match *self {
            PinPolicy::MinLength(min) => pin.chars().count() >= min,
            PinPolicy::Digits(len) => pin.len() == len && pin.bytes().all(|b| b.is_ascii_digit()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountCommandError {
    #[error("Amount must be positive for {action:?}")]
    NonPositiveAmount { action: CommandAction },
    #[error("Amount must not be negative for {action:?}")]
    NegativeAmount { action: CommandAction },
    #[error("Amount {amount} has more than 2 decimal places")]
    TooPrecise { amount: Decimal },
    #[error("PIN does not satisfy the {policy:?} policy")]
    InvalidPin { policy: PinPolicy },
    #[error("Account id must not be empty")]
    EmptyAccountId,
    #[error("Account id `{id}` must not contain path separators, `..` or control characters")]
    InvalidAccountId { id: String },
    #[error("Account name must be a single line")]
    MultilineName,
}

/// Validated request to mutate one existing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCommand {
    Deposit { amount: Decimal },
    Withdraw { amount: Decimal },
    ChangePin { new_pin: String },
}

impl AccountCommand {
    pub fn deposit(amount: Decimal) -> Result<Self, AccountCommandError> {
        let amount = parse_positive_amount(amount, CommandAction::Deposit)?;
        Ok(Self::Deposit { amount })
    }

    pub fn withdraw(amount: Decimal) -> Result<Self, AccountCommandError> {
        let amount = parse_positive_amount(amount, CommandAction::Withdraw)?;
        Ok(Self::Withdraw { amount })
    }

    pub fn change_pin(new_pin: &str, policy: PinPolicy) -> Result<Self, AccountCommandError> {
        if !policy.accepts(new_pin) {
            return Err(AccountCommandError::InvalidPin { policy });
        }
        Ok(Self::ChangePin {
            new_pin: new_pin.to_owned(),
        })
    }
}

/// Validated request to open a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccountCommand {
    pub id: String,
    pub name: String,
    pub pin: String,
    pub initial_balance: Decimal,
}

impl CreateAccountCommand {
    pub fn parse(
        id: &str,
        name: &str,
        pin: &str,
        initial_balance: Decimal,
        policy: PinPolicy,
    ) -> Result<Self, AccountCommandError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AccountCommandError::EmptyAccountId);
        }
        if !is_safe_account_id(id) {
            return Err(AccountCommandError::InvalidAccountId { id: id.to_owned() });
        }
        // the table codec is line oriented
        if name.contains(['\n', '\r']) {
            return Err(AccountCommandError::MultilineName);
        }
        if !policy.accepts(pin) {
            return Err(AccountCommandError::InvalidPin { policy });
        }
        if initial_balance < Decimal::zero() {
            return Err(AccountCommandError::NegativeAmount {
                action: CommandAction::CreateAccount,
            });
        }
        Ok(Self {
            id: id.to_owned(),
            name: name.trim().to_owned(),
            pin: pin.to_owned(),
            initial_balance: check_scale(initial_balance)?,
        })
    }
}

/// Account ids become part of transaction log file names.
pub(crate) fn is_safe_account_id(id: &str) -> bool {
    !id.contains("..") && !id.contains(|c: char| c == '/' || c == '\\' || c.is_control())
}

fn parse_positive_amount(
    amount: Decimal,
    action: CommandAction,
) -> Result<Decimal, AccountCommandError> {
    if amount <= Decimal::zero() {
        return Err(AccountCommandError::NonPositiveAmount { action });
    }
    check_scale(amount)
}

fn check_scale(amount: Decimal) -> Result<Decimal, AccountCommandError> {
    if amount.normalize().scale() > MONEY_SCALE {
        Err(AccountCommandError::TooPrecise { amount })
    } else {
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn amounts_must_be_positive() {
        for amount in [dec!(0), dec!(-0.01), dec!(-100)] {
            assert_eq!(
                AccountCommand::deposit(amount).unwrap_err(),
                AccountCommandError::NonPositiveAmount {
                    action: CommandAction::Deposit
                }
            );
            assert_eq!(
                AccountCommand::withdraw(amount).unwrap_err(),
                AccountCommandError::NonPositiveAmount {
                    action: CommandAction::Withdraw
                }
            );
        }
        assert_eq!(
            AccountCommand::deposit(dec!(0.01)).unwrap(),
            AccountCommand::Deposit { amount: dec!(0.01) }
        );
    }

    #[test]
    fn amounts_are_limited_to_cents() {
        let err = AccountCommand::deposit(dec!(10.005)).unwrap_err();
        assert_eq!(err, AccountCommandError::TooPrecise { amount: dec!(10.005) });
        assert_eq!(err.to_string(), "Amount 10.005 has more than 2 decimal places");

        // trailing zeros do not count
        assert!(AccountCommand::withdraw(dec!(10.5000)).is_ok());
    }

    #[test]
    fn pin_policies() {
        let min = PinPolicy::MinLength(4);
        assert!(min.accepts("1234"));
        assert!(min.accepts("abcdef"));
        assert!(!min.accepts("123"));

        let digits = PinPolicy::Digits(4);
        assert!(digits.accepts("0000"));
        assert!(!digits.accepts("12345"));
        assert!(!digits.accepts("12a4"));

        assert_eq!(
            AccountCommand::change_pin("12", PinPolicy::default()).unwrap_err(),
            AccountCommandError::InvalidPin { policy: min }
        );
        assert_eq!(
            AccountCommand::change_pin("9876", digits).unwrap(),
            AccountCommand::ChangePin {
                new_pin: "9876".to_string()
            }
        );
    }

    #[test]
    fn create_account_validation() {
        let policy = PinPolicy::Digits(4);
        let cmd = CreateAccountCommand::parse(" 2001 ", " Jane, Doe ", "4321", dec!(5), policy)
            .unwrap();
        assert_eq!(cmd.id, "2001");
        assert_eq!(cmd.name, "Jane, Doe");
        assert_eq!(cmd.initial_balance, dec!(5));

        assert_eq!(
            CreateAccountCommand::parse("  ", "x", "4321", dec!(0), policy).unwrap_err(),
            AccountCommandError::EmptyAccountId
        );
        assert_eq!(
            CreateAccountCommand::parse("1", "a\nb", "4321", dec!(0), policy).unwrap_err(),
            AccountCommandError::MultilineName
        );
        assert_eq!(
            CreateAccountCommand::parse("1", "x", "43", dec!(0), policy).unwrap_err(),
            AccountCommandError::InvalidPin { policy }
        );
        assert_eq!(
            CreateAccountCommand::parse("1", "x", "4321", dec!(-1), policy).unwrap_err(),
            AccountCommandError::NegativeAmount {
                action: CommandAction::CreateAccount
            }
        );
    }

    #[test]
    fn account_ids_must_be_file_name_safe() {
        let policy = PinPolicy::default();
        for id in ["a/b", "/etc", "..", "../x", "x..y", "a\\b", "a\tb", "nul\0"] {
            assert_eq!(
                CreateAccountCommand::parse(id, "x", "4321", dec!(0), policy).unwrap_err(),
                AccountCommandError::InvalidAccountId { id: id.to_owned() }
            );
        }
        for id in ["1001", "acc-7", "a.b", "Jo Doe"] {
            assert!(CreateAccountCommand::parse(id, "x", "4321", dec!(0), policy).is_ok());
        }
    }
}
