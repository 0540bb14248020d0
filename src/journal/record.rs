use std::{fmt, str::FromStr};

use chrono::{NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use thiserror::Error;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SEPARATOR: &str = " | ";
const BALANCE_LABEL: &str = "Balance: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    PinChange,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
            TransactionKind::PinChange => "PIN_CHANGE",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = RecordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TransactionKind::Deposit),
            "WITHDRAW" => Ok(TransactionKind::Withdraw),
            "PIN_CHANGE" => Ok(TransactionKind::PinChange),
            other => Err(RecordParseError::UnknownKind(other.to_owned())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordParseError {
    #[error("expected 5 `|` separated fields")]
    FieldCount,
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("unknown transaction type `{0}`")]
    UnknownKind(String),
    #[error("invalid amount `{0}`")]
    Amount(String),
    #[error("balance field must start with `Balance: `")]
    MissingBalanceLabel,
}

/// One immutable entry of an account's transaction log.
///
/// Encoded as a single line:
/// `YYYY-MM-DD HH:MM:SS | TYPE | amount | Balance: balance | note`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub timestamp: NaiveDateTime,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub note: String,
}

impl TransactionRecord {
    /// Timestamps only keep second resolution.
    pub fn new(
        timestamp: NaiveDateTime,
        kind: TransactionKind,
        amount: Decimal,
        balance_after: Decimal,
        note: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            kind,
            amount,
            balance_after,
            note: note.into(),
        }
    }

    pub fn to_log_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{:.2}{SEPARATOR}{BALANCE_LABEL}{:.2}{SEPARATOR}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.kind,
            self.amount,
            self.balance_after,
            self.note,
        )
    }
}

impl FromStr for TransactionRecord {
    type Err = RecordParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        // the note is free text and may itself contain the separator
        let mut fields = line.splitn(5, SEPARATOR);
        let mut next = || fields.next().ok_or(RecordParseError::FieldCount);
        let timestamp = NaiveDateTime::parse_from_str(next()?, TIMESTAMP_FORMAT)?;
        let kind: TransactionKind = next()?.parse()?;
        let amount = parse_amount(next()?)?;
        let balance = next()?
            .strip_prefix(BALANCE_LABEL)
            .ok_or(RecordParseError::MissingBalanceLabel)?;
        let balance_after = parse_amount(balance)?;
        let note = next()?;
        Ok(Self {
            timestamp,
            kind,
            amount,
            balance_after,
            note: note.to_owned(),
        })
    }
}

fn parse_amount(s: &str) -> Result<Decimal, RecordParseError> {
    Decimal::from_str(s.trim()).map_err(|_| RecordParseError::Amount(s.to_owned()))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(7, 5, 3, 999)
            .unwrap()
    }

    #[test]
    fn log_line_format() {
        let record = TransactionRecord::new(
            timestamp(),
            TransactionKind::Deposit,
            dec!(250),
            dec!(1250),
            "User deposit",
        );
        assert_eq!(
            record.to_log_line(),
            "2024-03-09 07:05:03 | DEPOSIT | 250.00 | Balance: 1250.00 | User deposit"
        );

        let record = TransactionRecord::new(
            timestamp(),
            TransactionKind::PinChange,
            Decimal::ZERO,
            dec!(0.5),
            "",
        );
        assert_eq!(
            record.to_log_line(),
            "2024-03-09 07:05:03 | PIN_CHANGE | 0.00 | Balance: 0.50 | "
        );
    }

    #[test]
    fn parse_log_line() {
        let record: TransactionRecord =
            "2024-03-09 07:05:03 | WITHDRAW | 20.10 | Balance: 979.90 | ATM | downtown"
                .parse()
                .unwrap();
        assert_eq!(record.timestamp, timestamp().with_nanosecond(0).unwrap());
        assert_eq!(record.kind, TransactionKind::Withdraw);
        assert_eq!(record.amount, dec!(20.10));
        assert_eq!(record.balance_after, dec!(979.90));
        assert_eq!(record.note, "ATM | downtown");
    }

    #[test]
    fn parse_rejects_bad_lines() {
        assert_eq!(
            "2024-03-09 07:05:03 | DEPOSIT | 1.00".parse::<TransactionRecord>(),
            Err(RecordParseError::FieldCount)
        );
        assert_eq!(
            "2024-03-09 07:05:03 | REFUND | 1.00 | Balance: 1.00 | x".parse::<TransactionRecord>(),
            Err(RecordParseError::UnknownKind("REFUND".to_string()))
        );
        assert_eq!(
            "2024-03-09 07:05:03 | DEPOSIT | 1.00 | 1.00 | x".parse::<TransactionRecord>(),
            Err(RecordParseError::MissingBalanceLabel)
        );
        assert!(matches!(
            "yesterday | DEPOSIT | 1.00 | Balance: 1.00 | x".parse::<TransactionRecord>(),
            Err(RecordParseError::Timestamp(_))
        ));
    }
}
