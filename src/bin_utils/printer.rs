use std::io::Write;

use crate::{account::Account, ledger::Receipt};

pub fn print_balance<W>(output: &mut W, account: &Account) -> anyhow::Result<()>
where
    W: Write,
{
    writeln!(
        output,
        "Account {} ({}): balance {:.2}",
        account.id(),
        account.name(),
        account.balance()
    )?;
    Ok(())
}

pub fn print_receipt<W>(output: &mut W, headline: &str, receipt: &Receipt) -> anyhow::Result<()>
where
    W: Write,
{
    writeln!(output, "{headline} New balance: {:.2}", receipt.balance)?;
    if !receipt.table_persisted {
        writeln!(output, "Warning: the account table could not be saved")?;
    }
    if !receipt.log_appended {
        writeln!(output, "Warning: the transaction could not be logged")?;
    }
    Ok(())
}

pub fn print_history<W>(output: &mut W, lines: &[String]) -> anyhow::Result<()>
where
    W: Write,
{
    writeln!(output, "Most recent transactions:")?;
    if lines.is_empty() {
        writeln!(output, "(no transactions found)")?;
    }
    for line in lines {
        writeln!(output, "{line}")?;
    }
    Ok(())
}
