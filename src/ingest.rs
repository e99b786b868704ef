//! Building a ledger from tabular payment records.
//!
//! Spreadsheet exports describe one payment per row: the amount, who paid,
//! a comma-separated list of members sharing it and the currency. Rows with
//! a missing cell are skipped.
//!
//! Rows arrive either already deserialized ([`Ledger::from_rows`]) or as a
//! CSV sheet with an `amount,payer,members,currency` header
//! ([`Ledger::from_csv`]).

use crate::core::currency::Currency;
use crate::core::error::Result;
use crate::core::ledger::Ledger;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;

/// One spreadsheet row. Every cell is optional so incomplete rows can be
/// recognized and skipped instead of failing the whole import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentRow {
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub amount: Option<Decimal>,
    pub payer: Option<String>,
    /// Comma-separated participant names; spaces are ignored.
    pub members: Option<String>,
    pub currency: Option<String>,
}

impl PaymentRow {
    pub fn new(amount: Decimal, payer: &str, members: &str, currency: &str) -> Self {
        Self {
            amount: Some(amount),
            payer: Some(payer.to_string()),
            members: Some(members.to_string()),
            currency: Some(currency.to_string()),
        }
    }

    /// Participant names split out of the `members` cell.
    pub fn member_names(&self) -> Vec<String> {
        self.members
            .as_deref()
            .map(|cell| {
                cell.replace(' ', "")
                    .split(',')
                    .filter(|name| !name.is_empty())
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_complete(&self) -> bool {
        let filled = |cell: &Option<String>| cell.as_deref().is_some_and(|s| !s.trim().is_empty());
        self.amount.is_some()
            && filled(&self.payer)
            && filled(&self.members)
            && filled(&self.currency)
    }
}

impl Ledger {
    /// Build a ledger from spreadsheet rows.
    ///
    /// `currency` defaults to TWD. Aliases are registered before any row is
    /// recorded. Incomplete rows are skipped; a complete row with invalid
    /// content (non-positive amount, blank names) fails the import.
    pub fn from_rows<I>(
        name: impl Into<String>,
        rows: I,
        aliases: &HashMap<String, String>,
        currency: Option<Currency>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = PaymentRow>,
    {
        let mut ledger = Ledger::with_currency(name, currency.unwrap_or_default());
        let mut aliases: Vec<_> = aliases.iter().collect();
        aliases.sort();
        for (alias, target) in aliases {
            ledger.set_alias(alias, target)?;
        }

        for (line, row) in rows.into_iter().enumerate() {
            if !row.is_complete() {
                debug!("row {} has an empty cell: {:?}, skip", line, row);
                continue;
            }
            let members = row.member_names();
            let (Some(amount), Some(payer), Some(code)) = (row.amount, &row.payer, &row.currency)
            else {
                continue;
            };
            let currency: Currency = code.parse()?;
            ledger.record_payment(amount, payer, &members, Some(currency))?;
        }
        Ok(ledger)
    }

    /// Build a ledger from a CSV sheet.
    ///
    /// The header names the columns (`amount`, `payer`, `members`,
    /// `currency`, in any order); cells are trimmed and a blank cell makes
    /// the row incomplete. A row that cannot be parsed at all fails the
    /// import.
    pub fn from_csv<R: io::Read>(
        name: impl Into<String>,
        reader: R,
        aliases: &HashMap<String, String>,
        currency: Option<Currency>,
    ) -> Result<Self> {
        let mut sheet = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let rows = sheet
            .deserialize::<PaymentRow>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::from_rows(name, rows, aliases, currency)
    }
}
