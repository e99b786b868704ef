use crate::core::currency::Currency;
use crate::core::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized participant name.
///
/// Names are case-insensitive: they are trimmed and lower-cased on
/// construction, so `" Alice "` and `"alice"` refer to the same account.
///
/// # Examples
///
/// ```
/// use sharepay_engine::core::account::AccountName;
///
/// let a = AccountName::new(" Narumi ").unwrap();
/// assert_eq!(a.as_str(), "narumi");
/// assert!(AccountName::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountName(String);

impl AccountName {
    pub fn new(name: &str) -> Result<Self> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(LedgerError::Validation(format!(
                "account name must not be blank, got {name:?}"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl TryFrom<String> for AccountName {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(&s)
    }
}

impl From<AccountName> for String {
    fn from(name: AccountName) -> Self {
        name.0
    }
}

/// One participant's running net position.
///
/// A positive balance means the account is owed money (net creditor),
/// a negative balance means it owes (net debtor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    name: AccountName,
    balance: Decimal,
    currency: Currency,
}

impl Account {
    pub fn new(name: AccountName, currency: Currency) -> Self {
        Self {
            name,
            balance: Decimal::ZERO,
            currency,
        }
    }

    pub fn name(&self) -> &AccountName {
        &self.name
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub(crate) fn set_balance(&mut self, balance: Decimal) {
        self.balance = balance;
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6} {:>10.2} {}", self.name, self.balance, self.currency)
    }
}
