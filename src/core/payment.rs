use crate::core::account::AccountName;
use crate::core::currency::Currency;
use crate::core::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque unique identifier of a recorded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PaymentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for PaymentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A directional obligation derived from one payment: `debtor` owes
/// `creditor` `amount` in `currency`, before any currency normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub creditor: AccountName,
    pub debtor: AccountName,
    pub amount: Decimal,
    pub currency: Currency,
}

impl fmt::Display for Debt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6} owes {:<6} {:>10.2} {}",
            self.debtor, self.creditor, self.amount, self.currency
        )
    }
}

/// Split `amount` evenly across every entry of `participants` and produce
/// one debt per entry that is not the payer.
///
/// Duplicated participants are meaningful: each occurrence carries its own
/// share. Every occurrence of the payer is skipped, so the debts sum to
/// `amount * k / n` where `k` counts the non-payer entries.
pub fn expand_debts(
    amount: Decimal,
    currency: &Currency,
    payer: &AccountName,
    participants: &[AccountName],
) -> Vec<Debt> {
    if participants.is_empty() {
        return Vec::new();
    }
    let share = amount / Decimal::from(participants.len());
    participants
        .iter()
        .filter(|p| *p != payer)
        .map(|debtor| Debt {
            creditor: payer.clone(),
            debtor: debtor.clone(),
            amount: share,
            currency: currency.clone(),
        })
        .collect()
}

/// A single shared expense.
///
/// The payment owns the debts it generated, so removing it retracts
/// exactly those debts and nothing else.
///
/// # Examples
///
/// ```
/// use sharepay_engine::core::account::AccountName;
/// use sharepay_engine::core::currency::Currency;
/// use sharepay_engine::core::payment::Payment;
/// use rust_decimal_macros::dec;
///
/// let name = |s: &str| AccountName::new(s).unwrap();
/// let payment = Payment::new(
///     dec!(300),
///     Currency::TWD,
///     name("a"),
///     vec![name("a"), name("b"), name("c")],
/// )
/// .unwrap();
///
/// assert_eq!(payment.debts().len(), 2);
/// assert_eq!(payment.debts()[0].amount, dec!(100));
/// ```
///
/// Deserialization goes through the same checks as [`Payment::with_id`]
/// and rebuilds the debts; a serialized `debts` field is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PaymentRecord")]
pub struct Payment {
    id: PaymentId,
    amount: Decimal,
    currency: Currency,
    payer: AccountName,
    participants: Vec<AccountName>,
    timestamp: DateTime<Utc>,
    note: Option<String>,
    debts: Vec<Debt>,
}

/// Wire form of a [`Payment`], without its derived debts.
#[derive(Deserialize)]
struct PaymentRecord {
    id: PaymentId,
    amount: Decimal,
    currency: Currency,
    payer: AccountName,
    participants: Vec<AccountName>,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    note: Option<String>,
}

impl TryFrom<PaymentRecord> for Payment {
    type Error = LedgerError;

    fn try_from(record: PaymentRecord) -> Result<Self> {
        let payment = Payment::with_id(
            record.id,
            record.amount,
            record.currency,
            record.payer,
            record.participants,
            record.timestamp,
        )?;
        Ok(match record.note {
            Some(note) => payment.with_note(note),
            None => payment,
        })
    }
}

impl Payment {
    /// Create a payment timestamped now.
    pub fn new(
        amount: Decimal,
        currency: Currency,
        payer: AccountName,
        participants: Vec<AccountName>,
    ) -> Result<Self> {
        Self::with_id(PaymentId::new(), amount, currency, payer, participants, Utc::now())
    }

    /// Create a payment with a specific id and timestamp.
    pub fn with_id(
        id: PaymentId,
        amount: Decimal,
        currency: Currency,
        payer: AccountName,
        participants: Vec<AccountName>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "payment amount must be positive, got {amount}"
            )));
        }
        if participants.is_empty() {
            return Err(LedgerError::Validation(
                "payment must have at least one participant".to_string(),
            ));
        }
        let debts = expand_debts(amount, &currency, &payer, &participants);
        Ok(Self {
            id,
            amount,
            currency,
            payer,
            participants,
            timestamp,
            note: None,
            debts,
        })
    }

    /// Re-check the construction rules: positive amount, at least one
    /// participant, and debts equal to the even split of the amount.
    pub fn validate(&self) -> Result<()> {
        let rebuilt = Payment::with_id(
            self.id,
            self.amount,
            self.currency.clone(),
            self.payer.clone(),
            self.participants.clone(),
            self.timestamp,
        )?;
        if rebuilt.debts != self.debts {
            return Err(LedgerError::Validation(format!(
                "payment {} carries debts that do not match its split",
                self.id
            )));
        }
        Ok(())
    }

    /// Attach a free-text description.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn payer(&self) -> &AccountName {
        &self.payer
    }

    pub fn participants(&self) -> &[AccountName] {
        &self.participants
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn debts(&self) -> &[Debt] {
        &self.debts
    }

    /// The amount each participant entry is responsible for.
    pub fn share(&self) -> Decimal {
        self.amount / Decimal::from(self.participants.len())
    }
}
