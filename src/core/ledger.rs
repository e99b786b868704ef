use crate::core::account::{Account, AccountName};
use crate::core::currency::Currency;
use crate::core::error::{LedgerError, Result};
use crate::core::payment::{Debt, Payment, PaymentId};
use crate::optimization::balance::{BalanceAggregator, NetBalances};
use crate::optimization::settlement::{SettlementEngine, Transaction, DEFAULT_EPSILON};
use crate::rates::RateProvider;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Construction parameters for a [`Ledger`].
///
/// Deserializable so a trip can be described in a file; every field but
/// `name` has a default (reporting currency TWD, no aliases, epsilon 1e-6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub name: String,
    #[serde(default)]
    pub currency: Currency,
    /// Accounts to create up front, in this order.
    #[serde(default)]
    pub members: Vec<String>,
    /// alias -> canonical account.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default = "default_epsilon")]
    pub epsilon: Decimal,
}

fn default_epsilon() -> Decimal {
    DEFAULT_EPSILON
}

impl LedgerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            currency: Currency::default(),
            members: Vec::new(),
            aliases: HashMap::new(),
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Accounts, payments and derived debts of one group (a trip or project).
///
/// Balances are only meaningful right after [`Ledger::recompute_balances`]
/// or [`Ledger::settle_up`]; recording or deleting payments does not touch
/// them.
///
/// Mutating operations take `&mut self`. A service sharing a ledger between
/// callers must serialize access to it (for example behind a `Mutex`).
///
/// # Examples
///
/// ```
/// use sharepay_engine::prelude::*;
/// use rust_decimal_macros::dec;
///
/// let mut ledger = Ledger::with_currency("tokyo", Currency::TWD);
/// ledger.record_payment(dec!(300), "a", ["a", "b", "c"], None).unwrap();
/// ledger.record_payment(dec!(200), "b", ["b", "c"], None).unwrap();
///
/// let transactions = ledger.settle_up(&FixedRates::new()).unwrap();
/// assert_eq!(transactions.len(), 1);
/// assert_eq!(transactions[0].sender.as_str(), "c");
/// assert_eq!(transactions[0].recipient.as_str(), "a");
/// assert_eq!(transactions[0].amount, dec!(200));
/// ```
#[derive(Debug, Clone)]
pub struct Ledger {
    name: String,
    currency: Currency,
    accounts: Vec<Account>,
    index: HashMap<AccountName, usize>,
    payments: Vec<Payment>,
    aliases: HashMap<AccountName, AccountName>,
    engine: SettlementEngine,
}

impl Ledger {
    /// Empty ledger reporting in the default currency.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_currency(name, Currency::default())
    }

    pub fn with_currency(name: impl Into<String>, currency: Currency) -> Self {
        Self {
            name: name.into(),
            currency,
            accounts: Vec::new(),
            index: HashMap::new(),
            payments: Vec::new(),
            aliases: HashMap::new(),
            engine: SettlementEngine::default(),
        }
    }

    /// Build a ledger from a config: members are added first, then aliases
    /// (creating their targets).
    pub fn from_config(config: LedgerConfig) -> Result<Self> {
        let mut ledger = Self::with_currency(config.name, config.currency);
        ledger.engine = SettlementEngine::with_epsilon(config.epsilon);
        for member in &config.members {
            ledger.add_account(member)?;
        }
        let mut aliases: Vec<_> = config.aliases.into_iter().collect();
        aliases.sort();
        for (alias, target) in aliases {
            ledger.set_alias(&alias, &target)?;
        }
        Ok(ledger)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The reporting currency.
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    // --- Accounts ---

    /// Make sure an account exists for an already-normalized name.
    /// Returns its position in insertion order.
    pub fn ensure_account(&mut self, name: &AccountName) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.accounts.len();
        self.accounts
            .push(Account::new(name.clone(), self.currency.clone()));
        self.index.insert(name.clone(), idx);
        debug!("{}: added account {}", self.name, name);
        idx
    }

    /// Normalize `name` and create its account if missing.
    pub fn add_account(&mut self, name: &str) -> Result<AccountName> {
        let name = AccountName::new(name)?;
        self.ensure_account(&name);
        Ok(name)
    }

    /// Accounts in order of first reference.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn account_names(&self) -> Vec<AccountName> {
        self.accounts.iter().map(|a| a.name().clone()).collect()
    }

    pub fn account(&self, name: &str) -> Option<&Account> {
        let name = AccountName::new(name).ok()?;
        self.index.get(&name).map(|&idx| &self.accounts[idx])
    }

    /// Stored balance of an account, as of the last recompute.
    pub fn balance(&self, name: &str) -> Result<Decimal> {
        self.account(name)
            .map(Account::balance)
            .ok_or_else(|| LedgerError::AccountNotFound(name.trim().to_lowercase()))
    }

    /// Sum of all stored balances, saturating at the `Decimal` bounds.
    pub fn total_balance(&self) -> Decimal {
        self.accounts
            .iter()
            .map(Account::balance)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    // --- Aliases ---

    /// Redirect everything owed to or by `alias` to `target` at aggregation
    /// time. Both accounts are created if missing; neither is merged.
    pub fn set_alias(&mut self, alias: &str, target: &str) -> Result<()> {
        let alias = AccountName::new(alias)?;
        let target = AccountName::new(target)?;
        if alias == target {
            return Err(LedgerError::Validation(format!(
                "account {alias} cannot be an alias of itself"
            )));
        }
        self.ensure_account(&alias);
        self.ensure_account(&target);
        debug!("{}: alias {} -> {}", self.name, alias, target);
        self.aliases.insert(alias, target);
        Ok(())
    }

    pub fn aliases(&self) -> &HashMap<AccountName, AccountName> {
        &self.aliases
    }

    // --- Payments ---

    /// Record a shared expense timestamped now.
    ///
    /// Names are normalized and missing accounts (payer included) are
    /// created. `currency` defaults to the reporting currency.
    pub fn record_payment<I, S>(
        &mut self,
        amount: Decimal,
        payer: &str,
        participants: I,
        currency: Option<Currency>,
    ) -> Result<Payment>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.record_payment_at(amount, payer, participants, currency, Utc::now())
    }

    /// [`Ledger::record_payment`] with an explicit timestamp.
    pub fn record_payment_at<I, S>(
        &mut self,
        amount: Decimal,
        payer: &str,
        participants: I,
        currency: Option<Currency>,
        timestamp: DateTime<Utc>,
    ) -> Result<Payment>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let payment =
            self.build_payment(PaymentId::new(), amount, payer, participants, currency, timestamp)?;
        debug!(
            "{}: recorded payment {} of {} {} by {}",
            self.name,
            payment.id(),
            payment.amount(),
            payment.currency(),
            payment.payer()
        );
        self.payments.push(payment.clone());
        Ok(payment)
    }

    /// Store an already-built payment, creating its accounts.
    ///
    /// The payment is re-validated first, so one that breaks the
    /// construction rules is rejected before any account is created.
    pub fn insert_payment(&mut self, payment: Payment) -> Result<()> {
        payment.validate()?;
        if self.payments.iter().any(|p| p.id() == payment.id()) {
            return Err(LedgerError::Validation(format!(
                "payment {} is already recorded",
                payment.id()
            )));
        }
        self.ensure_account(payment.payer());
        for participant in payment.participants() {
            self.ensure_account(participant);
        }
        self.payments.push(payment);
        Ok(())
    }

    /// Remove a payment together with the debts it generated.
    pub fn delete_payment(&mut self, id: PaymentId) -> Result<bool> {
        let pos = self.position_of(id)?;
        self.payments.remove(pos);
        debug!("{}: deleted payment {}", self.name, id);
        Ok(true)
    }

    /// Replace a payment's contents, keeping its id and position.
    pub fn update_payment<I, S>(
        &mut self,
        id: PaymentId,
        amount: Decimal,
        payer: &str,
        participants: I,
        currency: Option<Currency>,
    ) -> Result<Payment>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pos = self.position_of(id)?;
        let timestamp = self.payments[pos].timestamp();
        let note = self.payments[pos].note().map(str::to_owned);
        let mut payment = self.build_payment(id, amount, payer, participants, currency, timestamp)?;
        if let Some(note) = note {
            payment = payment.with_note(note);
        }
        self.payments[pos] = payment.clone();
        debug!("{}: updated payment {}", self.name, id);
        Ok(payment)
    }

    /// Attach a free-text description to a recorded payment.
    pub fn annotate_payment(&mut self, id: PaymentId, note: impl Into<String>) -> Result<()> {
        let pos = self.position_of(id)?;
        let payment = self.payments.remove(pos).with_note(note);
        self.payments.insert(pos, payment);
        Ok(())
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn payment(&self, id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id() == id)
    }

    /// Every derived debt, in payment order.
    pub fn debts(&self) -> impl Iterator<Item = &Debt> + '_ {
        self.payments.iter().flat_map(|p| p.debts().iter())
    }

    fn position_of(&self, id: PaymentId) -> Result<usize> {
        self.payments
            .iter()
            .position(|p| p.id() == id)
            .ok_or(LedgerError::PaymentNotFound(id))
    }

    fn build_payment<I, S>(
        &mut self,
        id: PaymentId,
        amount: Decimal,
        payer: &str,
        participants: I,
        currency: Option<Currency>,
        timestamp: DateTime<Utc>,
    ) -> Result<Payment>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let payer = AccountName::new(payer)?;
        let participants = participants
            .into_iter()
            .map(|name| AccountName::new(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let currency = currency.unwrap_or_else(|| self.currency.clone());

        // Validate before touching the account list.
        let payment = Payment::with_id(id, amount, currency, payer, participants, timestamp)?;

        self.ensure_account(payment.payer());
        for participant in payment.participants() {
            self.ensure_account(participant);
        }
        Ok(payment)
    }

    // --- Balances ---

    /// Set every stored balance to zero.
    pub fn reset_balances(&mut self) {
        for account in &mut self.accounts {
            account.set_balance(Decimal::ZERO);
        }
    }

    /// Net balances derived from the current debts, without storing them.
    pub fn net_balances(&self, rates: &dyn RateProvider) -> Result<NetBalances> {
        BalanceAggregator::new(&self.currency, rates)
            .with_aliases(&self.aliases)
            .aggregate(&self.account_names(), self.debts())
    }

    /// Fold every debt into the stored balances.
    ///
    /// Balances are computed on the side and committed only when every
    /// conversion succeeded, so a failing rate lookup leaves them as they
    /// were. Preceded by [`Ledger::reset_balances`] this is idempotent.
    pub fn recompute_balances(&mut self, rates: &dyn RateProvider) -> Result<()> {
        let net = self.net_balances(rates)?;
        for (account, (_, delta)) in self.accounts.iter_mut().zip(net.entries()) {
            account.set_balance(account.balance() + *delta);
        }
        Ok(())
    }

    /// Reset and recompute balances, then compute the settling transactions.
    pub fn settle_up(&mut self, rates: &dyn RateProvider) -> Result<Vec<Transaction>> {
        let net = self.net_balances(rates)?;
        self.reset_balances();
        self.store_balances(&net);

        let transactions = self.engine.settle(&net)?;
        for tx in &transactions {
            info!("{}", tx);
        }
        Ok(transactions)
    }

    fn store_balances(&mut self, net: &NetBalances) {
        for (account, (_, balance)) in self.accounts.iter_mut().zip(net.entries()) {
            account.set_balance(*balance);
        }
    }
}
