use crate::core::account::AccountName;
use crate::core::currency::Currency;
use crate::core::error::{LedgerError, Result};
use crate::core::payment::Debt;
use crate::rates::{self, RateProvider};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Net balance of every account in one reporting currency.
///
/// Entries keep the order in which the accounts were handed to the
/// aggregator. Positive = net creditor, negative = net debtor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetBalances {
    currency: Currency,
    entries: Vec<(AccountName, Decimal)>,
}

impl NetBalances {
    pub fn new(currency: Currency, entries: Vec<(AccountName, Decimal)>) -> Self {
        Self { currency, entries }
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn entries(&self) -> &[(AccountName, Decimal)] {
        &self.entries
    }

    pub fn get(&self, name: &AccountName) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, balance)| *balance)
    }

    /// Sum of all balances. Zero up to rounding for any consistent ledger.
    pub fn total(&self) -> Decimal {
        self.entries
            .iter()
            .fold(Decimal::ZERO, |acc, (_, b)| acc.saturating_add(*b))
    }

    /// Sum of positive balances, i.e. the total that has to change hands.
    /// Saturates at `Decimal::MAX`.
    pub fn total_owed(&self) -> Decimal {
        self.entries
            .iter()
            .map(|(_, b)| *b)
            .filter(|b| *b > Decimal::ZERO)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for NetBalances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, balance) in &self.entries {
            writeln!(f, "{:<6} {:>10.2} {}", name, balance, self.currency)?;
        }
        Ok(())
    }
}

/// Folds debts into one net balance per account.
///
/// Each debt is converted into the reporting currency, its creditor and
/// debtor are redirected through the alias map (one hop), then the creditor
/// is credited and the debtor debited by the converted amount.
pub struct BalanceAggregator<'a> {
    currency: &'a Currency,
    rates: &'a dyn RateProvider,
    aliases: Option<&'a HashMap<AccountName, AccountName>>,
}

impl<'a> BalanceAggregator<'a> {
    pub fn new(currency: &'a Currency, rates: &'a dyn RateProvider) -> Self {
        Self {
            currency,
            rates,
            aliases: None,
        }
    }

    pub fn with_aliases(mut self, aliases: &'a HashMap<AccountName, AccountName>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    fn resolve<'n>(&self, name: &'n AccountName) -> &'n AccountName
    where
        'a: 'n,
    {
        self.aliases
            .and_then(|aliases| aliases.get(name))
            .unwrap_or(name)
    }

    /// Aggregate `debts` over the known `accounts`.
    ///
    /// Fails with a validation error when a debt (or its alias target)
    /// names an account that is not in `accounts`, and with a rate error
    /// when a conversion lookup fails. Each distinct currency is looked up
    /// at most once per call.
    pub fn aggregate<'d, I>(&self, accounts: &[AccountName], debts: I) -> Result<NetBalances>
    where
        I: IntoIterator<Item = &'d Debt>,
    {
        let index: HashMap<&AccountName, usize> = accounts
            .iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();
        let mut balances = vec![Decimal::ZERO; accounts.len()];
        let mut rate_memo: HashMap<Currency, Decimal> = HashMap::new();

        for debt in debts {
            let rate = match rate_memo.get(&debt.currency) {
                Some(rate) => *rate,
                None => {
                    let rate = rates::lookup(self.rates, &debt.currency, self.currency)?;
                    rate_memo.insert(debt.currency.clone(), rate);
                    rate
                }
            };
            let amount = debt.amount.checked_mul(rate).ok_or_else(|| {
                LedgerError::Overflow(format!(
                    "converting {} {} to {}",
                    debt.amount, debt.currency, self.currency
                ))
            })?;

            let creditor = self.position(&index, &debt.creditor)?;
            let debtor = self.position(&index, &debt.debtor)?;
            balances[creditor] = balances[creditor].checked_add(amount).ok_or_else(|| {
                LedgerError::Overflow(format!("crediting {}", accounts[creditor]))
            })?;
            balances[debtor] = balances[debtor].checked_sub(amount).ok_or_else(|| {
                LedgerError::Overflow(format!("debiting {}", accounts[debtor]))
            })?;
        }

        Ok(NetBalances::new(
            self.currency.clone(),
            accounts.iter().cloned().zip(balances).collect(),
        ))
    }

    fn position(&self, index: &HashMap<&AccountName, usize>, name: &AccountName) -> Result<usize> {
        let resolved = self.resolve(name);
        index.get(resolved).copied().ok_or_else(|| {
            if resolved == name {
                LedgerError::Validation(format!("debt references unknown account {name}"))
            } else {
                LedgerError::Validation(format!(
                    "alias {name} -> {resolved} targets an unknown account"
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::{FixedRates, RateError};
    use rust_decimal_macros::dec;

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    fn debt(creditor: &str, debtor: &str, amount: Decimal, currency: Currency) -> Debt {
        Debt {
            creditor: name(creditor),
            debtor: name(debtor),
            amount,
            currency,
        }
    }

    #[test]
    fn test_aggregate_single_currency() {
        let rates = FixedRates::new();
        let accounts = vec![name("a"), name("b"), name("c")];
        let debts = vec![
            debt("a", "b", dec!(100), Currency::TWD),
            debt("a", "c", dec!(100), Currency::TWD),
            debt("b", "c", dec!(100), Currency::TWD),
        ];
        let balances = BalanceAggregator::new(&Currency::TWD, &rates)
            .aggregate(&accounts, &debts)
            .unwrap();
        assert_eq!(balances.get(&name("a")), Some(dec!(200)));
        assert_eq!(balances.get(&name("b")), Some(dec!(0)));
        assert_eq!(balances.get(&name("c")), Some(dec!(-200)));
        assert_eq!(balances.total(), Decimal::ZERO);
        assert_eq!(balances.total_owed(), dec!(200));
    }

    #[test]
    fn test_aggregate_converts_currency() {
        let rates = FixedRates::new()
            .with_rate(Currency::JPY, Currency::TWD, dec!(0.2))
            .unwrap();
        let accounts = vec![name("ben"), name("john")];
        let debts = vec![debt("ben", "john", dec!(450), Currency::JPY)];
        let balances = BalanceAggregator::new(&Currency::TWD, &rates)
            .aggregate(&accounts, &debts)
            .unwrap();
        assert_eq!(balances.get(&name("ben")), Some(dec!(90)));
        assert_eq!(balances.get(&name("john")), Some(dec!(-90)));
    }

    #[test]
    fn test_aggregate_missing_rate_fails() {
        let rates = FixedRates::new();
        let accounts = vec![name("a"), name("b")];
        let debts = vec![debt("a", "b", dec!(10), Currency::EUR)];
        let result = BalanceAggregator::new(&Currency::TWD, &rates).aggregate(&accounts, &debts);
        assert!(matches!(
            result,
            Err(LedgerError::Rate(RateError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_alias_redirects_both_sides() {
        let rates = FixedRates::new();
        let accounts = vec![name("a"), name("b"), name("c")];
        let aliases = HashMap::from([(name("c"), name("a"))]);
        let debts = vec![
            debt("a", "b", dec!(100), Currency::TWD),
            debt("a", "c", dec!(100), Currency::TWD),
            debt("b", "c", dec!(100), Currency::TWD),
        ];
        let balances = BalanceAggregator::new(&Currency::TWD, &rates)
            .with_aliases(&aliases)
            .aggregate(&accounts, &debts)
            .unwrap();
        assert_eq!(balances.get(&name("a")), Some(dec!(0)));
        assert_eq!(balances.get(&name("b")), Some(dec!(0)));
        assert_eq!(balances.get(&name("c")), Some(dec!(0)));
    }

    #[test]
    fn test_alias_to_unknown_account_fails() {
        let rates = FixedRates::new();
        let accounts = vec![name("a"), name("b")];
        let aliases = HashMap::from([(name("b"), name("ghost"))]);
        let debts = vec![debt("a", "b", dec!(10), Currency::TWD)];
        let result = BalanceAggregator::new(&Currency::TWD, &rates)
            .with_aliases(&aliases)
            .aggregate(&accounts, &debts);
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_conversion_overflow_is_an_error() {
        let rates = FixedRates::new()
            .with_rate(Currency::JPY, Currency::TWD, dec!(2))
            .unwrap();
        let accounts = vec![name("a"), name("b")];
        let debts = vec![debt("a", "b", Decimal::MAX, Currency::JPY)];
        let result = BalanceAggregator::new(&Currency::TWD, &rates).aggregate(&accounts, &debts);
        assert!(matches!(result, Err(LedgerError::Overflow(_))));
    }

    #[test]
    fn test_summing_overflow_is_an_error() {
        let rates = FixedRates::new();
        let accounts = vec![name("a"), name("b")];
        let debts = vec![
            debt("a", "b", Decimal::MAX, Currency::TWD),
            debt("a", "b", Decimal::MAX, Currency::TWD),
        ];
        let result = BalanceAggregator::new(&Currency::TWD, &rates).aggregate(&accounts, &debts);
        assert!(matches!(result, Err(LedgerError::Overflow(_))));
    }

    #[test]
    fn test_totals_saturate() {
        let balances = NetBalances::new(
            Currency::TWD,
            vec![(name("a"), Decimal::MAX), (name("b"), Decimal::MAX)],
        );
        assert_eq!(balances.total_owed(), Decimal::MAX);
        assert_eq!(balances.total(), Decimal::MAX);
        assert_eq!(balances.len(), 2);
    }

    #[test]
    fn test_empty_debts_give_flat_balances() {
        let rates = FixedRates::new();
        let accounts = vec![name("a")];
        let balances = BalanceAggregator::new(&Currency::USD, &rates)
            .aggregate(&accounts, std::iter::empty())
            .unwrap();
        assert_eq!(balances.entries(), &[(name("a"), Decimal::ZERO)]);
        assert_eq!(balances.currency(), &Currency::USD);
        assert!(!balances.is_empty());
    }
}
