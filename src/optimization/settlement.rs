use crate::core::account::AccountName;
use crate::core::currency::Currency;
use crate::core::error::{LedgerError, Result};
use crate::optimization::balance::NetBalances;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Balances smaller than this (in reporting-currency units) count as settled.
pub const DEFAULT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// An instruction: `sender` pays `recipient` `amount` in `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: AccountName,
    pub recipient: AccountName,
    pub amount: Decimal,
    pub currency: Currency,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6} -> {:<6} {:>10.2} {}",
            self.sender, self.recipient, self.amount, self.currency
        )
    }
}

/// Greedy settlement of net balances.
///
/// # Algorithm
///
/// 1. Sort the working set by balance, largest creditor first. Equal
///    balances are ordered by account name so the output is reproducible.
/// 2. The last entry (largest debtor) pays everything it owes to the
///    first entry (largest creditor) and leaves the working set.
/// 3. Stop as soon as the debtor's balance is below epsilon in magnitude;
///    everything left is rounding noise.
///
/// Every iteration either stops or removes one account, so at most `n - 1`
/// transactions are emitted for `n` accounts.
///
/// # Examples
///
/// ```
/// use sharepay_engine::core::account::AccountName;
/// use sharepay_engine::core::currency::Currency;
/// use sharepay_engine::optimization::balance::NetBalances;
/// use sharepay_engine::optimization::settlement::SettlementEngine;
/// use rust_decimal_macros::dec;
///
/// let name = |s: &str| AccountName::new(s).unwrap();
/// let balances = NetBalances::new(
///     Currency::TWD,
///     vec![(name("a"), dec!(200)), (name("b"), dec!(0)), (name("c"), dec!(-200))],
/// );
///
/// let transactions = SettlementEngine::default().settle(&balances).unwrap();
/// assert_eq!(transactions.len(), 1);
/// assert_eq!(transactions[0].sender, name("c"));
/// assert_eq!(transactions[0].recipient, name("a"));
/// assert_eq!(transactions[0].amount, dec!(200));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementEngine {
    epsilon: Decimal,
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl SettlementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different negligible-balance threshold. Negative values are
    /// treated as their magnitude.
    pub fn with_epsilon(epsilon: Decimal) -> Self {
        Self {
            epsilon: epsilon.abs(),
        }
    }

    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    /// Compute the settling transactions for `balances`.
    ///
    /// Works on a private copy; `balances` is left untouched. Balances that
    /// do not sum to zero can push a creditor past the `Decimal` range, which
    /// is reported as [`LedgerError::Overflow`].
    pub fn settle(&self, balances: &NetBalances) -> Result<Vec<Transaction>> {
        let mut working: Vec<(AccountName, Decimal)> = balances.entries().to_vec();
        let mut transactions = Vec::new();

        while working.len() > 1 {
            working.sort_by(|(name_a, a), (name_b, b)| b.cmp(a).then_with(|| name_a.cmp(name_b)));

            let Some((sender, amount)) = working.pop() else {
                break;
            };
            if amount.abs() < self.epsilon {
                break;
            }

            let recipient = &mut working[0];
            transactions.push(Transaction {
                sender,
                recipient: recipient.0.clone(),
                amount: -amount,
                currency: balances.currency().clone(),
            });
            recipient.1 = recipient.1.checked_add(amount).ok_or_else(|| {
                LedgerError::Overflow(format!("settling into {}", recipient.0))
            })?;
        }

        Ok(transactions)
    }
}
