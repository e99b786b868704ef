//! Currency rate lookup.
//!
//! The ledger never fetches rates itself: callers inject a [`RateProvider`].
//! [`FixedRates`] serves a static table, [`CachedRates`] memoizes any other
//! provider per currency pair.

pub mod cache;
pub mod fixed;

pub use cache::CachedRates;
pub use fixed::FixedRates;

use crate::core::currency::Currency;
use crate::core::error::LedgerError;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

/// Errors arising from rate lookups.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("no exchange rate available for {from} -> {to}")]
    NotFound { from: Currency, to: Currency },

    #[error("exchange rate must be positive, got {rate} for {from} -> {to}")]
    InvalidRate {
        from: Currency,
        to: Currency,
        rate: Decimal,
    },

    #[error("rate lookup for {from} -> {to} timed out")]
    Timeout { from: Currency, to: Currency },

    #[error("rate lookup failed: {0}")]
    Lookup(String),
}

/// Source of conversion multipliers.
///
/// `rate(from, to)` returns `r` such that `amount_in_to = amount_in_from * r`.
/// Implementations report failures (including timeouts) as errors; the
/// ledger never substitutes a default rate.
pub trait RateProvider: Send + Sync {
    fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError>;
}

impl<P: RateProvider + ?Sized> RateProvider for &P {
    fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError> {
        (**self).rate(from, to)
    }
}

impl<P: RateProvider + ?Sized> RateProvider for Arc<P> {
    fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError> {
        (**self).rate(from, to)
    }
}

/// Rate from `from` to `to`, short-circuiting to exactly one when the
/// currencies match so the provider is never consulted for identity.
pub fn lookup(
    provider: &dyn RateProvider,
    from: &Currency,
    to: &Currency,
) -> Result<Decimal, RateError> {
    if from == to {
        return Ok(Decimal::ONE);
    }
    let rate = provider.rate(from, to)?;
    if rate <= Decimal::ZERO {
        return Err(RateError::InvalidRate {
            from: from.clone(),
            to: to.clone(),
            rate,
        });
    }
    Ok(rate)
}

/// Convert `amount` from one currency to another.
///
/// Fails with [`LedgerError::Overflow`] when the converted amount does not
/// fit in a `Decimal`.
pub fn convert(
    provider: &dyn RateProvider,
    amount: Decimal,
    from: &Currency,
    to: &Currency,
) -> crate::core::error::Result<Decimal> {
    let rate = lookup(provider, from, to)?;
    amount.checked_mul(rate).ok_or_else(|| {
        LedgerError::Overflow(format!("converting {amount} {from} to {to}"))
    })
}
