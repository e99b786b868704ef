use crate::core::currency::Currency;
use crate::rates::{RateError, RateProvider};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Static rate table.
///
/// Setting a rate also stores its inverse, so one entry per pair is enough.
///
/// # Examples
///
/// ```
/// use sharepay_engine::core::currency::Currency;
/// use sharepay_engine::rates::{FixedRates, RateProvider};
/// use rust_decimal_macros::dec;
///
/// let mut rates = FixedRates::new();
/// rates.set_rate(Currency::JPY, Currency::TWD, dec!(0.2)).unwrap();
///
/// assert_eq!(rates.rate(&Currency::JPY, &Currency::TWD).unwrap(), dec!(0.2));
/// assert_eq!(rates.rate(&Currency::TWD, &Currency::JPY).unwrap(), dec!(5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a direct exchange rate: 1 unit of `from` = `rate` units of `to`.
    pub fn set_rate(&mut self, from: Currency, to: Currency, rate: Decimal) -> Result<(), RateError> {
        if rate <= Decimal::ZERO {
            return Err(RateError::InvalidRate { from, to, rate });
        }
        self.rates.insert((from.clone(), to.clone()), rate);
        self.rates.insert((to, from), Decimal::ONE / rate);
        Ok(())
    }

    /// Builder-style [`FixedRates::set_rate`].
    pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Result<Self, RateError> {
        self.set_rate(from, to, rate)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl RateProvider for FixedRates {
    fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| RateError::NotFound {
                from: from.clone(),
                to: to.clone(),
            })
    }
}
