//! # sharepay-engine
//!
//! Shared-expense ledger and settlement engine.
//!
//! Members of a group record who paid for what, possibly in several
//! currencies. The engine splits each payment into debts, folds them into
//! one net balance per member in the group's reporting currency, and
//! computes a short list of transfers that brings everyone back to zero.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: currencies, accounts, payments, the ledger
//! - **rates** — Injected currency rate lookup with an owned cache
//! - **optimization** — Balance aggregation and greedy settlement
//! - **ingest** — Building a ledger from spreadsheet-style rows
//! - **simulation** — Random trip generation for stress tests

pub mod core;
pub mod ingest;
pub mod optimization;
pub mod rates;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::account::{Account, AccountName};
    pub use crate::core::currency::Currency;
    pub use crate::core::error::{LedgerError, Result};
    pub use crate::core::ledger::{Ledger, LedgerConfig};
    pub use crate::core::payment::{Debt, Payment, PaymentId};
    pub use crate::ingest::PaymentRow;
    pub use crate::optimization::balance::{BalanceAggregator, NetBalances};
    pub use crate::optimization::settlement::{SettlementEngine, Transaction};
    pub use crate::rates::{CachedRates, FixedRates, RateError, RateProvider};
}
