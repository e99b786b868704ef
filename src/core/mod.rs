//! Foundational types: currencies, accounts, payments, errors and the ledger.

pub mod account;
pub mod currency;
pub mod error;
pub mod ledger;
pub mod payment;
