//! Balance aggregation and greedy settlement.

pub mod balance;
pub mod settlement;
