//! A three-day trip settled in TWD from payments made in JPY.
//!
//! Yoan is John's guest, so everything owed by or to Yoan is settled
//! through John.

use rust_decimal_macros::dec;
use sharepay_engine::prelude::*;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║     sharepay-engine: Sendai Trip Demo    ║");
    println!("╚══════════════════════════════════════════╝\n");

    let mut ledger = Ledger::with_currency("Sendai", Currency::TWD);
    ledger.set_alias("yoan", "john").expect("valid alias");

    let jpy = Some(Currency::JPY);
    ledger
        .record_payment(dec!(300), "narumi", ["narumi", "dogiko", "ben"], jpy.clone())
        .expect("valid payment");
    ledger
        .record_payment(dec!(600), "dogiko", ["dogiko", "ben", "john"], jpy.clone())
        .expect("valid payment");
    ledger
        .record_payment(dec!(900), "ben", ["john", "yoan"], jpy)
        .expect("valid payment");

    let rates = CachedRates::new(
        FixedRates::new()
            .with_rate(Currency::JPY, Currency::TWD, dec!(0.21))
            .expect("positive rate"),
    );

    println!("━━━ Debts ━━━\n");
    for debt in ledger.debts() {
        println!("  {}", debt);
    }

    let transactions = ledger.settle_up(&rates).expect("rates available");

    println!("\n━━━ Balances (TWD) ━━━\n");
    for account in ledger.accounts() {
        println!("  {}", account);
    }

    println!("\n━━━ Transfers ━━━\n");
    for tx in &transactions {
        println!("  {}", tx);
    }
    println!("\nRate lookups cached: {}", rates.cached_pairs());
}
