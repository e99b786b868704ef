use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sharepay_engine::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Provider that counts how often it is asked and can be told to fail.
struct CountingRates {
    calls: AtomicUsize,
    inner: FixedRates,
    timeout: bool,
}

impl CountingRates {
    fn new(inner: FixedRates) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            inner,
            timeout: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RateProvider for CountingRates {
    fn rate(&self, from: &Currency, to: &Currency) -> std::result::Result<Decimal, RateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.timeout {
            return Err(RateError::Timeout {
                from: from.clone(),
                to: to.clone(),
            });
        }
        self.inner.rate(from, to)
    }
}

fn basic_ledger() -> Ledger {
    let mut ledger = Ledger::with_currency("basic", Currency::TWD);
    ledger
        .record_payment(dec!(300), "a", ["a", "b", "c"], Some(Currency::TWD))
        .unwrap();
    ledger
        .record_payment(dec!(200), "b", ["b", "c"], Some(Currency::TWD))
        .unwrap();
    ledger
}

/// Two payments among three friends: only c owes, and only to a.
#[test]
fn basic_settlement_example() {
    let mut ledger = basic_ledger();
    let transactions = ledger.settle_up(&FixedRates::new()).unwrap();

    assert_eq!(ledger.balance("a").unwrap(), dec!(200));
    assert_eq!(ledger.balance("b").unwrap(), dec!(0));
    assert_eq!(ledger.balance("c").unwrap(), dec!(-200));

    assert_eq!(transactions.len(), 1);
    let tx = &transactions[0];
    assert_eq!(tx.sender.as_str(), "c");
    assert_eq!(tx.recipient.as_str(), "a");
    assert_eq!(tx.amount, dec!(200));
    assert_eq!(tx.currency, Currency::TWD);
}

/// Redirecting c to a cancels every balance exactly.
#[test]
fn alias_neutrality_example() {
    let mut ledger = Ledger::from_config(LedgerConfig {
        members: vec!["a".into(), "b".into(), "c".into()],
        aliases: HashMap::from([("c".to_string(), "a".to_string())]),
        ..LedgerConfig::new("alias")
    })
    .unwrap();
    ledger
        .record_payment(dec!(300), "a", ["a", "b", "c"], Some(Currency::TWD))
        .unwrap();
    ledger
        .record_payment(dec!(200), "b", ["b", "c"], Some(Currency::TWD))
        .unwrap();

    let transactions = ledger.settle_up(&FixedRates::new()).unwrap();
    assert!(transactions.is_empty());
    for name in ["a", "b", "c"] {
        assert_eq!(ledger.balance(name).unwrap(), Decimal::ZERO);
    }
}

/// Mixed-currency trip converted into the reporting currency.
#[test]
fn multi_currency_trip() {
    let mut ledger = Ledger::with_currency("Sendai", Currency::TWD);
    ledger.set_alias("yoan", "john").unwrap();
    ledger
        .record_payment(dec!(300), "narumi", ["narumi", "dogiko", "ben"], Some(Currency::JPY))
        .unwrap();
    ledger
        .record_payment(dec!(600), "dogiko", ["dogiko", "ben", "john"], Some(Currency::JPY))
        .unwrap();
    ledger
        .record_payment(dec!(900), "ben", ["john", "yoan"], Some(Currency::JPY))
        .unwrap();
    ledger.record_payment(dec!(100), "john", ["narumi"], None).unwrap();

    let rates = CountingRates::new(
        FixedRates::new()
            .with_rate(Currency::JPY, Currency::TWD, dec!(0.2))
            .unwrap(),
    );
    let transactions = ledger.settle_up(&rates).unwrap();

    // narumi: +40 - 100 = -60, dogiko: -20 + 80 = 60,
    // ben: -20 - 40 + 180 = 120, john (with yoan): -40 - 180 + 100 = -120
    assert_eq!(ledger.balance("narumi").unwrap(), dec!(-60));
    assert_eq!(ledger.balance("dogiko").unwrap(), dec!(60));
    assert_eq!(ledger.balance("ben").unwrap(), dec!(120));
    assert_eq!(ledger.balance("john").unwrap(), dec!(-120));
    assert_eq!(ledger.balance("yoan").unwrap(), Decimal::ZERO);
    assert_eq!(ledger.total_balance(), Decimal::ZERO);

    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].to_string(), "john   -> ben        120.00 TWD");
    assert_eq!(transactions[1].to_string(), "narumi -> dogiko      60.00 TWD");

    // One lookup for JPY -> TWD; TWD debts never reach the provider.
    assert_eq!(rates.calls(), 1);
}

#[test]
fn rate_failure_propagates() {
    let mut ledger = Ledger::new("trip");
    ledger
        .record_payment(dec!(1000), "a", ["a", "b"], Some(Currency::JPY))
        .unwrap();

    let mut rates = CountingRates::new(FixedRates::new());
    rates.timeout = true;
    let err = ledger.settle_up(&rates).unwrap_err();
    assert!(matches!(err, LedgerError::Rate(RateError::Timeout { .. })));

    let err = ledger.settle_up(&FixedRates::new()).unwrap_err();
    assert!(matches!(err, LedgerError::Rate(RateError::NotFound { .. })));
}

#[test]
fn identity_rate_never_consults_provider() {
    let mut ledger = basic_ledger();
    let rates = CountingRates::new(FixedRates::new());
    ledger.settle_up(&rates).unwrap();
    assert_eq!(rates.calls(), 0);
}

/// Two ledgers share one cached provider; the pair is fetched once.
#[test]
fn shared_cached_provider() {
    let rates = Arc::new(CachedRates::new(CountingRates::new(
        FixedRates::new()
            .with_rate(Currency::USD, Currency::TWD, dec!(32))
            .unwrap(),
    )));

    let mut first = Ledger::new("first");
    first.record_payment(dec!(10), "a", ["b"], Some(Currency::USD)).unwrap();
    let mut second = Ledger::new("second");
    second.record_payment(dec!(20), "c", ["d"], Some(Currency::USD)).unwrap();

    first.settle_up(&rates).unwrap();
    second.settle_up(&rates).unwrap();

    assert_eq!(first.balance("b").unwrap(), dec!(-320));
    assert_eq!(second.balance("c").unwrap(), dec!(640));
    let cached: &CachedRates<CountingRates> = &rates;
    assert_eq!(cached.inner().calls(), 1);
}

/// Two identical payments: deleting one keeps the other's debts intact.
#[test]
fn delete_one_of_two_identical_payments() {
    let mut ledger = Ledger::new("trip");
    let first = ledger.record_payment(dec!(100), "x", ["y"], None).unwrap();
    let second = ledger.record_payment(dec!(100), "x", ["y"], None).unwrap();
    assert_eq!(first.debts(), second.debts());

    assert!(ledger.delete_payment(first.id()).unwrap());
    assert_eq!(ledger.debts().count(), 1);
    ledger.settle_up(&FixedRates::new()).unwrap();
    assert_eq!(ledger.balance("y").unwrap(), dec!(-100));

    let err = ledger.delete_payment(first.id()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn duplicate_participant_pays_double_share() {
    let mut ledger = Ledger::new("trip");
    ledger.record_payment(dec!(600), "ben", ["john", "john", "ben"], None).unwrap();
    ledger.settle_up(&FixedRates::new()).unwrap();
    assert_eq!(ledger.balance("john").unwrap(), dec!(-400));
    assert_eq!(ledger.balance("ben").unwrap(), dec!(400));
}

#[test]
fn negligible_balances_emit_nothing() {
    let balances = NetBalances::new(
        Currency::TWD,
        vec![
            (AccountName::new("a").unwrap(), dec!(0.00000001)),
            (AccountName::new("b").unwrap(), dec!(0.00000001)),
            (AccountName::new("c").unwrap(), dec!(-0.00000002)),
        ],
    );
    assert!(SettlementEngine::default()
        .settle(&balances)
        .unwrap()
        .is_empty());
}

#[test]
fn list_accounts_and_payments() {
    let ledger = basic_ledger();
    let names: Vec<String> = ledger.account_names().into_iter().map(String::from).collect();
    assert_eq!(names, ["a", "b", "c"]);

    let payments = ledger.payments();
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[1].payer().as_str(), "b");
    assert_eq!(payments[1].amount(), dec!(200));
    assert_eq!(payments[1].currency(), &Currency::TWD);
    let participants: Vec<&str> = payments[1].participants().iter().map(|p| p.as_str()).collect();
    assert_eq!(participants, ["b", "c"]);
}

#[test]
fn ingest_rows_then_settle() {
    let rows = vec![
        PaymentRow::new(dec!(300), "A", "a, b, c", "TWD"),
        PaymentRow::default(),
        PaymentRow::new(dec!(200), "B", "b,c", "TWD"),
    ];
    let mut ledger = Ledger::from_rows("sheet", rows, &HashMap::new(), None).unwrap();
    let transactions = ledger.settle_up(&FixedRates::new()).unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, dec!(200));
}

/// Settlement output serializes with plain string fields.
#[test]
fn transaction_json() {
    let mut ledger = basic_ledger();
    let transactions = ledger.settle_up(&FixedRates::new()).unwrap();
    let json = serde_json::to_value(&transactions).unwrap();
    assert_eq!(json[0]["sender"], "c");
    assert_eq!(json[0]["recipient"], "a");
    assert_eq!(json[0]["currency"], "TWD");
}

/// A payment decoded from JSON cannot smuggle in its own debts or break
/// the amount and participant rules.
#[test]
fn decoded_payment_cannot_invent_debts() {
    let forged = r#"{
        "id": "7f1c6a1e-2b9e-4a63-9a55-2f1f0c7b8d11",
        "amount": "-5",
        "currency": "TWD",
        "payer": "a",
        "participants": [],
        "timestamp": "2024-05-01T12:00:00Z",
        "debts": [{ "creditor": "a", "debtor": "b", "amount": "1000", "currency": "TWD" }]
    }"#;
    assert!(serde_json::from_str::<Payment>(forged).is_err());

    let honest = r#"{
        "id": "7f1c6a1e-2b9e-4a63-9a55-2f1f0c7b8d11",
        "amount": "10",
        "currency": "TWD",
        "payer": "a",
        "participants": ["b"],
        "timestamp": "2024-05-01T12:00:00Z",
        "debts": [{ "creditor": "a", "debtor": "b", "amount": "1000", "currency": "TWD" }]
    }"#;
    let payment: Payment = serde_json::from_str(honest).unwrap();
    let mut ledger = Ledger::new("trip");
    ledger.insert_payment(payment).unwrap();
    let transactions = ledger.settle_up(&FixedRates::new()).unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, dec!(10));
}

#[test]
fn huge_amounts_fail_instead_of_panicking() {
    let mut ledger = Ledger::new("trip");
    ledger
        .record_payment(Decimal::MAX, "a", ["b"], Some(Currency::JPY))
        .unwrap();
    let rates = FixedRates::new()
        .with_rate(Currency::JPY, Currency::TWD, dec!(2))
        .unwrap();
    let err = ledger.settle_up(&rates).unwrap_err();
    assert!(matches!(err, LedgerError::Overflow(_)));
}

#[test]
fn csv_sheet_then_settle() {
    let sheet = "amount,payer,members,currency\n\
                 300,narumi,\"narumi, dogiko, ben\",JPY\n\
                 ,ben,john,JPY\n\
                 900,ben,\"john,yoan\",JPY\n";
    let aliases = HashMap::from([("yoan".to_string(), "john".to_string())]);
    let mut ledger =
        Ledger::from_csv("sendai", sheet.as_bytes(), &aliases, Some(Currency::TWD)).unwrap();
    assert_eq!(ledger.payments().len(), 2);

    let rates = FixedRates::new()
        .with_rate(Currency::JPY, Currency::TWD, dec!(0.2))
        .unwrap();
    let transactions = ledger.settle_up(&rates).unwrap();
    // narumi +40, dogiko -20, ben -20 + 180 = 160, john -180
    assert_eq!(ledger.balance("john").unwrap(), dec!(-180));
    assert_eq!(ledger.balance("ben").unwrap(), dec!(160));
    // john pays ben 180, overshooting ben to -20; dogiko and ben then pay
    // narumi 20 each.
    let pairs: Vec<(&str, &str)> = transactions
        .iter()
        .map(|t| (t.sender.as_str(), t.recipient.as_str()))
        .collect();
    assert_eq!(pairs, [("john", "ben"), ("dogiko", "narumi"), ("ben", "narumi")]);
    assert_eq!(transactions[0].amount, dec!(180));
}
