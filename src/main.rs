//! sharepay CLI
//!
//! Settle a trip's shared expenses from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Settle the payments in a trip file
//! sharepay settle --input trip.json
//!
//! # Output as JSON
//! sharepay settle --input trip.json --format json
//!
//! # Settle a spreadsheet export
//! sharepay settle --input sheet.csv --currency TWD --rate JPY:TWD=0.21
//!
//! # Generate a random trip for testing
//! sharepay generate --members 6 --payments 40
//! ```

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sharepay_engine::core::currency::Currency;
use sharepay_engine::core::ledger::{Ledger, LedgerConfig};
use sharepay_engine::rates::FixedRates;
use sharepay_engine::simulation::stress_test::{generate_random_trip, TripConfig};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process;

fn print_usage() {
    eprintln!(
        r#"sharepay — shared expense settlement

USAGE:
    sharepay <COMMAND> [OPTIONS]

COMMANDS:
    settle      Compute balances and settling transfers for a trip file
    generate    Generate a random trip file (for testing)
    help        Show this message

OPTIONS (settle):
    --input <FILE>      Path to a JSON trip file, or a CSV sheet (.csv) with
                        columns amount,payer,members,currency
    --format <FORMAT>   Output format: text (default) or json
    --currency <CODE>   Reporting currency for a CSV sheet (default: TWD)
    --rate <F:T=RATE>   Extra exchange rate, e.g. JPY:TWD=0.21 (repeatable)
    --alias <A=TARGET>  Settle A through TARGET, for a CSV sheet (repeatable)

OPTIONS (generate):
    --members <N>       Number of members (default: 5)
    --payments <N>      Number of payments (default: 20)
    --currencies <LIST> Comma-separated currency codes, first is the
                        reporting currency (default: TWD)
    --output <FILE>     Write to file instead of stdout

ENVIRONMENT:
    RUST_LOG            Log filter (default: warn)

EXAMPLES:
    sharepay settle --input trip.json
    sharepay settle --input trip.json --format json
    sharepay settle --input sheet.csv --rate JPY:TWD=0.21 --alias yoan=john
    sharepay generate --members 8 --payments 50 --currencies TWD,JPY"#
    );
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// JSON schema of a trip file.
#[derive(Serialize, Deserialize)]
struct TripFile {
    #[serde(flatten)]
    config: LedgerConfig,
    #[serde(default)]
    rates: Vec<RateInput>,
    #[serde(default)]
    payments: Vec<PaymentInput>,
}

#[derive(Serialize, Deserialize)]
struct RateInput {
    from: Currency,
    to: Currency,
    rate: Decimal,
}

#[derive(Serialize, Deserialize)]
struct PaymentInput {
    amount: Decimal,
    payer: String,
    members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

/// JSON output schema for a settlement.
#[derive(Serialize)]
struct SettlementOutput {
    name: String,
    currency: String,
    balances: Vec<BalanceOutput>,
    transactions: Vec<TransactionOutput>,
}

#[derive(Serialize)]
struct BalanceOutput {
    member: String,
    balance: String,
}

#[derive(Serialize)]
struct TransactionOutput {
    sender: String,
    recipient: String,
    amount: String,
    currency: String,
}

fn load_trip(path: &str) -> (Ledger, FixedRates) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read file '{}': {}", path, e)));

    let file: TripFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "name": "sendai",
  "currency": "TWD",
  "aliases": {{ "yoan": "john" }},
  "rates": [ {{ "from": "JPY", "to": "TWD", "rate": "0.21" }} ],
  "payments": [
    {{ "amount": "300", "payer": "narumi", "members": ["narumi", "dogiko", "ben"], "currency": "JPY" }}
  ]
}}"#
        );
        process::exit(1);
    });

    let mut rates = FixedRates::new();
    for r in file.rates {
        rates
            .set_rate(r.from, r.to, r.rate)
            .unwrap_or_else(|e| fail(e));
    }

    let mut ledger = Ledger::from_config(file.config).unwrap_or_else(|e| fail(e));
    for p in file.payments {
        let payment = ledger
            .record_payment(p.amount, &p.payer, &p.members, p.currency)
            .unwrap_or_else(|e| fail(e));
        if let Some(note) = p.note {
            ledger
                .annotate_payment(payment.id(), note)
                .unwrap_or_else(|e| fail(e));
        }
    }
    (ledger, rates)
}

fn load_sheet(path: &str, aliases: &HashMap<String, String>, currency: Option<Currency>) -> Ledger {
    let file = fs::File::open(path)
        .unwrap_or_else(|e| fail(format!("cannot read file '{}': {}", path, e)));
    let name = Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet".to_string());
    Ledger::from_csv(name, file, aliases, currency).unwrap_or_else(|e| fail(e))
}

/// Parse `FROM:TO=RATE`.
fn parse_rate(spec: &str) -> Option<(Currency, Currency, Decimal)> {
    let (pair, rate) = spec.split_once('=')?;
    let (from, to) = pair.split_once(':')?;
    Some((from.parse().ok()?, to.parse().ok()?, rate.trim().parse().ok()?))
}

fn cmd_settle(args: &[String]) {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut currency = None;
    let mut extra_rates = Vec::new();
    let mut aliases = HashMap::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--input requires a file path")),
                );
            }
            "--format" => {
                i += 1;
                format = args
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| fail("--format requires 'text' or 'json'"));
            }
            "--currency" => {
                i += 1;
                let code = args
                    .get(i)
                    .unwrap_or_else(|| fail("--currency requires a currency code"));
                currency = Some(code.parse::<Currency>().unwrap_or_else(|e| fail(e)));
            }
            "--rate" => {
                i += 1;
                let rate = args
                    .get(i)
                    .and_then(|spec| parse_rate(spec))
                    .unwrap_or_else(|| fail("--rate requires FROM:TO=RATE, e.g. JPY:TWD=0.21"));
                extra_rates.push(rate);
            }
            "--alias" => {
                i += 1;
                let (alias, target) = args
                    .get(i)
                    .and_then(|spec| spec.split_once('='))
                    .unwrap_or_else(|| fail("--alias requires ALIAS=TARGET"));
                aliases.insert(alias.to_string(), target.to_string());
            }
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    let is_sheet = Path::new(&path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let (mut ledger, mut rates) = if is_sheet {
        (load_sheet(&path, &aliases, currency), FixedRates::new())
    } else {
        load_trip(&path)
    };
    for (from, to, rate) in extra_rates {
        rates.set_rate(from, to, rate).unwrap_or_else(|e| fail(e));
    }
    let transactions = ledger.settle_up(&rates).unwrap_or_else(|e| fail(e));

    if format == "json" {
        let output = SettlementOutput {
            name: ledger.name().to_string(),
            currency: ledger.currency().to_string(),
            balances: ledger
                .accounts()
                .iter()
                .map(|a| BalanceOutput {
                    member: a.name().to_string(),
                    balance: a.balance().round_dp(2).to_string(),
                })
                .collect(),
            transactions: transactions
                .iter()
                .map(|t| TransactionOutput {
                    sender: t.sender.to_string(),
                    recipient: t.recipient.to_string(),
                    amount: t.amount.round_dp(2).to_string(),
                    currency: t.currency.to_string(),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| fail(e));
        println!("{}", json);
    } else {
        println!("=== {} ({}) ===", ledger.name(), ledger.currency());
        println!("\n--- Balances ---");
        for account in ledger.accounts() {
            println!("  {}", account);
        }
        println!("\n--- Transfers ---");
        if transactions.is_empty() {
            println!("  Everyone is settled.");
        }
        for tx in &transactions {
            println!("  {}", tx);
        }
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = TripConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--members" => {
                i += 1;
                config.member_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| fail("--members requires a number"));
            }
            "--payments" => {
                i += 1;
                config.payment_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| fail("--payments requires a number"));
            }
            "--currencies" => {
                i += 1;
                let list = args
                    .get(i)
                    .unwrap_or_else(|| fail("--currencies requires a comma-separated list"));
                config.currencies = list
                    .split(',')
                    .map(|s| s.parse().unwrap_or_else(|e| fail(e)))
                    .collect();
            }
            "--output" => {
                i += 1;
                output_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--output requires a file path")),
                );
            }
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let ledger = generate_random_trip(&config).unwrap_or_else(|e| fail(e));

    let mut rng = rand::thread_rng();
    let reporting = ledger.currency().clone();
    let mut currencies = config.currencies.clone();
    currencies.sort();
    currencies.dedup();
    let rates = currencies
        .into_iter()
        .filter(|c| *c != reporting)
        .map(|from| RateInput {
            from,
            to: reporting.clone(),
            rate: Decimal::new(rng.gen_range(1..100_000), 3),
        })
        .collect();

    let output = TripFile {
        config: LedgerConfig {
            currency: reporting,
            members: ledger.account_names().into_iter().map(String::from).collect(),
            ..LedgerConfig::new(ledger.name())
        },
        rates,
        payments: ledger
            .payments()
            .iter()
            .map(|p| PaymentInput {
                amount: p.amount(),
                payer: p.payer().to_string(),
                members: p.participants().iter().map(|m| m.to_string()).collect(),
                currency: Some(p.currency().clone()),
                note: None,
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| fail(e));

    if let Some(path) = output_path {
        fs::write(&path, &json)
            .unwrap_or_else(|e| fail(format!("cannot write to '{}': {}", path, e)));
        eprintln!(
            "Generated {} payments across {} members → {}",
            ledger.payments().len(),
            ledger.accounts().len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "settle" => cmd_settle(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
