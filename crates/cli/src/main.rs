//! `royaltyhub` command-line entry point.
//!
//! ```text
//! royaltyhub generate <sell-out.csv>
//! royaltyhub reconcile <statement.csv>
//! royaltyhub report [today YYYY-MM-DD]
//! ```
//!
//! Settings come from `ROYALTYHUB_SETTINGS`, invoices are kept as JSON at
//! `ROYALTYHUB_INVOICES` (default `data/invoices.json`). Results go to stdout
//! as JSON, logs to stderr (`ROYALTYHUB_LOG_FORMAT=json` for structured logs).

mod invoices_file;

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use royaltyhub_invoicing::{InvoiceStore, aggregate_invoices};
use royaltyhub_rates::{RateTable, StaticRateSource, default_settings_path};
use royaltyhub_reconciliation::{MatcherConfig, read_statement, reconcile_batch};
use royaltyhub_reporting::{GroupBy, breakdown, delinquency_by_country, due_status_counts, summarize};
use royaltyhub_sellout::{rate_lines, read_sell_out};

use crate::invoices_file::InvoicesFile;

const USAGE: &str = "usage: royaltyhub <generate SELL_OUT.csv | reconcile STATEMENT.csv | report [YYYY-MM-DD]>";
const REFRESH_RATES_ENV: &str = "ROYALTYHUB_REFRESH_RATES";

fn main() -> anyhow::Result<()> {
    royaltyhub_observability::init_from_env();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invoices = InvoicesFile::from_env();

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["generate", path] => generate(&invoices, PathBuf::from(path)),
        ["reconcile", path] => reconcile(&invoices, PathBuf::from(path)),
        ["report"] => report(&invoices, Utc::now().date_naive()),
        ["report", today] => {
            let today = NaiveDate::parse_from_str(today, "%Y-%m-%d")
                .with_context(|| format!("invalid date `{today}`"))?;
            report(&invoices, today)
        }
        _ => bail!(USAGE),
    }
}

fn load_rates() -> anyhow::Result<RateTable> {
    let path = default_settings_path();
    let table = RateTable::load(&path)
        .with_context(|| format!("loading country settings from {}", path.display()))?;

    if std::env::var_os(REFRESH_RATES_ENV).is_some() {
        return Ok(table.refreshed_with(&StaticRateSource::reference(), Utc::now().date_naive()));
    }
    Ok(table)
}

fn generate(invoices: &InvoicesFile, sell_out: PathBuf) -> anyhow::Result<()> {
    let rates = load_rates()?;
    let file = File::open(&sell_out).with_context(|| format!("opening {}", sell_out.display()))?;
    let lines = read_sell_out(file, &rates).context("validating sell-out import")?;
    let rated = rate_lines(lines, &rates).context("rating sell-out lines")?;

    let store = invoices.load()?;
    let generated = aggregate_invoices(&rated, Utc::now())?;
    let report = store.insert_batch(generated)?;
    invoices.save(&store)?;

    tracing::info!(
        inserted = report.inserted.len(),
        skipped = report.skipped.len(),
        "invoice generation finished"
    );
    print_json(&serde_json::json!({
        "inserted": report.inserted,
        "skipped": report.skipped,
    }))
}

fn reconcile(invoices: &InvoicesFile, statement: PathBuf) -> anyhow::Result<()> {
    let file = File::open(&statement).with_context(|| format!("opening {}", statement.display()))?;
    let transactions = read_statement(file).context("validating bank statement")?;

    let store = invoices.load()?;
    let report = reconcile_batch(&store, transactions, &MatcherConfig::default(), Utc::now())?;
    invoices.save(&store)?;

    print_json(&report)
}

fn report(invoices: &InvoicesFile, today: NaiveDate) -> anyhow::Result<()> {
    let store = invoices.load()?;
    let all = store.list();

    print_json(&serde_json::json!({
        "as_of": today,
        "invoices": summarize(&all),
        "by_country": breakdown(&all, GroupBy::Country),
        "by_partner": breakdown(&all, GroupBy::Partner),
        "by_period": breakdown(&all, GroupBy::Period),
        "by_status": breakdown(&all, GroupBy::Status),
        "delinquency": delinquency_by_country(&all),
        "due_status": due_status_counts(&all, today),
    }))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{json}");
    Ok(())
}
