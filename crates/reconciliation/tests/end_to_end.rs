use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use royaltyhub_core::InvoiceNumber;
use royaltyhub_invoicing::{InMemoryInvoiceStore, InvoiceStore, aggregate_invoices};
use royaltyhub_rates::RateTable;
use royaltyhub_reconciliation::{MatcherConfig, read_statement, reconcile_batch};
use royaltyhub_sellout::{rate_lines, read_sell_out};

const SETTINGS: &str = r#"{
  "BR": { "royalty_rate": 0.08, "ad_fund_rate": 0.02, "tax_rate": 0.15, "currency": "BRL", "exchange_rate": 5.0 },
  "US": { "royalty_rate": 0.05, "ad_fund_rate": 0.01, "tax_rate": 0.0 }
}"#;

const SELL_OUT: &str = "\
Date,Partner,Country,Store,Amount,Currency
2023-10-02,Acme,BR,SP-01,6000,BRL
2023-10-20,Acme,BR,SP-02,4000,BRL
2023-10-11,Beta,US,,2000,USD
";

const STATEMENT: &str = "\
Date,Amount,Description,Reference
2023-11-03,1150.00,Payment ref ACM-202310-BR,
2023-11-04,-15.00,Bank fee,
2023-11-05,120.00,Beta Foods wire,
";

fn num(s: &str) -> InvoiceNumber {
    InvoiceNumber::new(s).unwrap()
}

#[test]
fn import_generate_and_reconcile() {
    let rates = RateTable::from_json_str(SETTINGS).unwrap();
    let generated_at = Utc.with_ymd_and_hms(2023, 11, 1, 8, 0, 0).unwrap();

    let lines = read_sell_out(SELL_OUT.as_bytes(), &rates).unwrap();
    let rated = rate_lines(lines, &rates).unwrap();
    let store = InMemoryInvoiceStore::new();

    let first = store
        .insert_batch(aggregate_invoices(&rated, generated_at).unwrap())
        .unwrap();
    assert_eq!(first.inserted, vec![num("ACM-202310-BR"), num("BET-202310-US")]);

    let rerun = store
        .insert_batch(aggregate_invoices(&rated, generated_at).unwrap())
        .unwrap();
    assert!(rerun.inserted.is_empty());
    assert_eq!(store.len(), 2);

    let acme = store.get(&num("ACM-202310-BR")).unwrap();
    assert_eq!(acme.total_amount(), dec!(1150));
    assert_eq!(acme.amount_usd(), dec!(230));
    let beta = store.get(&num("BET-202310-US")).unwrap();
    assert_eq!(beta.total_amount(), dec!(120));
    assert_eq!(beta.currency(), "USD");

    let transactions = read_statement(STATEMENT.as_bytes()).unwrap();
    let report = reconcile_batch(&store, transactions, &MatcherConfig::default(), generated_at).unwrap();

    assert_eq!(report.matched_count(), 2);
    assert_eq!(report.outflows.len(), 1);
    assert_eq!(report.total_outflow(), dec!(15.00));
    assert_eq!(report.payments[0].matched_invoice, Some(num("ACM-202310-BR")));
    assert_eq!(report.payments[0].match_score, 165);
    assert_eq!(report.payments[1].matched_invoice, Some(num("BET-202310-US")));
    assert_eq!(report.payments[1].match_score, 75);

    for invoice in store.list() {
        assert!(invoice.is_paid(), "{} should be settled", invoice.number());
    }
    assert_eq!(
        store.get(&num("BET-202310-US")).unwrap().payment_date(),
        NaiveDate::from_ymd_opt(2023, 11, 5)
    );
}

#[test]
fn unknown_country_blocks_the_whole_import() {
    let rates = RateTable::from_json_str(SETTINGS).unwrap();
    let csv = "Date,Partner,Country,Amount,Currency\n2023-10-02,Acme,BR,10,BRL\n2023-10-02,Acme,AR,10,ARS\n";
    let err = read_sell_out(csv.as_bytes(), &rates).unwrap_err();
    assert!(err.to_string().contains("AR"));
}
