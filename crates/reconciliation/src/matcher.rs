//! Payment matcher.
//!
//! Scores every open invoice against one incoming transaction. Signals are
//! evaluated independently and summed:
//!
//! | signal | points |
//! |---|---|
//! | invoice number found in description or reference | 100 |
//! | amount equals remaining balance | 50 |
//! | else amount equals invoice total | 45 |
//! | else amount within 10% of remaining balance | 20 |
//! | invoice created within the fuzzy date range | 15 |
//! | else within 30 days | 10 |
//! | else within 60 days | 5 |
//! | partner name appears in description | 10 |

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use royaltyhub_core::{InvoiceNumber, amounts_match};
use royaltyhub_invoicing::Invoice;

use crate::statement::BankTransaction;

/// Deterministic invoice numbers only (`ACM-202310-BR`).
pub const INVOICE_NUMBER_PATTERN: &str = r"[A-Z]{3}-\d{6}-[A-Z]{2}";

static INVOICE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(INVOICE_NUMBER_PATTERN).expect("invoice number pattern compiles"));

const NUMBER_MATCH_SCORE: u32 = 100;
const REMAINING_MATCH_SCORE: u32 = 50;
const TOTAL_MATCH_SCORE: u32 = 45;
const CLOSE_AMOUNT_SCORE: u32 = 20;
const RECENT_SCORE: u32 = 15;
const WITHIN_30_SCORE: u32 = 10;
const WITHIN_60_SCORE: u32 = 5;
const PARTNER_NAME_SCORE: u32 = 10;

/// 10%
const CLOSE_AMOUNT_RATIO: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Days either side of invoice creation that count as "recent".
    pub fuzzy_date_range_days: i64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_date_range_days: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchCandidate {
    pub invoice: Invoice,
    pub score: u32,
    /// Labels of the triggered signals, in evaluation order.
    pub reasons: Vec<String>,
    pub remaining_amount: Decimal,
}

impl MatchCandidate {
    pub fn invoice_number(&self) -> &InvoiceNumber {
        self.invoice.number()
    }
}

/// First embedded invoice number: description first, then reference.
pub fn extract_invoice_number(transaction: &BankTransaction) -> Option<&str> {
    find_number(&transaction.description).or_else(|| find_number(&transaction.reference))
}

fn find_number(text: &str) -> Option<&str> {
    INVOICE_NUMBER_RE.find(text).map(|m| m.as_str())
}

/// Ranked candidates for one transaction, best first. Ties keep the order
/// of `invoices`. Non-inflow transactions have no candidates.
pub fn find_candidates<'a, I>(
    transaction: &BankTransaction,
    invoices: I,
    config: &MatcherConfig,
) -> Vec<MatchCandidate>
where
    I: IntoIterator<Item = &'a Invoice>,
{
    if !transaction.is_inflow() {
        return Vec::new();
    }

    let embedded = extract_invoice_number(transaction);
    let description = transaction.description.to_lowercase();

    let mut candidates: Vec<MatchCandidate> = invoices
        .into_iter()
        .filter(|invoice| invoice.accepts_payment())
        .filter_map(|invoice| score_invoice(transaction, invoice, embedded, &description, config))
        .collect();

    // stable
    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    debug!(
        amount = %transaction.amount,
        date = %transaction.date,
        candidates = candidates.len(),
        top = candidates.first().map(|c| c.invoice.number().as_str()),
        "payment scored"
    );
    candidates
}

fn score_invoice(
    transaction: &BankTransaction,
    invoice: &Invoice,
    embedded: Option<&str>,
    description_lower: &str,
    config: &MatcherConfig,
) -> Option<MatchCandidate> {
    let mut score = 0;
    let mut reasons = Vec::new();
    let amount = transaction.amount;
    let remaining = invoice.remaining_amount();

    if embedded == Some(invoice.number().as_str()) {
        score += NUMBER_MATCH_SCORE;
        reasons.push("Invoice number match".to_string());
    }

    if amounts_match(amount, remaining) {
        score += REMAINING_MATCH_SCORE;
        reasons.push("Amount match".to_string());
    } else if amounts_match(amount, invoice.total_amount()) {
        score += TOTAL_MATCH_SCORE;
        reasons.push("Total amount match".to_string());
    } else if remaining > Decimal::ZERO
        && (amount - remaining).abs() < remaining * CLOSE_AMOUNT_RATIO
    {
        score += CLOSE_AMOUNT_SCORE;
        reasons.push("Close amount (within 10%)".to_string());
    }

    let days = days_between(transaction.date, invoice.created_at().date_naive());
    if days <= config.fuzzy_date_range_days {
        score += RECENT_SCORE;
        reasons.push(format!("Recent invoice (within {days} days)"));
    } else if days <= 30 {
        score += WITHIN_30_SCORE;
        reasons.push("Invoice within 30 days".to_string());
    } else if days <= 60 {
        score += WITHIN_60_SCORE;
        reasons.push("Invoice within 60 days".to_string());
    }

    let partner = invoice.partner().to_lowercase();
    if !partner.is_empty() && description_lower.contains(&partner) {
        score += PARTNER_NAME_SCORE;
        reasons.push("Partner name in description".to_string());
    }

    (score > 0).then(|| MatchCandidate {
        invoice: invoice.clone(),
        score,
        reasons,
        remaining_amount: remaining,
    })
}

fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}
