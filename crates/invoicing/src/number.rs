//! Invoice number generation.
//!
//! Two formats exist side by side and both are treated as opaque unique
//! strings once issued:
//!
//! - deterministic `{P3}-{YYYYMM}-{COUNTRY}` (batch generation, e.g. `ACM-202310-BR`)
//! - random `INV-{C3}-{P3}-{YYYYMMDDHHMM}-{RAND4}` (manual single invoices)

use chrono::{DateTime, Utc};
use rand::Rng;

use royaltyhub_core::{CountryCode, DomainResult, InvoiceNumber};

const PREFIX_LEN: usize = 3;
const RANDOM_SUFFIX_LEN: usize = 4;
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// First three ASCII letters of the partner name, uppercased, padded with `X`.
///
/// Letters only, so the deterministic number stays extractable from payment
/// descriptions.
pub fn partner_prefix(partner: &str) -> String {
    let mut prefix: String = partner
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(PREFIX_LEN)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while prefix.len() < PREFIX_LEN {
        prefix.push('X');
    }
    prefix
}

pub fn deterministic_invoice_number(
    partner: &str,
    country: &CountryCode,
    year: i32,
    month: u32,
) -> DomainResult<InvoiceNumber> {
    InvoiceNumber::new(&format!(
        "{}-{year:04}{month:02}-{country}",
        partner_prefix(partner)
    ))
}

pub fn random_invoice_number<R: Rng + ?Sized>(
    partner: &str,
    country: &CountryCode,
    at: DateTime<Utc>,
    rng: &mut R,
) -> DomainResult<InvoiceNumber> {
    let country_code: String = country.as_str().chars().take(PREFIX_LEN).collect();
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();

    InvoiceNumber::new(&format!(
        "INV-{country_code}-{}-{}-{suffix}",
        partner_prefix(partner),
        at.format("%Y%m%d%H%M"),
    ))
}
