use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use royaltyhub_invoicing::{InMemoryInvoiceStore, Invoice, InvoiceStore};

pub const INVOICES_PATH_ENV: &str = "ROYALTYHUB_INVOICES";
const DEFAULT_INVOICES_PATH: &str = "data/invoices.json";

/// JSON file holding the invoice collection between runs.
#[derive(Debug, Clone)]
pub struct InvoicesFile {
    path: PathBuf,
}

impl InvoicesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os(INVOICES_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INVOICES_PATH)),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty collection.
    pub fn load(&self) -> anyhow::Result<InMemoryInvoiceStore> {
        if !self.path.exists() {
            return Ok(InMemoryInvoiceStore::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let invoices: Vec<Invoice> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        InMemoryInvoiceStore::with_invoices(invoices)
            .with_context(|| format!("loading invoices from {}", self.path.display()))
    }

    pub fn save(&self, store: &impl InvoiceStore) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&store.list()).context("serializing invoices")?;
        fs::write(&self.path, json).with_context(|| format!("writing {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use royaltyhub_core::{CountryCode, InvoiceNumber};
    use royaltyhub_invoicing::InvoiceDetails;

    fn sample() -> Invoice {
        let details = InvoiceDetails {
            partner: "Acme".into(),
            country: CountryCode::new("US").unwrap(),
            year: 2023,
            month: 10,
            total_sell_out: 1000.into(),
            royalty_rate: Default::default(),
            ad_fund_rate: Default::default(),
            tax_rate: Default::default(),
            charges: Default::default(),
            currency: "USD".into(),
            exchange_rate: 1.into(),
        };
        Invoice::new(
            InvoiceNumber::new("ACM-202310-US").unwrap(),
            details,
            Utc.with_ymd_and_hms(2023, 11, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn missing_file_is_empty_and_saves_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = InvoicesFile::new(dir.path().join("nested/invoices.json"));
        assert!(file.load().unwrap().is_empty());

        let store = InMemoryInvoiceStore::new();
        store.insert_unique(sample()).unwrap();
        file.save(&store).unwrap();

        let reloaded = file.load().unwrap();
        assert_eq!(reloaded.list(), vec![sample()]);
        assert!(file.path().exists());
    }

    #[test]
    fn high_scale_amounts_survive_the_file_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let file = InvoicesFile::new(dir.path().join("invoices.json"));

        let base = sample();
        let mut details = base.details().clone();
        details.exchange_rate = "5.123456789".parse().unwrap();
        details.charges.amount_usd = "224.467718506172839506".parse().unwrap();
        let invoice = Invoice::new(base.number().clone(), details, base.created_at());

        let store = InMemoryInvoiceStore::new();
        store.insert_unique(invoice.clone()).unwrap();
        file.save(&store).unwrap();

        let raw = std::fs::read_to_string(file.path()).unwrap();
        assert!(raw.contains("\"224.467718506172839506\""));
        assert_eq!(file.load().unwrap().list(), vec![invoice]);
    }
}
