use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, warn};

use royaltyhub_core::{Aggregate, DomainError, DomainResult, InvoiceNumber};

use crate::invoice::{Invoice, InvoiceCommand, InvoiceEvent};

/// Outcome of a batch insert. Duplicates are skipped, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchInsertReport {
    pub inserted: Vec<InvoiceNumber>,
    pub skipped: Vec<InvoiceNumber>,
}

/// Invoice record collection, keyed by invoice number.
///
/// Owned by one logical session; implementations serialize writers.
/// `list` returns invoices in insertion order.
pub trait InvoiceStore: Send + Sync {
    fn get(&self, number: &InvoiceNumber) -> Option<Invoice>;
    fn contains(&self, number: &InvoiceNumber) -> bool;
    fn list(&self) -> Vec<Invoice>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace in place, or append when the number is new.
    fn upsert(&self, invoice: Invoice) -> DomainResult<()>;
    fn remove(&self, number: &InvoiceNumber) -> DomainResult<Invoice>;

    /// Batch generation path: invoices whose number already exists (in the
    /// store or earlier in the same batch) are skipped.
    fn insert_batch(&self, invoices: Vec<Invoice>) -> DomainResult<BatchInsertReport>;

    /// Manual entry path: a duplicate number is a `Conflict`.
    fn insert_unique(&self, invoice: Invoice) -> DomainResult<()>;

    /// Manual edit of one invoice.
    fn update(&self, number: &InvoiceNumber, edit: &mut dyn FnMut(&mut Invoice)) -> DomainResult<()>;

    /// Run a command against one invoice and persist the resulting state.
    fn execute(
        &self,
        number: &InvoiceNumber,
        command: &InvoiceCommand,
    ) -> DomainResult<Vec<InvoiceEvent>>;
}

impl<S> InvoiceStore for Arc<S>
where
    S: InvoiceStore + ?Sized,
{
    fn get(&self, number: &InvoiceNumber) -> Option<Invoice> {
        (**self).get(number)
    }

    fn contains(&self, number: &InvoiceNumber) -> bool {
        (**self).contains(number)
    }

    fn list(&self) -> Vec<Invoice> {
        (**self).list()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn upsert(&self, invoice: Invoice) -> DomainResult<()> {
        (**self).upsert(invoice)
    }

    fn remove(&self, number: &InvoiceNumber) -> DomainResult<Invoice> {
        (**self).remove(number)
    }

    fn insert_batch(&self, invoices: Vec<Invoice>) -> DomainResult<BatchInsertReport> {
        (**self).insert_batch(invoices)
    }

    fn insert_unique(&self, invoice: Invoice) -> DomainResult<()> {
        (**self).insert_unique(invoice)
    }

    fn update(&self, number: &InvoiceNumber, edit: &mut dyn FnMut(&mut Invoice)) -> DomainResult<()> {
        (**self).update(number, edit)
    }

    fn execute(
        &self,
        number: &InvoiceNumber,
        command: &InvoiceCommand,
    ) -> DomainResult<Vec<InvoiceEvent>> {
        (**self).execute(number, command)
    }
}

/// In-memory invoice store.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    inner: RwLock<Vec<Invoice>>,
}

fn poisoned() -> DomainError {
    DomainError::invariant("invoice store lock poisoned")
}

fn not_found(number: &InvoiceNumber) -> DomainError {
    DomainError::not_found(format!("invoice {number}"))
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invoices(invoices: Vec<Invoice>) -> DomainResult<Self> {
        let store = Self::new();
        for invoice in invoices {
            store.insert_unique(invoice)?;
        }
        Ok(store)
    }

    /// Readers see the last written state even after a writer panicked;
    /// writers still refuse a poisoned lock.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Invoice>> {
        self.inner.read().unwrap_or_else(|err| {
            warn!("reading invoice store after a writer panicked");
            PoisonError::into_inner(err)
        })
    }
}

impl InvoiceStore for InMemoryInvoiceStore {
    fn get(&self, number: &InvoiceNumber) -> Option<Invoice> {
        self.read().iter().find(|i| i.number() == number).cloned()
    }

    fn contains(&self, number: &InvoiceNumber) -> bool {
        self.read().iter().any(|i| i.number() == number)
    }

    fn list(&self) -> Vec<Invoice> {
        self.read().clone()
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn upsert(&self, invoice: Invoice) -> DomainResult<()> {
        let mut invoices = self.inner.write().map_err(|_| poisoned())?;
        match invoices.iter_mut().find(|i| i.number() == invoice.number()) {
            Some(slot) => *slot = invoice,
            None => invoices.push(invoice),
        }
        Ok(())
    }

    fn remove(&self, number: &InvoiceNumber) -> DomainResult<Invoice> {
        let mut invoices = self.inner.write().map_err(|_| poisoned())?;
        let idx = invoices
            .iter()
            .position(|i| i.number() == number)
            .ok_or_else(|| not_found(number))?;
        Ok(invoices.remove(idx))
    }

    fn insert_batch(&self, batch: Vec<Invoice>) -> DomainResult<BatchInsertReport> {
        let mut invoices = self.inner.write().map_err(|_| poisoned())?;
        let mut seen: HashSet<InvoiceNumber> =
            invoices.iter().map(|i| i.number().clone()).collect();
        let mut report = BatchInsertReport::default();

        for invoice in batch {
            let number = invoice.number().clone();
            if seen.insert(number.clone()) {
                invoices.push(invoice);
                report.inserted.push(number);
            } else {
                warn!(invoice_number = %number, "duplicate invoice number skipped");
                report.skipped.push(number);
            }
        }

        debug!(
            inserted = report.inserted.len(),
            skipped = report.skipped.len(),
            "invoice batch stored"
        );
        Ok(report)
    }

    fn insert_unique(&self, invoice: Invoice) -> DomainResult<()> {
        let mut invoices = self.inner.write().map_err(|_| poisoned())?;
        if invoices.iter().any(|i| i.number() == invoice.number()) {
            return Err(DomainError::conflict(format!(
                "invoice number {} already exists",
                invoice.number()
            )));
        }
        invoices.push(invoice);
        Ok(())
    }

    fn update(&self, number: &InvoiceNumber, edit: &mut dyn FnMut(&mut Invoice)) -> DomainResult<()> {
        let mut invoices = self.inner.write().map_err(|_| poisoned())?;
        let invoice = invoices
            .iter_mut()
            .find(|i| i.number() == number)
            .ok_or_else(|| not_found(number))?;
        edit(invoice);
        Ok(())
    }

    fn execute(
        &self,
        number: &InvoiceNumber,
        command: &InvoiceCommand,
    ) -> DomainResult<Vec<InvoiceEvent>> {
        let mut invoices = self.inner.write().map_err(|_| poisoned())?;
        let invoice = invoices
            .iter_mut()
            .find(|i| i.number() == number)
            .ok_or_else(|| not_found(number))?;
        invoice.execute(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{InvoiceDetails, MarkSent};
    use chrono::{TimeZone, Utc};
    use royaltyhub_core::CountryCode;
    use royaltyhub_sellout::Charges;
    use rust_decimal_macros::dec;

    fn invoice(number: &str, notes: &str) -> Invoice {
        let details = InvoiceDetails {
            partner: "Acme".into(),
            country: CountryCode::new("US").unwrap(),
            year: 2023,
            month: 10,
            total_sell_out: dec!(1000),
            royalty_rate: dec!(0.06),
            ad_fund_rate: dec!(0.015),
            tax_rate: dec!(0),
            charges: Charges {
                total_amount: dec!(75),
                ..Charges::default()
            },
            currency: "USD".into(),
            exchange_rate: dec!(1),
        };
        Invoice::new(
            InvoiceNumber::new(number).unwrap(),
            details,
            Utc.with_ymd_and_hms(2023, 10, 31, 0, 0, 0).unwrap(),
        )
        .with_notes(notes)
    }

    fn num(s: &str) -> InvoiceNumber {
        InvoiceNumber::new(s).unwrap()
    }

    #[test]
    fn batch_insert_skips_existing_and_in_batch_duplicates() {
        let store = InMemoryInvoiceStore::new();
        store.insert_unique(invoice("ACM-202310-US", "original")).unwrap();

        let report = store
            .insert_batch(vec![
                invoice("ACM-202310-US", "again"),
                invoice("BET-202310-US", "first"),
                invoice("BET-202310-US", "second"),
            ])
            .unwrap();

        assert_eq!(report.inserted, vec![num("BET-202310-US")]);
        assert_eq!(report.skipped, vec![num("ACM-202310-US"), num("BET-202310-US")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&num("ACM-202310-US")).unwrap().notes(), Some("original"));
        assert_eq!(store.get(&num("BET-202310-US")).unwrap().notes(), Some("first"));
    }

    #[test]
    fn insert_unique_rejects_duplicates() {
        let store = InMemoryInvoiceStore::new();
        store.insert_unique(invoice("ACM-202310-US", "a")).unwrap();
        let err = store.insert_unique(invoice("ACM-202310-US", "b")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn list_keeps_insertion_order_and_upsert_replaces_in_place() {
        let store = InMemoryInvoiceStore::new();
        for n in ["ZZZ-202310-US", "AAA-202310-US", "MMM-202310-US"] {
            store.insert_unique(invoice(n, "x")).unwrap();
        }
        store.upsert(invoice("AAA-202310-US", "edited")).unwrap();

        let numbers: Vec<_> = store.list().iter().map(|i| i.number().to_string()).collect();
        assert_eq!(numbers, ["ZZZ-202310-US", "AAA-202310-US", "MMM-202310-US"]);
        assert_eq!(store.list()[1].notes(), Some("edited"));
    }

    #[test]
    fn update_execute_and_remove() {
        let store = Arc::new(InMemoryInvoiceStore::new());
        store.insert_unique(invoice("ACM-202310-US", "x")).unwrap();
        let number = num("ACM-202310-US");

        store.update(&number, &mut |inv| inv.set_notes("late")).unwrap();
        store
            .execute(
                &number,
                &InvoiceCommand::MarkSent(MarkSent {
                    occurred_at: Utc.with_ymd_and_hms(2023, 11, 1, 0, 0, 0).unwrap(),
                }),
            )
            .unwrap();

        let stored = store.get(&number).unwrap();
        assert_eq!(stored.notes(), Some("late"));
        assert!(stored.is_sent());

        store.remove(&number).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.remove(&number), Err(DomainError::NotFound(_))));
        assert!(matches!(
            store.update(&number, &mut |_| {}),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn reads_survive_a_panicking_writer() {
        let store = InMemoryInvoiceStore::new();
        store.insert_unique(invoice("ACM-202310-US", "x")).unwrap();
        let number = num("ACM-202310-US");

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = store.update(&number, &mut |_| panic!("edit failed"));
        }));
        assert!(outcome.is_err());

        assert_eq!(store.len(), 1);
        assert_eq!(store.list().len(), 1);
        assert!(store.contains(&number));
        assert_eq!(store.get(&number).unwrap().notes(), Some("x"));
        assert!(matches!(
            store.upsert(invoice("BET-202310-US", "y")),
            Err(DomainError::InvariantViolation(_))
        ));
    }
}
