//! Reconciliation driver.
//!
//! Batch mode is greedy and order dependent: each transaction takes its
//! best-scoring invoice as the store stands at that moment, and one invoice
//! may be credited by several transactions. A payment the store refuses is
//! reported as unmatched and the batch carries on, so the report always
//! accounts for every payment already applied.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use royaltyhub_core::{BatchId, DomainResult, InvoiceNumber};
use royaltyhub_invoicing::{InvoiceCommand, InvoiceStore, RegisterPayment};

use crate::matcher::{MatcherConfig, find_candidates};
use crate::statement::BankTransaction;

pub const MANUAL_MATCH_SCORE: u32 = 100;
pub const MANUAL_MATCH_REASON: &str = "Manually matched";

/// A transaction annotated with its match outcome. The invoice's payment
/// amount stays authoritative; this is a display record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledPayment {
    pub transaction: BankTransaction,
    pub matched_invoice: Option<InvoiceNumber>,
    pub match_score: u32,
    pub match_reasons: Vec<String>,
    pub reconciled: bool,
    /// Amount credited to the matched invoice.
    pub applied_amount: Decimal,
    /// Why the best candidate could not be credited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ReconciledPayment {
    fn unmatched(transaction: BankTransaction) -> Self {
        Self {
            transaction,
            matched_invoice: None,
            match_score: 0,
            match_reasons: Vec::new(),
            reconciled: false,
            applied_amount: Decimal::ZERO,
            failure: None,
        }
    }

    fn failed(transaction: BankTransaction, failure: String) -> Self {
        Self {
            failure: Some(failure),
            ..Self::unmatched(transaction)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub batch_id: BatchId,
    /// Every non-outflow transaction, in input order.
    pub payments: Vec<ReconciledPayment>,
    /// Negative transactions; never matched.
    pub outflows: Vec<BankTransaction>,
}

impl ReconciliationReport {
    pub fn matched_count(&self) -> usize {
        self.payments.iter().filter(|p| p.reconciled).count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.payments.len() - self.matched_count()
    }

    /// Payments whose best candidate refused the credit.
    pub fn failed_count(&self) -> usize {
        self.payments.iter().filter(|p| p.failure.is_some()).count()
    }

    pub fn total_inflow(&self) -> Decimal {
        self.payments.iter().map(|p| p.transaction.amount).sum()
    }

    /// Sum of outflows as a positive figure.
    pub fn total_outflow(&self) -> Decimal {
        self.outflows.iter().map(|t| t.amount.abs()).sum()
    }

    pub fn total_applied(&self) -> Decimal {
        self.payments.iter().map(|p| p.applied_amount).sum()
    }
}

pub fn reconcile_batch<S>(
    store: &S,
    transactions: Vec<BankTransaction>,
    config: &MatcherConfig,
    occurred_at: DateTime<Utc>,
) -> DomainResult<ReconciliationReport>
where
    S: InvoiceStore + ?Sized,
{
    let batch_id = BatchId::new();
    let mut payments = Vec::new();
    let mut outflows = Vec::new();

    for transaction in transactions {
        if transaction.is_outflow() {
            outflows.push(transaction);
            continue;
        }
        if !transaction.is_inflow() {
            payments.push(ReconciledPayment::unmatched(transaction));
            continue;
        }

        let invoices = store.list();
        let best = find_candidates(&transaction, &invoices, config)
            .into_iter()
            .next();

        let Some(best) = best else {
            debug!(%batch_id, amount = %transaction.amount, "no invoice matched");
            payments.push(ReconciledPayment::unmatched(transaction));
            continue;
        };

        let number = best.invoice.number().clone();
        if let Err(err) = apply_payment(store, &number, &transaction, transaction.amount, occurred_at) {
            warn!(%batch_id, invoice_number = %number, error = %err, "payment could not be applied");
            payments.push(ReconciledPayment::failed(
                transaction,
                format!("invoice {number}: {err}"),
            ));
            continue;
        }
        debug!(%batch_id, invoice_number = %number, score = best.score, "payment applied");

        payments.push(ReconciledPayment {
            applied_amount: transaction.amount,
            transaction,
            matched_invoice: Some(number),
            match_score: best.score,
            match_reasons: best.reasons,
            reconciled: true,
            failure: None,
        });
    }

    let report = ReconciliationReport {
        batch_id,
        payments,
        outflows,
    };
    info!(
        %batch_id,
        matched = report.matched_count(),
        unmatched = report.unmatched_count(),
        failed = report.failed_count(),
        outflows = report.outflows.len(),
        "reconciliation batch completed"
    );
    Ok(report)
}

/// Apply `amount` of `transaction` to an explicit invoice regardless of
/// score. Repeated calls split one payment across several invoices.
pub fn reconcile_manually<S>(
    store: &S,
    transaction: BankTransaction,
    invoice_number: &InvoiceNumber,
    amount: Decimal,
    occurred_at: DateTime<Utc>,
) -> DomainResult<ReconciledPayment>
where
    S: InvoiceStore + ?Sized,
{
    apply_payment(store, invoice_number, &transaction, amount, occurred_at)?;
    info!(invoice_number = %invoice_number, %amount, "payment matched manually");

    Ok(ReconciledPayment {
        transaction,
        matched_invoice: Some(invoice_number.clone()),
        match_score: MANUAL_MATCH_SCORE,
        match_reasons: vec![MANUAL_MATCH_REASON.to_string()],
        reconciled: true,
        applied_amount: amount,
        failure: None,
    })
}

fn apply_payment<S>(
    store: &S,
    number: &InvoiceNumber,
    transaction: &BankTransaction,
    amount: Decimal,
    occurred_at: DateTime<Utc>,
) -> DomainResult<()>
where
    S: InvoiceStore + ?Sized,
{
    store.execute(
        number,
        &InvoiceCommand::RegisterPayment(RegisterPayment {
            amount,
            paid_on: transaction.date,
            occurred_at,
        }),
    )?;
    Ok(())
}
