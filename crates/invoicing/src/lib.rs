//! Invoicing: the invoice record, its generation from rated sell-out lines
//! (batch or manual), installment scheduling and the invoice store.

pub mod aggregator;
pub mod installments;
pub mod invoice;
pub mod manual;
pub mod number;
pub mod store;

pub use aggregator::aggregate_invoices;
pub use installments::{
    Distribution, Installment, InstallmentPlan, InstallmentSchedule, MAX_INSTALLMENTS,
    schedule_installments,
};
pub use invoice::{
    DEFAULT_PAYMENT_TERM_DAYS, DueStatus, Invoice, InvoiceCommand, InvoiceDetails, InvoiceEvent,
    InvoiceSent, InvoiceStatus, MarkSent, PaymentRegistered, RegisterPayment,
};
pub use manual::{
    MAX_NOTES_LEN, ManualInvoice, ManualInvoiceRequest, build_manual_invoice, issue_manual_invoice,
};
pub use number::{deterministic_invoice_number, partner_prefix, random_invoice_number};
pub use store::{BatchInsertReport, InMemoryInvoiceStore, InvoiceStore};
