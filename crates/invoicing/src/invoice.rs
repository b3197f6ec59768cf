use chrono::{DateTime, Duration, Month, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use royaltyhub_core::{
    Aggregate, CountryCode, DomainError, Entity, Event, InvoiceNumber, ValueObject,
};
use royaltyhub_sellout::Charges;

use crate::installments::Installment;

/// Days after the issue date an invoice falls due when no due date or
/// installment plan says otherwise.
pub const DEFAULT_PAYMENT_TERM_DAYS: i64 = 30;

/// Derived lifecycle status for a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Generated,
    Sent,
    Paid,
    Overdue,
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            InvoiceStatus::Generated => "Generated",
            InvoiceStatus::Sent => "Sent",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Overdue => "Overdue",
        })
    }
}

/// Derived due status: not stored, computed from payment state and due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DueStatus {
    Pending,
    Overdue,
    Settled,
}

impl core::fmt::Display for DueStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DueStatus::Pending => "Pending",
            DueStatus::Overdue => "Overdue",
            DueStatus::Settled => "Settled",
        })
    }
}

/// Billing dimensions and amounts of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    pub partner: String,
    pub country: CountryCode,
    pub year: i32,
    /// 1..=12
    pub month: u32,
    pub total_sell_out: Decimal,
    /// Display rate; the mean over lines when aggregated.
    pub royalty_rate: Decimal,
    pub ad_fund_rate: Decimal,
    pub tax_rate: Decimal,
    pub charges: Charges,
    pub currency: String,
    pub exchange_rate: Decimal,
}

impl ValueObject for InvoiceDetails {}

impl InvoiceDetails {
    /// English month name ("October"); empty for an out-of-range month.
    pub fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("")
    }

    /// "October 2023"
    pub fn period_label(&self) -> String {
        format!("{} {}", self.month_name(), self.year)
    }
}

/// Invoice record.
///
/// Billing data is fixed at generation; payment state changes only through
/// [`InvoiceCommand`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    number: InvoiceNumber,
    details: InvoiceDetails,
    created_at: DateTime<Utc>,
    issue_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    installments: Option<Vec<Installment>>,
    notes: Option<String>,
    sent: bool,
    paid: bool,
    payment_amount: Decimal,
    payment_date: Option<NaiveDate>,
    version: u64,
}

impl Invoice {
    pub fn new(number: InvoiceNumber, details: InvoiceDetails, created_at: DateTime<Utc>) -> Self {
        Self {
            number,
            details,
            created_at,
            issue_date: None,
            due_date: None,
            installments: None,
            notes: None,
            sent: false,
            paid: false,
            payment_amount: Decimal::ZERO,
            payment_date: None,
            version: 0,
        }
    }

    pub fn with_issue_date(mut self, issue_date: NaiveDate) -> Self {
        self.issue_date = Some(issue_date);
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_installments(mut self, installments: Vec<Installment>) -> Self {
        self.set_installments(installments);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.set_notes(notes);
        self
    }

    pub fn number(&self) -> &InvoiceNumber {
        &self.number
    }

    pub fn details(&self) -> &InvoiceDetails {
        &self.details
    }

    pub fn partner(&self) -> &str {
        &self.details.partner
    }

    pub fn country(&self) -> &CountryCode {
        &self.details.country
    }

    pub fn total_amount(&self) -> Decimal {
        self.details.charges.total_amount
    }

    pub fn currency(&self) -> &str {
        &self.details.currency
    }

    pub fn amount_usd(&self) -> Decimal {
        self.details.charges.amount_usd
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Issue date; defaults to the creation date.
    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date.unwrap_or_else(|| self.created_at.date_naive())
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Explicit due date, else the first installment's due date, else issue
    /// date plus the default payment term (clamped to the last representable day).
    pub fn effective_due_date(&self) -> NaiveDate {
        self.due_date
            .or_else(|| self.installments().first().map(|i| i.due_date))
            .unwrap_or_else(|| {
                self.issue_date()
                    .checked_add_signed(Duration::days(DEFAULT_PAYMENT_TERM_DAYS))
                    .unwrap_or(NaiveDate::MAX)
            })
    }

    pub fn installments(&self) -> &[Installment] {
        self.installments.as_deref().unwrap_or(&[])
    }

    pub fn has_installments(&self) -> bool {
        !self.installments().is_empty()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn is_paid(&self) -> bool {
        self.paid
    }

    pub fn payment_amount(&self) -> Decimal {
        self.payment_amount
    }

    pub fn payment_date(&self) -> Option<NaiveDate> {
        self.payment_date
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// `total_amount - payment_amount`; negative after an overpayment.
    pub fn remaining_amount(&self) -> Decimal {
        self.total_amount() - self.payment_amount
    }

    /// Open for matching unless flagged paid with the full amount received.
    pub fn accepts_payment(&self) -> bool {
        !(self.paid && self.payment_amount >= self.total_amount())
    }

    pub fn status_on(&self, today: NaiveDate) -> InvoiceStatus {
        if self.paid {
            InvoiceStatus::Paid
        } else if self.effective_due_date() < today {
            InvoiceStatus::Overdue
        } else if self.sent {
            InvoiceStatus::Sent
        } else {
            InvoiceStatus::Generated
        }
    }

    pub fn due_status_on(&self, today: NaiveDate) -> DueStatus {
        if self.paid {
            DueStatus::Settled
        } else if self.effective_due_date() < today {
            DueStatus::Overdue
        } else {
            DueStatus::Pending
        }
    }

    // Manual edits. Payment state only changes through commands.

    pub fn set_issue_date(&mut self, issue_date: Option<NaiveDate>) {
        self.issue_date = issue_date;
    }

    pub fn set_due_date(&mut self, due_date: Option<NaiveDate>) {
        self.due_date = due_date;
    }

    /// An empty list clears the plan.
    pub fn set_installments(&mut self, installments: Vec<Installment>) {
        self.installments = if installments.is_empty() {
            None
        } else {
            Some(installments)
        };
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() { None } else { Some(notes) };
    }
}

impl Entity for Invoice {
    type Id = InvoiceNumber;

    fn id(&self) -> &Self::Id {
        &self.number
    }
}

/// Command: RegisterPayment. Applies an amount received on `paid_on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPayment {
    pub amount: Decimal,
    pub paid_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSent {
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    RegisterPayment(RegisterPayment),
    MarkSent(MarkSent),
}

/// Event: PaymentRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRegistered {
    pub invoice_number: InvoiceNumber,
    pub amount: Decimal,
    pub new_payment_amount: Decimal,
    pub paid_on: NaiveDate,
    pub fully_paid: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSent {
    pub invoice_number: InvoiceNumber,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    PaymentRegistered(PaymentRegistered),
    InvoiceSent(InvoiceSent),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::PaymentRegistered(_) => "invoicing.invoice.payment_registered",
            InvoiceEvent::InvoiceSent(_) => "invoicing.invoice.sent",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::PaymentRegistered(e) => e.occurred_at,
            InvoiceEvent::InvoiceSent(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::PaymentRegistered(e) => {
                self.payment_amount = e.new_payment_amount;
                self.payment_date = Some(e.paid_on);
                self.paid = e.fully_paid;
            }
            InvoiceEvent::InvoiceSent(_) => {
                self.sent = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::RegisterPayment(cmd) => self.handle_register_payment(cmd),
            InvoiceCommand::MarkSent(cmd) => self.handle_mark_sent(cmd),
        }
    }
}

impl Invoice {
    fn handle_register_payment(
        &self,
        cmd: &RegisterPayment,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        if cmd.amount <= Decimal::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let new_payment_amount = self
            .payment_amount
            .checked_add(cmd.amount)
            .ok_or_else(|| DomainError::invariant("payment total overflow"))?;

        // Overpayment is accepted; paid flips once the total is covered.
        Ok(vec![InvoiceEvent::PaymentRegistered(PaymentRegistered {
            invoice_number: self.number.clone(),
            amount: cmd.amount,
            new_payment_amount,
            paid_on: cmd.paid_on,
            fully_paid: new_payment_amount >= self.total_amount(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_sent(&self, cmd: &MarkSent) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.sent {
            return Err(DomainError::conflict(format!(
                "invoice {} was already sent",
                self.number
            )));
        }

        Ok(vec![InvoiceEvent::InvoiceSent(InvoiceSent {
            invoice_number: self.number.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
