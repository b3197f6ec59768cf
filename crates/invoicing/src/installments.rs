//! Installment scheduling.
//!
//! Splits an invoice total into `count` payments spaced `gap_days` apart.
//! A schedule whose amounts do not add up to the total (within one cent) is
//! still produced; the mismatch comes back as a warning.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use royaltyhub_core::{
    DomainError, DomainResult, MONEY_TOLERANCE, ValueObject, round_money, within_tolerance,
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Upper bound on installments per invoice (ten years of monthly payments).
pub const MAX_INSTALLMENTS: u32 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "percentages", rename_all = "snake_case")]
pub enum Distribution {
    /// Same amount per installment; the last one absorbs rounding.
    Equal,
    /// One percentage (0..100) per installment.
    Percentage(Vec<Decimal>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub count: u32,
    pub first_due_date: NaiveDate,
    pub gap_days: u32,
    pub distribution: Distribution,
}

impl InstallmentPlan {
    pub fn equal(count: u32, first_due_date: NaiveDate, gap_days: u32) -> Self {
        Self {
            count,
            first_due_date,
            gap_days,
            distribution: Distribution::Equal,
        }
    }

    pub fn percentage(first_due_date: NaiveDate, gap_days: u32, percentages: Vec<Decimal>) -> Self {
        Self {
            count: u32::try_from(percentages.len()).unwrap_or(u32::MAX),
            first_due_date,
            gap_days,
            distribution: Distribution::Percentage(percentages),
        }
    }

    fn due_date(&self, index: u32) -> DomainResult<NaiveDate> {
        let offset = u64::from(index) * u64::from(self.gap_days);
        self.first_due_date
            .checked_add_days(Days::new(offset))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "installment {} falls {offset} days after {}, outside the calendar",
                    index + 1,
                    self.first_due_date
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based.
    pub number: u32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

impl ValueObject for Installment {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallmentSchedule {
    pub installments: Vec<Installment>,
    pub warning: Option<String>,
}

impl InstallmentSchedule {
    pub fn total(&self) -> Decimal {
        self.installments.iter().map(|i| i.amount).sum()
    }
}

pub fn schedule_installments(
    total: Decimal,
    plan: &InstallmentPlan,
) -> DomainResult<InstallmentSchedule> {
    if plan.count == 0 {
        return Err(DomainError::validation("installment count must be at least 1"));
    }
    if plan.count > MAX_INSTALLMENTS {
        return Err(DomainError::validation(format!(
            "installment count {} exceeds the maximum of {MAX_INSTALLMENTS}",
            plan.count
        )));
    }

    let amounts = match &plan.distribution {
        Distribution::Equal => equal_amounts(total, plan.count)?,
        Distribution::Percentage(percentages) => {
            if percentages.len() != plan.count as usize {
                return Err(DomainError::validation(format!(
                    "expected {} percentages, got {}",
                    plan.count,
                    percentages.len()
                )));
            }
            percentage_amounts(total, &normalize_percentages(percentages)?)?
        }
    };

    let installments: Vec<Installment> = amounts
        .into_iter()
        .zip(0u32..)
        .map(|(amount, index)| {
            Ok(Installment {
                number: index + 1,
                due_date: plan.due_date(index)?,
                amount,
            })
        })
        .collect::<DomainResult<_>>()?;

    let sum: Decimal = installments.iter().map(|i| i.amount).sum();
    let warning = if within_tolerance(sum, total) {
        None
    } else {
        warn!(%sum, %total, tolerance = %MONEY_TOLERANCE, "installment amounts do not add up to invoice total");
        Some(format!(
            "installments sum to {sum} but the invoice total is {total}"
        ))
    };

    Ok(InstallmentSchedule {
        installments,
        warning,
    })
}

fn equal_amounts(total: Decimal, count: u32) -> DomainResult<Vec<Decimal>> {
    let share = total
        .checked_div(Decimal::from(count))
        .map(round_money)
        .ok_or_else(|| DomainError::invariant("installment share overflow"))?;

    let mut amounts = vec![share; count as usize];
    let allocated = share * Decimal::from(count - 1);
    if let Some(last) = amounts.last_mut() {
        *last = total - allocated;
    }
    Ok(amounts)
}

/// The last percentage absorbs any deviation from 100 beyond 0.01.
fn normalize_percentages(percentages: &[Decimal]) -> DomainResult<Vec<Decimal>> {
    let mut normalized = percentages.to_vec();
    let sum: Decimal = normalized.iter().copied().sum();
    if (sum - HUNDRED).abs() > MONEY_TOLERANCE {
        if let Some(last) = normalized.last_mut() {
            *last += HUNDRED - sum;
        }
    }

    if let Some(bad) = normalized.iter().find(|p| **p < Decimal::ZERO) {
        return Err(DomainError::validation(format!(
            "installment percentage cannot be negative after normalization, got {bad}"
        )));
    }
    Ok(normalized)
}

fn percentage_amounts(total: Decimal, percentages: &[Decimal]) -> DomainResult<Vec<Decimal>> {
    percentages
        .iter()
        .map(|pct| {
            total
                .checked_mul(*pct)
                .and_then(|v| v.checked_div(HUNDRED))
                .map(round_money)
                .ok_or_else(|| DomainError::invariant("installment amount overflow"))
        })
        .collect()
}
