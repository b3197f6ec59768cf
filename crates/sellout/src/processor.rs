//! Sell-out line processor: applies the country rate table to raw lines.

use tracing::debug;

use royaltyhub_core::DomainResult;
use royaltyhub_rates::RateTable;

use crate::charges::Charges;
use crate::line::{RatedLine, SellOutLine};

/// Rate a single line. Fails with `UnknownCountry` when the line's country has
/// no entry in the table.
pub fn rate_line(line: SellOutLine, table: &RateTable) -> DomainResult<RatedLine> {
    let rates = table.effective_rates(&line.country, line.store.as_deref())?;
    let charges = Charges::compute(line.amount, &rates)?;
    Ok(RatedLine::new(line, rates, charges))
}

/// Rate every line. All-or-nothing: the first unknown country fails the call
/// and no rated lines are returned.
pub fn rate_lines(
    lines: impl IntoIterator<Item = SellOutLine>,
    table: &RateTable,
) -> DomainResult<Vec<RatedLine>> {
    let rated = lines
        .into_iter()
        .map(|line| rate_line(line, table))
        .collect::<DomainResult<Vec<_>>>()?;
    debug!(lines = rated.len(), "rated sell-out lines");
    Ok(rated)
}
