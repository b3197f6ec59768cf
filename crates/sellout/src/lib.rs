//! Sell-out processing: validate imported sales rows and turn them into
//! rated lines (royalty, ad-fund, tax, USD conversion).
//!
//! Rating is a pure function of the lines and the country rate table.

pub mod charges;
pub mod import;
pub mod line;
pub mod processor;
pub mod table;

pub use charges::Charges;
pub use import::{SELL_OUT_COLUMNS, parse_sell_out, read_sell_out};
pub use line::{RatedLine, SellOutLine};
pub use processor::{rate_line, rate_lines};
pub use table::{ImportError, RecordTable};
