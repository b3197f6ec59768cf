//! Country rate table: royalty, ad-fund and tax rates per country (and
//! optionally per store), plus currency conversion inputs.
//!
//! The table is configuration: loaded from a JSON settings file and read-only
//! to the calculation code.

pub mod country;
pub mod exchange;
pub mod settings;

pub use country::{CountryRate, EffectiveRates, RateTable, StoreRate, DEFAULT_STORE_KEY};
pub use exchange::{
    ExchangeRateSource, LOOKBACK_DAYS, RateLookupError, StaticRateSource, lookup_with_lookback,
    resolve_exchange_rate,
};
pub use settings::{SETTINGS_PATH_ENV, SettingsError, default_settings_path};
