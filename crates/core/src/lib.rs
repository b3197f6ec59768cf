//! `royaltyhub-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, Event};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BatchId, CountryCode, InvoiceNumber};
pub use money::{MONEY_TOLERANCE, amounts_match, round_money, within_tolerance};
pub use value_object::ValueObject;
