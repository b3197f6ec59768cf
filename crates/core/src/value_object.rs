//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Rate sets, installments and match candidates carry no identity of their
/// own; two instances with the same fields are interchangeable. Value objects
/// are immutable once built: "changing" one means building a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
