//! Value object marker: equality by value, never by identity.

/// Marker trait for immutable values compared by their attributes.
///
/// Claims snapshots and plan identifiers are value objects: a refresh never
/// edits one in place, it produces a new value that replaces the old one for
/// the rest of the request.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct PlanId(String);
///
/// impl ValueObject for PlanId {}
///
/// assert_eq!(PlanId("Enterprise".into()), PlanId("Enterprise".into()));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
