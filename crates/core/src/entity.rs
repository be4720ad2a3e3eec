//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every row kept by the authorization stores (tenants, principals, roles,
/// permissions, invitations, client records) is an entity keyed by its id.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
