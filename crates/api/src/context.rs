use tenantgate_core::PrincipalId;

/// Principal context for a request (authenticated identity only).
///
/// Tenant affiliation and roles are never taken from the token; handlers ask
/// the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId) -> Self {
        Self { principal_id }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }
}
