//! Infrastructure layer: stores, the fail-closed evaluator and the
//! provisioning workflows built on top of them.

pub mod bootstrap;
pub mod config;
pub mod evaluator;
pub mod invitations;
pub mod reconcile;
pub mod store;
pub mod tenants;


pub use bootstrap::{SeedReport, seed};
pub use config::WorkflowConfig;
pub use evaluator::Evaluator;
pub use invitations::{
    AccessChange, CreateInvitation, EditAccess, InvitationWorkflow, Invitee, IssuedInvitation,
    RedeemInvitation, Redemption,
};
pub use reconcile::{expire_stale_invitations, reap_orphaned_roles};
pub use store::{AuthzStore, ClientRecord, InMemoryAuthzStore};
pub use tenants::{ProvisionedTenant, TenantService};
