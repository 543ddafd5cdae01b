pub mod headers;
pub mod tenant;

pub use tenant::{resolve_tenant, TenantContext};
