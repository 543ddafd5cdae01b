pub mod credential;
pub mod validation;

pub use credential::{CredentialInput, CredentialView, TenantCredential, TenantId};
pub use validation::{validate_payload, FieldError};
