//! Message validation implementation.
//!
//! Pure rules plus the default composite validator applied by the ingress
//! service after normalization.

pub mod rules;
pub mod service;

pub use service::DefaultSchemaValidator;
