//! Shared cryptographic helpers for the social-api workspace.
//!
//! - `jwt`: RS256 access token issuance and validation
//! - `hash`: digest helpers used for request signing

pub mod hash;
pub mod jwt;

pub use jwt::{Claims, JwtKeys};
