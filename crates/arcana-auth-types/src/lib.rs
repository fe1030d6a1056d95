//! Auth types shared across Arcana services.
//!
//! Provides credential claims, uniform token validation, and the `BearerToken` extractor.

pub mod identity;
pub mod token;
