//! Domain types shared across Arcana services.
//!
//! Pure types with no framework dependencies. Import in `usecase/` and
//! `domain/` layers; never depend on `infra/` from here.

pub mod id;
pub mod subject;
