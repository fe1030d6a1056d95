//! sea-orm entities owned by the session service.

pub mod subjects;
