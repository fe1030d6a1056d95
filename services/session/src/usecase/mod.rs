pub mod credential;
pub mod quota;
pub mod session;
pub mod verification;
