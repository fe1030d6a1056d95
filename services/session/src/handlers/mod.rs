pub mod health;
pub mod quota;
pub mod token;
pub mod verification;
