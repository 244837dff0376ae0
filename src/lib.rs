pub mod builders;
pub mod core;
pub mod reports;
