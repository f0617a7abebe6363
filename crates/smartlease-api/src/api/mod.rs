pub mod health;
pub mod properties;
pub mod search;
