//! Framework-agnostic business rules: status state machines, bonus tier
//! lookup, and loyalty tier math. No sqlx or axum types in here.

pub mod booking;
pub mod card;
pub mod tier;
pub mod topup;
