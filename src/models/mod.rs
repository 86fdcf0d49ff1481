//! Data models for the lab loan server

pub mod admin;
pub mod dashboard;
pub mod item;
pub mod loan;
pub mod report;

// Re-export commonly used types
pub use admin::{Admin, AdminClaims, AdminInfo};
pub use item::{CreateItem, Item};
pub use loan::{Loan, LoanState, LoanView, NewLoan, Transition};
