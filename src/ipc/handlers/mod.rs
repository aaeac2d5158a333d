pub mod approvals;
pub mod clearance;
pub mod core;
pub mod finance;
pub mod hall;
pub mod identity;
pub mod records;
pub mod setup;
