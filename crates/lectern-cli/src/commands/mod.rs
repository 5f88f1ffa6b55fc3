pub mod input;
pub mod records;
pub mod snapshots;
