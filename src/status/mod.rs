// src/status/mod.rs
mod table;

pub use table::{Status, StatusTable};
