// src/store/models/mod.rs

//! Record types backed by the store's tables.

mod mod_file;
mod mod_unit;

pub use mod_file::ModFile;
pub use mod_unit::ModUnit;
