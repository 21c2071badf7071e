//! Core types for Nestor

mod entry;
mod filter;
mod search;

pub use entry::*;
pub use filter::*;
pub use search::*;
