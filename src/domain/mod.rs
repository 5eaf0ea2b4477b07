//! Domain layer types and invariants.

pub mod blocks;
pub mod error;
pub mod ids;
pub mod rich_text;
