//! Application services: fetching, rendering and serving documents.

pub mod document;
pub mod error;
pub mod fetch;
pub mod render;
pub mod source;
