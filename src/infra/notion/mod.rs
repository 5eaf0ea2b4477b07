//! Adapter for the Notion-style block API.
//!
//! Lists block children with `GET /v1/blocks/{id}/children` and reads page properties with
//! `GET /v1/pages/{id}`, authenticating with a bearer token and a pinned API version header.

mod client;
mod parser;

pub use client::NotionClient;
