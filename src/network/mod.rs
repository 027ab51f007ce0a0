// file: src/network/mod.rs
// version: 1.0.0
// guid: d720b4ad-5e0f-40a2-99f9-d77cdebf9e51

//! Network access for remote configuration sources

pub mod download;

pub use download::ConfigFetcher;
