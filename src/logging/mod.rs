// file: src/logging/mod.rs
// version: 1.0.0
// guid: 043a866b-1ef4-4b44-901a-cf1ec3d20ad7

//! Logging system for the LLMOS installer

pub mod logger;

pub use logger::init_logger;
