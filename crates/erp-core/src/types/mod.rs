//! Core type definitions used across the ERP workspace.

pub mod id;

pub use id::*;
