//! Low-level byte access for module containers and CIL method bodies.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser`] - Cursor-based, bounds-checked reader
//! - [`crate::file::io`] - Little-endian primitive conversion and compressed integer encoding

pub mod io;
pub mod parser;
