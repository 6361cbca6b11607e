// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotshim
//!
//! A load-time compatibility layer for .NET plugin modules.
//!
//! Before a host loads a third-party module, `dotshim` walks every CIL instruction of the
//! module's method bodies through an ordered pipeline of handlers. Rewriters redirect
//! references to host members that moved, were renamed, or were replaced by facades or
//! properties; finders report references that cannot work against the loaded host and
//! uses of sensitive capabilities. The result is a rewritten module plus a
//! [`rewriter::RewriteReport`] telling the host whether the module may be loaded.
//!
//! ## Features
//!
//! - **Exact and facade rewriting** - Member, type and facade mappings, applied without
//!   changing instruction sizes or operand stack shapes
//! - **Heuristic repairs** - Field accesses to host fields that became properties
//! - **Broken reference detection** - References into trusted host assemblies checked
//!   against a catalog of what the host actually declares
//! - **Capability detection** - Console, filesystem, process, serializer and event access
//! - **Architecture adaptation** - IL-only 32-bit images adapted to 64-bit hosts
//! - **Parallel batches** - Independent modules processed concurrently
//!
//! ## Quick Start
//!
//! ```rust
//! use dotshim::prelude::*;
//!
//! let host = HostCatalog::builder()
//!     .with_type(
//!         "StardewValley",
//!         HostType::new("StardewValley.Game1").field("player", "StardewValley.Farmer"),
//!     )
//!     .build();
//!
//! let pipeline = PipelineBuilder::new(PipelineConfig::new().with_host(host)).build()?;
//!
//! // ldsfld StardewValley.Game1::removedField; ret
//! let mut references = ReferenceTable::new();
//! let token = references.intern_member(&MemberRef::field(
//!     TypeRef::new("StardewValley", "StardewValley.Game1"),
//!     "removedField",
//!     "System.Int32",
//! ))?;
//! let mut code = vec![0x7E];
//! code.extend_from_slice(&token.value().to_le_bytes());
//! code.push(0x2A);
//!
//! let mut module = BinaryModule::new("SomeMod", ModuleHeader::any_cpu(), references);
//! module.add_method(MethodDef::new("SomeMod.ModEntry", "Entry", code));
//!
//! let report = pipeline.rewrite(&mut module)?;
//! assert!(report.has(Classification::DetectedBrokenReference));
//! assert!(!report.may_load());
//! # Ok::<(), dotshim::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - Modules, symbolic references, reference tables and the host catalog
//! - [`assembly`] - CIL opcodes, instruction decoding and encoding
//! - [`rewriter`] - Handlers, the pipeline, rewrite passes and reports
//! - [`prelude`] - Convenient re-exports of the commonly used types
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Only a module that cannot be decoded aborts a pass; everything a handler runs into is
//! recorded in the report instead:
//!
//! ```rust
//! use dotshim::{metadata::BinaryModule, Error};
//!
//! match BinaryModule::from_bytes(b"not a module") {
//!     Ok(module) => println!("Loaded {}", module.name()),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! `dotshim` logs through the [`log`](https://docs.rs/log) facade: one `info` summary per
//! module, `debug` for every handler decision, `trace` for individual rewrites and `warn`
//! for handler failures and rejected modules. No logger is installed by the library.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run module_container --release
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotshim::prelude::*;
///
/// let pipeline = PipelineBuilder::new(PipelineConfig::detect_only()).build()?;
/// assert!(!pipeline.handler_names().is_empty());
/// # Ok::<(), dotshim::Error>(())
/// ```
pub mod prelude;

/// Modules, references and the host catalog
///
/// # Key Components
///
/// - [`metadata::BinaryModule`] - A module as handed over by the host's loader
/// - [`metadata::SymbolicReference`] - Fully qualified targets of token operands
/// - [`metadata::ReferenceTable`] - The module's `TypeRef` / `MemberRef` rows
/// - [`metadata::HostCatalog`] - What the loaded host binaries declare
/// - [`metadata::Token`] - Metadata tokens
pub mod metadata;

/// CIL instructions based on ECMA-335
///
/// Decoding of method bodies into [`assembly::Instruction`]s and encoding them back.
/// Rewritten instructions always have the encoded size of the instruction they
/// replace, so branch offsets never need to be patched.
pub mod assembly;

/// The rewrite pipeline
///
/// See [`rewriter::PipelineBuilder`] for the handler order and [`rewriter::RewriteReport`]
/// for the result of a pass.
pub mod rewriter;

/// `dotshim` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotshim` Error type
///
/// # Examples
///
/// ```rust
/// use dotshim::{metadata::BinaryModule, Error};
///
/// let error = BinaryModule::from_bytes(&[]).unwrap_err();
/// assert!(matches!(error, Error::Empty | Error::Malformed { .. }));
/// ```
pub use error::Error;

/// Bounds-checked reader over raw bytes, used by the decoder and the module container.
///
/// # Example
///
/// ```rust
/// use dotshim::Parser;
///
/// let mut parser = Parser::new(&[0x2A, 0x00]);
/// assert_eq!(parser.read_le::<u8>()?, 0x2A);
/// # Ok::<(), dotshim::Error>(())
/// ```
pub use file::parser::Parser;
