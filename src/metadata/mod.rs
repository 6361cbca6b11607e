//! Metadata model of a loaded extension module.
//!
//! This module holds everything the rewrite pipeline knows about a module besides its
//! instruction streams: the tokens used by CIL operands, the symbolic references they
//! resolve to, the interning reference table, the module header, and the catalog of
//! what the host binaries actually declare.
//!
//! # Key Components
//!
//! - [`token`] - Metadata tokens as they appear in CIL operands
//! - [`reference`] - Fully qualified type and member references
//! - [`table`] - The module's interning reference table
//! - [`module`] - [`BinaryModule`], its header and method definitions
//! - [`container`] - Serialized form of a [`BinaryModule`]
//! - [`host`] - [`HostCatalog`] describing the loaded host binaries
//!
//! # Examples
//!
//! ```rust
//! use dotshim::metadata::{BinaryModule, MemberRef, ModuleHeader, ReferenceTable, TypeRef};
//!
//! let mut references = ReferenceTable::new();
//! let console = TypeRef::new("System.Console", "System.Console");
//! let token = references.intern_type(&console)?;
//!
//! let module = BinaryModule::new("ExampleMod", ModuleHeader::any_cpu(), references);
//! assert_eq!(module.references().type_count(), 1);
//! assert_eq!(token.row(), 1);
//! # let _ = MemberRef::field(console, "Out", "System.IO.TextWriter");
//! # Ok::<(), dotshim::Error>(())
//! ```

/// Serialized container form of a module
pub mod container;
/// Catalog of types and members declared by the host binaries
pub mod host;
/// Binary module, header flags and method definitions
pub mod module;
/// Symbolic type and member references
pub mod reference;
/// Interning table of external references
pub mod table;
/// Commonly used metadata token type
pub mod token;

pub use host::{
    HostCatalog, HostCatalogBuilder, HostField, HostMethod, HostProperty, HostType, Resolution,
};
pub use module::{BinaryModule, CorFlags, Machine, MethodDef, ModuleHeader, TargetWidth};
pub use reference::{MemberRef, Signature, SymbolicReference, TypeRef, VOID_TYPE};
pub use table::ReferenceTable;
pub use token::{TableId, Token};
