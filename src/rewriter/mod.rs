//! Rewriting modules against the loaded host and reporting what was found.
//!
//! A [`Pipeline`] is an ordered list of [`Handler`]s assembled once from a
//! [`PipelineConfig`]. Running it over a [`crate::metadata::BinaryModule`] decodes every
//! method body, lets each handler examine each instruction in turn, applies the
//! rewrites they return, re-encodes the changed bodies and aggregates all
//! classifications into a [`RewriteReport`].
//!
//! # Examples
//!
//! ```rust
//! use dotshim::metadata::{BinaryModule, ModuleHeader, ReferenceTable};
//! use dotshim::rewriter::{PipelineBuilder, PipelineConfig};
//!
//! let pipeline = PipelineBuilder::new(PipelineConfig::default()).build()?;
//!
//! let mut module = BinaryModule::new("EmptyMod", ModuleHeader::any_cpu(), ReferenceTable::new());
//! let report = pipeline.rewrite(&mut module)?;
//!
//! assert!(report.is_empty());
//! assert!(report.may_load());
//! # Ok::<(), dotshim::Error>(())
//! ```

mod classification;
mod config;
mod handler;
pub mod handlers;
mod pass;
mod pipeline;
mod report;

pub use classification::{Classification, Severity, SeverityPolicy};
pub use config::{
    DetectionRules, FacadeMapping, FacadeMember, HarmonyShims, MemberTarget, PipelineConfig,
    RewriteMappings, TrustedOrigins,
};
pub use handler::{Handler, HandlerContext, HandlerKind, ModuleOutcome, Outcome};
pub use pass::{PassState, RewritePass};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use report::{ClassificationRecord, Location, RewriteReport};
