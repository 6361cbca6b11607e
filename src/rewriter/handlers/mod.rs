//! The concrete handlers a [`crate::rewriter::Pipeline`] is assembled from.
//!
//! | Handler                                     | Kind              | Rewrites |
//! |---------------------------------------------|-------------------|----------|
//! | [`ArchitectureRewriter`]                    | environment       | header   |
//! | [`MethodParentRewriter`]                    | rewriter          | yes      |
//! | [`ReferenceRewriter`]                       | rewriter          | yes      |
//! | [`HeuristicFieldRewriter`]                  | rewriter          | yes      |
//! | [`HarmonyRewriter`]                         | version finder    | optional |
//! | [`ReferenceToMissingMemberFinder`]          | heuristic finder  | no       |
//! | [`ReferenceToMemberWithUnexpectedTypeFinder`] | heuristic finder | no      |
//! | [`TypeFinder`], [`FieldFinder`], [`EventFinder`] | capability finder | no |

mod architecture;
mod facade;
mod finders;
mod harmony;
mod heuristic_field;
mod missing_member;
mod reference;

pub use architecture::ArchitectureRewriter;
pub use facade::MethodParentRewriter;
pub use finders::{EventFinder, FieldFinder, TypeFinder};
pub use harmony::HarmonyRewriter;
pub use heuristic_field::HeuristicFieldRewriter;
pub use missing_member::{ReferenceToMemberWithUnexpectedTypeFinder, ReferenceToMissingMemberFinder};
pub use reference::ReferenceRewriter;
