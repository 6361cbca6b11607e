//! Assembling the ordered handler list and running it over modules.

use std::sync::Arc;

use log::debug;
use rayon::prelude::*;

use crate::{
    metadata::BinaryModule,
    rewriter::{
        classification::{Classification, SeverityPolicy},
        config::PipelineConfig,
        handler::Handler,
        handlers::{
            ArchitectureRewriter, EventFinder, FieldFinder, HarmonyRewriter,
            HeuristicFieldRewriter, MethodParentRewriter, ReferenceRewriter,
            ReferenceToMemberWithUnexpectedTypeFinder, ReferenceToMissingMemberFinder,
            TypeFinder,
        },
        pass::RewritePass,
        report::RewriteReport,
    },
    Result,
};

/// Builds a [`Pipeline`] from a [`PipelineConfig`].
///
/// The handler order is fixed and depends only on the configuration:
///
/// 1. architecture rewriter (rewrite mode only)
/// 2. facade, exact reference and heuristic field rewriters (rewrite mode only)
/// 3. Harmony handler, rewriting or detect-only
/// 4. missing member, unexpected type, save serializer, unvalidated event and dynamic
///    finders
/// 5. console, filesystem and shell finders (paranoid mode only)
///
/// # Examples
///
/// ```rust
/// use dotshim::rewriter::{PipelineBuilder, PipelineConfig};
///
/// let pipeline = PipelineBuilder::new(PipelineConfig::detect_only().with_paranoid(true))
///     .build()?;
/// assert!(pipeline.handler_names().contains(&"console-finder"));
/// # Ok::<(), dotshim::Error>(())
/// ```
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Starts a builder for `config`
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        PipelineBuilder { config }
    }

    /// Validates the configuration and instantiates the handlers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidMapping`] if the rewrite mappings chain into each
    /// other.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config;
        config.mappings.validate()?;

        let rewrite = config.rewrite_enabled;
        let mut handlers: Vec<Box<dyn Handler>> = Vec::new();

        if rewrite {
            handlers.push(Box::new(ArchitectureRewriter::new(config.target_width)));
            handlers.push(Box::new(MethodParentRewriter::new(Arc::clone(
                &config.mappings,
            ))));
            handlers.push(Box::new(ReferenceRewriter::new(Arc::clone(
                &config.mappings,
            ))));
            handlers.push(Box::new(HeuristicFieldRewriter::new(
                Arc::clone(&config.trusted_origins),
                Arc::clone(&config.host),
            )));
        }
        handlers.push(Box::new(HarmonyRewriter::new(
            Arc::clone(&config.harmony),
            rewrite,
        )));

        let rules = &config.detection;
        handlers.push(Box::new(ReferenceToMissingMemberFinder::new(
            Arc::clone(&config.trusted_origins),
            Arc::clone(&config.host),
        )));
        handlers.push(Box::new(ReferenceToMemberWithUnexpectedTypeFinder::new(
            Arc::clone(&config.trusted_origins),
            Arc::clone(&config.host),
        )));
        handlers.push(Box::new(FieldFinder::new(
            "save-serializer-finder",
            rules.save_serializer_type.clone(),
            rules.save_serializer_fields.iter().cloned(),
            Classification::DetectedSaveSerializerAccess,
        )));
        handlers.push(Box::new(EventFinder::new(
            "unvalidated-event-finder",
            rules.unvalidated_event_type.clone(),
            rules.unvalidated_events.iter().cloned(),
            Classification::DetectedUnvalidatedEventAccess,
        )));
        handlers.push(Box::new(TypeFinder::new(
            "dynamic-finder",
            rules.dynamic_types.iter().cloned(),
            Classification::DetectedDynamic,
        )));

        if config.paranoid_mode {
            handlers.push(Box::new(TypeFinder::new(
                "console-finder",
                rules.console_types.iter().cloned(),
                Classification::DetectedConsoleAccess,
            )));
            handlers.push(Box::new(TypeFinder::new(
                "filesystem-finder",
                rules.filesystem_types.iter().cloned(),
                Classification::DetectedFilesystemAccess,
            )));
            handlers.push(Box::new(TypeFinder::new(
                "shell-finder",
                rules.shell_types.iter().cloned(),
                Classification::DetectedShellAccess,
            )));
        }

        debug!(
            "Built pipeline (rewrite: {}, paranoid: {}) with {} handlers",
            rewrite,
            config.paranoid_mode,
            handlers.len()
        );

        Ok(Pipeline {
            handlers,
            policy: config.severity_policy,
        })
    }
}

/// An ordered, immutable list of handlers.
///
/// A pipeline is `Send + Sync` and can be shared by any number of concurrent passes, each
/// over a different module.
pub struct Pipeline {
    handlers: Vec<Box<dyn Handler>>,
    policy: SeverityPolicy,
}

impl Pipeline {
    /// Handler names in execution order
    #[must_use]
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// The handlers in execution order
    #[must_use]
    pub fn handlers(&self) -> &[Box<dyn Handler>] {
        &self.handlers
    }

    /// The severity policy reports are aggregated with
    #[must_use]
    pub fn policy(&self) -> &SeverityPolicy {
        &self.policy
    }

    /// Runs one pass over `module`, rewriting it in place.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the module's code cannot be decoded; the
    /// module is left untouched.
    pub fn rewrite(&self, module: &mut BinaryModule) -> Result<RewriteReport> {
        RewritePass::new(&self.handlers, &self.policy).run(module)
    }

    /// Runs independent passes over many modules in parallel.
    ///
    /// Results are returned in the order of `modules`; one failing module does not affect
    /// the others.
    pub fn rewrite_all(&self, modules: &mut [BinaryModule]) -> Vec<Result<RewriteReport>> {
        modules
            .par_iter_mut()
            .map(|module| self.rewrite(module))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{MemberRef, TypeRef},
        rewriter::config::RewriteMappings,
        Error,
    };

    #[test]
    fn rewrite_mode_order() {
        let pipeline = PipelineBuilder::new(PipelineConfig::default()).build().unwrap();
        assert_eq!(
            pipeline.handler_names(),
            vec![
                "architecture",
                "facade-rewriter",
                "reference-rewriter",
                "heuristic-field-rewriter",
                "harmony-rewriter",
                "missing-member-finder",
                "unexpected-type-finder",
                "save-serializer-finder",
                "unvalidated-event-finder",
                "dynamic-finder",
            ]
        );
    }

    #[test]
    fn detect_only_paranoid_order() {
        let pipeline = PipelineBuilder::new(PipelineConfig::detect_only().with_paranoid(true))
            .build()
            .unwrap();
        assert_eq!(
            pipeline.handler_names(),
            vec![
                "harmony-finder",
                "missing-member-finder",
                "unexpected-type-finder",
                "save-serializer-finder",
                "unvalidated-event-finder",
                "dynamic-finder",
                "console-finder",
                "filesystem-finder",
                "shell-finder",
            ]
        );
    }

    #[test]
    fn chained_mappings_are_rejected() {
        let a = MemberRef::field(TypeRef::new("StardewValley", "A"), "x", "System.Int32");
        let mappings = RewriteMappings::new()
            .with_type("A", TypeRef::new("StardewValley", "B"))
            .with_type("B", TypeRef::new("StardewValley", "C"))
            .with_member(&a, TypeRef::new("StardewValley", "D"), "y");

        let result = PipelineBuilder::new(PipelineConfig::new().with_mappings(mappings)).build();
        assert!(matches!(result, Err(Error::InvalidMapping(_))));
    }

    #[test]
    fn pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }
}
