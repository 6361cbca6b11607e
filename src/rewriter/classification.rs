//! Classifications handlers attach to instructions or modules, and the policy mapping
//! them to severities.

use std::collections::HashMap;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A diagnostic outcome recorded by a handler.
///
/// The string forms (`detected-console-access`, ...) are stable and meant for operator
/// logs and host configuration files.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Classification {
    /// An instruction or the module header was rewritten
    Rewritten,
    /// Access to the host's internal save serializer fields
    DetectedSaveSerializerAccess,
    /// Subscription to an event hook raised without validation
    DetectedUnvalidatedEventAccess,
    /// Direct console access
    DetectedConsoleAccess,
    /// Direct filesystem access
    DetectedFilesystemAccess,
    /// Process spawning
    DetectedShellAccess,
    /// A trusted reference that does not exist in the loaded host
    DetectedBrokenReference,
    /// A trusted reference whose type differs from what the host declares
    DetectedTypeMismatch,
    /// A runtime patching library version the host no longer supports
    DetectedUnsupportedHarmonyVersion,
    /// A facade target with an incompatible call shape
    DetectedIncompatibleFacade,
    /// The module patches host code at runtime
    DetectedGamePatch,
    /// The module uses late-bound `dynamic` call sites
    DetectedDynamic,
    /// The module header could not be adapted to the host's processor width
    ArchitectureRewriteFailed,
    /// A handler failed or produced an invalid rewrite
    HandlerFailure,
}

impl Classification {
    /// Returns `true` for classifications produced by detection rather than rewriting
    #[must_use]
    pub fn is_detection(self) -> bool {
        !matches!(
            self,
            Classification::Rewritten
                | Classification::ArchitectureRewriteFailed
                | Classification::HandlerFailure
        )
    }
}

/// How serious a classification is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Severity {
    /// Something was fixed up
    RewriteSuccess,
    /// Worth mentioning to the operator
    Informational,
    /// The module may misbehave or does something sensitive
    Warning,
    /// The module must not be loaded
    Blocking,
}

/// Maps every [`Classification`] to a [`Severity`].
///
/// Hosts can override individual entries, except that
/// [`Classification::ArchitectureRewriteFailed`] is always [`Severity::Blocking`]: a
/// module cannot run at the wrong processor width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityPolicy {
    overrides: HashMap<Classification, Severity>,
}

impl SeverityPolicy {
    /// The default policy
    #[must_use]
    pub fn new() -> Self {
        SeverityPolicy {
            overrides: HashMap::new(),
        }
    }

    /// Default severity of a classification when no override exists
    #[must_use]
    pub fn default_severity(classification: Classification) -> Severity {
        match classification {
            Classification::Rewritten => Severity::RewriteSuccess,
            Classification::DetectedGamePatch | Classification::DetectedConsoleAccess => {
                Severity::Informational
            }
            Classification::DetectedSaveSerializerAccess
            | Classification::DetectedUnvalidatedEventAccess
            | Classification::DetectedFilesystemAccess
            | Classification::DetectedShellAccess
            | Classification::DetectedDynamic => Severity::Warning,
            Classification::DetectedBrokenReference
            | Classification::DetectedTypeMismatch
            | Classification::DetectedUnsupportedHarmonyVersion
            | Classification::DetectedIncompatibleFacade
            | Classification::ArchitectureRewriteFailed
            | Classification::HandlerFailure => Severity::Blocking,
        }
    }

    /// Overrides the severity of one classification
    #[must_use]
    pub fn with_severity(mut self, classification: Classification, severity: Severity) -> Self {
        self.overrides.insert(classification, severity);
        self
    }

    /// Treats every detection classification as at most a warning, for hosts that only
    /// want to report
    #[must_use]
    pub fn permissive() -> Self {
        Classification::iter()
            .filter(|c| c.is_detection())
            .filter(|c| Self::default_severity(*c) == Severity::Blocking)
            .fold(Self::new(), |policy, c| {
                policy.with_severity(c, Severity::Warning)
            })
    }

    /// Severity of a classification under this policy
    #[must_use]
    pub fn severity(&self, classification: Classification) -> Severity {
        if classification == Classification::ArchitectureRewriteFailed {
            return Severity::Blocking;
        }

        self.overrides
            .get(&classification)
            .copied()
            .unwrap_or_else(|| Self::default_severity(classification))
    }
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self::new()
    }
}
