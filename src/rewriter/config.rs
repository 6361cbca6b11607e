//! Configuration for the rewrite pipeline.
//!
//! Everything in here is assembled once by the host, validated by
//! [`crate::rewriter::PipelineBuilder::build`] and afterwards shared read-only (behind
//! [`Arc`]) by every handler of every pass.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    metadata::{HostCatalog, MemberRef, Signature, SymbolicReference, TargetWidth, TypeRef},
    rewriter::classification::SeverityPolicy,
    Error, Result,
};

/// Assembly names that are guaranteed to be loaded alongside every module.
///
/// References claiming to target one of these must resolve against the
/// [`HostCatalog`]; references to any other assembly are treated as expected
/// third-party calls and never flagged as broken. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedOrigins {
    names: HashSet<String>,
}

impl TrustedOrigins {
    /// Creates an allow-list from the given names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TrustedOrigins {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `origin` is on the allow-list
    #[must_use]
    pub fn contains(&self, origin: &str) -> bool {
        self.names.contains(origin)
    }

    /// Number of trusted names
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing is trusted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for TrustedOrigins {
    fn default() -> Self {
        Self::new(["StardewModdingAPI", "Stardew Valley", "StardewValley", "Netcode"])
    }
}

/// Where an exact member mapping redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberTarget {
    /// New declaring type
    pub parent: TypeRef,
    /// New member name
    pub name: String,
}

/// One member a facade type declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeMember {
    /// Member name
    pub name: String,
    /// Member shape
    pub signature: Signature,
}

/// A replacement type that calls on an old type are redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeMapping {
    /// The facade type
    pub facade: TypeRef,
    /// Members the facade declares
    pub members: Vec<FacadeMember>,
}

impl FacadeMapping {
    /// Creates a facade without members
    #[must_use]
    pub fn new(facade: TypeRef) -> Self {
        FacadeMapping {
            facade,
            members: Vec::new(),
        }
    }

    /// Declares a facade member
    #[must_use]
    pub fn with_member(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.members.push(FacadeMember {
            name: name.into(),
            signature,
        });
        self
    }

    /// Finds the facade member a method call can be redirected to.
    ///
    /// A member is compatible if it has the same name, consumes the same number of
    /// stack values (`this` included) and pushes a value exactly when the original
    /// does. An exact signature match is preferred over a merely compatible one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleFacade`] if no member is compatible.
    pub fn find_compatible(&self, member: &MemberRef) -> Result<MemberRef> {
        let wanted_args = member.signature.argument_count();
        let wanted_return = member.signature.returns_value();

        let mut candidates = self.members.iter().filter(|m| {
            m.name == member.name
                && m.signature.argument_count().is_some()
                && m.signature.argument_count() == wanted_args
                && m.signature.returns_value() == wanted_return
        });

        let exact = self
            .members
            .iter()
            .find(|m| m.name == member.name && m.signature == member.signature);

        match exact.or_else(|| candidates.next()) {
            Some(found) => Ok(MemberRef::new(
                self.facade.clone(),
                found.name.clone(),
                found.signature.clone(),
            )),
            None => Err(Error::IncompatibleFacade {
                member: member.to_string(),
                facade: self.facade.to_string(),
            }),
        }
    }
}

/// Immutable table of symbol-to-symbol rewrites.
///
/// Keys ignore the origin assembly: the host's own assemblies are named differently per
/// platform, so a reference is matched by declaring type, member name and signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteMappings {
    members: HashMap<String, HashMap<String, Vec<(Signature, MemberTarget)>>>,
    types: HashMap<String, TypeRef>,
    facades: HashMap<String, FacadeMapping>,
}

impl RewriteMappings {
    /// Creates an empty mapping table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps one member to a new declaring type and name
    #[must_use]
    pub fn with_member(
        mut self,
        old: &MemberRef,
        new_parent: TypeRef,
        new_name: impl Into<String>,
    ) -> Self {
        let target = MemberTarget {
            parent: new_parent,
            name: new_name.into(),
        };
        let overloads = self
            .members
            .entry(old.parent.full_name.clone())
            .or_default()
            .entry(old.name.clone())
            .or_default();
        overloads.retain(|(signature, _)| *signature != old.signature);
        overloads.push((old.signature.clone(), target));
        self
    }

    /// Maps every reference to a type, including member parents and signature types
    #[must_use]
    pub fn with_type(mut self, old_full_name: impl Into<String>, new: TypeRef) -> Self {
        self.types.insert(old_full_name.into(), new);
        self
    }

    /// Redirects method calls on a type to a facade
    #[must_use]
    pub fn with_facade(mut self, old_full_name: impl Into<String>, facade: FacadeMapping) -> Self {
        self.facades.insert(old_full_name.into(), facade);
        self
    }

    /// Returns `true` if the table maps nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.types.is_empty() && self.facades.is_empty()
    }

    /// Returns `true` if exact member or type mappings exist
    #[must_use]
    pub fn has_references(&self) -> bool {
        !self.members.is_empty() || !self.types.is_empty()
    }

    /// Returns `true` if facade mappings exist
    #[must_use]
    pub fn has_facades(&self) -> bool {
        !self.facades.is_empty()
    }

    /// The facade for a type, by full name
    #[must_use]
    pub fn facade(&self, full_name: &str) -> Option<&FacadeMapping> {
        self.facades.get(full_name)
    }

    /// The new type for a type, by full name
    #[must_use]
    pub fn type_target(&self, full_name: &str) -> Option<&TypeRef> {
        self.types.get(full_name)
    }

    /// The exact member mapping for a member reference
    #[must_use]
    pub fn member_target(&self, member: &MemberRef) -> Option<&MemberTarget> {
        self.members
            .get(member.parent.full_name.as_str())?
            .get(member.name.as_str())?
            .iter()
            .find(|(signature, _)| *signature == member.signature)
            .map(|(_, target)| target)
    }

    /// Applies the type mappings to a signature
    #[must_use]
    pub fn map_signature(&self, signature: &Signature) -> Signature {
        signature.map_types(|ty| match self.types.get(ty) {
            Some(target) => target.full_name.clone(),
            None => ty.to_string(),
        })
    }

    /// Computes the rewritten form of a reference, or `None` if no mapping applies.
    ///
    /// Exact member mappings take precedence; otherwise type mappings are applied to the
    /// declaring type and every type in the signature.
    #[must_use]
    pub fn rewrite(&self, reference: &SymbolicReference) -> Option<SymbolicReference> {
        match reference {
            SymbolicReference::Type(ty) => self
                .type_target(&ty.full_name)
                .cloned()
                .map(SymbolicReference::Type),
            SymbolicReference::Member(member) => {
                if let Some(target) = self.member_target(member) {
                    return Some(SymbolicReference::Member(MemberRef::new(
                        target.parent.clone(),
                        target.name.clone(),
                        self.map_signature(&member.signature),
                    )));
                }

                let rewritten = MemberRef::new(
                    self.type_target(&member.parent.full_name)
                        .cloned()
                        .unwrap_or_else(|| member.parent.clone()),
                    member.name.clone(),
                    self.map_signature(&member.signature),
                );
                (rewritten != *member).then_some(SymbolicReference::Member(rewritten))
            }
        }
    }

    /// Checks that no mapping target is itself a mapping key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMapping`] naming the first chained mapping.
    pub fn validate(&self) -> Result<()> {
        for (old, target) in &self.types {
            if self.types.contains_key(&target.full_name) {
                return Err(Error::InvalidMapping(format!(
                    "type {old} maps to {target}, which is mapped again"
                )));
            }
        }

        for (old_type, by_name) in &self.members {
            for (old_name, overloads) in by_name {
                for (signature, target) in overloads {
                    let mapped = MemberRef::new(
                        target.parent.clone(),
                        target.name.clone(),
                        self.map_signature(signature),
                    );
                    if self.types.contains_key(&target.parent.full_name)
                        || self.member_target(&mapped).is_some()
                    {
                        return Err(Error::InvalidMapping(format!(
                            "member {old_type}::{old_name} maps to {mapped}, which is mapped again"
                        )));
                    }
                }
            }
        }

        for (old, facade) in &self.facades {
            let name = &facade.facade.full_name;
            if self.facades.contains_key(name) || self.types.contains_key(name) {
                return Err(Error::InvalidMapping(format!(
                    "facade for {old} targets {}, which is mapped again",
                    facade.facade
                )));
            }
        }

        Ok(())
    }
}

/// Namespaces and renames used to move Harmony 1.x references to Harmony 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarmonyShims {
    /// Assembly name both Harmony versions ship as
    pub origin: String,
    /// Namespace of Harmony 1.x
    pub legacy_namespace: String,
    /// Namespace of Harmony 2.x
    pub current_namespace: String,
    /// Types that were renamed or replaced by a shim, by legacy full name
    pub renames: HashMap<String, TypeRef>,
}

impl HarmonyShims {
    /// Returns `true` if the type belongs to Harmony 1.x
    #[must_use]
    pub fn is_legacy(&self, ty: &TypeRef) -> bool {
        ty.origin == self.origin && self.is_legacy_name(&ty.full_name)
    }

    /// Returns `true` if a type name (as found in signatures) is in the Harmony 1.x namespace
    #[must_use]
    pub fn is_legacy_name(&self, full_name: &str) -> bool {
        Self::in_namespace(full_name, &self.legacy_namespace)
    }

    /// Returns `true` if the type belongs to Harmony 2.x
    #[must_use]
    pub fn is_current(&self, ty: &TypeRef) -> bool {
        ty.origin == self.origin && Self::in_namespace(&ty.full_name, &self.current_namespace)
    }

    /// The Harmony 2.x replacement of a legacy type name; other names pass through
    #[must_use]
    pub fn upgrade_name(&self, full_name: &str) -> String {
        if let Some(target) = self.renames.get(full_name) {
            return target.full_name.clone();
        }
        match full_name.strip_prefix(self.legacy_namespace.as_str()) {
            Some(rest) if rest.starts_with('.') => format!("{}{rest}", self.current_namespace),
            _ => full_name.to_string(),
        }
    }

    /// The Harmony 2.x replacement of a legacy type
    #[must_use]
    pub fn upgrade_type(&self, ty: &TypeRef) -> TypeRef {
        if let Some(target) = self.renames.get(&ty.full_name) {
            return target.clone();
        }
        TypeRef::new(ty.origin.clone(), self.upgrade_name(&ty.full_name))
    }

    fn in_namespace(full_name: &str, namespace: &str) -> bool {
        full_name
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl Default for HarmonyShims {
    fn default() -> Self {
        let mut renames = HashMap::new();
        renames.insert(
            "Harmony.HarmonyInstance".to_string(),
            TypeRef::new("0Harmony", "HarmonyLib.Harmony"),
        );
        HarmonyShims {
            origin: "0Harmony".to_string(),
            legacy_namespace: "Harmony".to_string(),
            current_namespace: "HarmonyLib".to_string(),
            renames,
        }
    }
}

/// The closed sets of types and members the finders look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionRules {
    /// Type holding the host's internal save serializers
    pub save_serializer_type: String,
    /// Serializer fields on [`DetectionRules::save_serializer_type`]
    pub save_serializer_fields: Vec<String>,
    /// Type declaring the unvalidated event hooks
    pub unvalidated_event_type: String,
    /// Unvalidated event names
    pub unvalidated_events: Vec<String>,
    /// Types used by late-bound `dynamic` call sites
    pub dynamic_types: Vec<String>,
    /// Console types (paranoid mode)
    pub console_types: Vec<String>,
    /// Filesystem types (paranoid mode)
    pub filesystem_types: Vec<String>,
    /// Process-spawning types (paranoid mode)
    pub shell_types: Vec<String>,
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

impl Default for DetectionRules {
    fn default() -> Self {
        DetectionRules {
            save_serializer_type: "StardewValley.SaveGame".to_string(),
            save_serializer_fields: strings(&["serializer", "farmerSerializer", "locationSerializer"]),
            unvalidated_event_type: "StardewModdingAPI.Events.ISpecializedEvents".to_string(),
            unvalidated_events: strings(&["UnvalidatedUpdateTicked", "UnvalidatedUpdateTicking"]),
            dynamic_types: strings(&["System.Runtime.CompilerServices.CallSite"]),
            console_types: strings(&["System.Console"]),
            filesystem_types: strings(&[
                "System.IO.File",
                "System.IO.FileInfo",
                "System.IO.FileStream",
                "System.IO.Directory",
                "System.IO.DirectoryInfo",
                "System.IO.DriveInfo",
                "System.IO.FileSystemWatcher",
            ]),
            shell_types: strings(&["System.Diagnostics.Process"]),
        }
    }
}

/// Configuration for building a [`crate::rewriter::Pipeline`].
///
/// The two switches are read once, when the pipeline is built; changing a config
/// afterwards does not affect pipelines already built from it.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Apply rewrites (default: `true`). When disabled, version finders still run in
    /// detect-only mode.
    pub rewrite_enabled: bool,

    /// Enable the paranoid finders for console, filesystem and shell access
    /// (default: `false`).
    pub paranoid_mode: bool,

    /// Assemblies guaranteed to be loaded.
    pub trusted_origins: Arc<TrustedOrigins>,

    /// Exact, type and facade rewrite mappings.
    pub mappings: Arc<RewriteMappings>,

    /// What the loaded host binaries declare.
    pub host: Arc<HostCatalog>,

    /// Processor width of the host process (default: 64-bit).
    pub target_width: TargetWidth,

    /// Severity assigned to each classification.
    pub severity_policy: SeverityPolicy,

    /// Types and members the finders look for.
    pub detection: Arc<DetectionRules>,

    /// Harmony 1.x to 2.x renames.
    pub harmony: Arc<HarmonyShims>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rewrite_enabled: true,
            paranoid_mode: false,
            trusted_origins: Arc::new(TrustedOrigins::default()),
            mappings: Arc::new(RewriteMappings::new()),
            host: Arc::new(HostCatalog::empty()),
            target_width: TargetWidth::Bits64,
            severity_policy: SeverityPolicy::default(),
            detection: Arc::new(DetectionRules::default()),
            harmony: Arc::new(HarmonyShims::default()),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that only reports and never mutates a module.
    #[must_use]
    pub fn detect_only() -> Self {
        Self {
            rewrite_enabled: false,
            ..Self::default()
        }
    }

    /// Enables or disables rewriting
    #[must_use]
    pub fn with_rewrite(mut self, enabled: bool) -> Self {
        self.rewrite_enabled = enabled;
        self
    }

    /// Enables or disables paranoid mode
    #[must_use]
    pub fn with_paranoid(mut self, enabled: bool) -> Self {
        self.paranoid_mode = enabled;
        self
    }

    /// Replaces the trusted origins
    #[must_use]
    pub fn with_trusted_origins(mut self, origins: TrustedOrigins) -> Self {
        self.trusted_origins = Arc::new(origins);
        self
    }

    /// Replaces the rewrite mappings
    #[must_use]
    pub fn with_mappings(mut self, mappings: RewriteMappings) -> Self {
        self.mappings = Arc::new(mappings);
        self
    }

    /// Replaces the host catalog
    #[must_use]
    pub fn with_host(mut self, host: impl Into<Arc<HostCatalog>>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the host process width
    #[must_use]
    pub fn with_target_width(mut self, width: TargetWidth) -> Self {
        self.target_width = width;
        self
    }

    /// Replaces the severity policy
    #[must_use]
    pub fn with_severity_policy(mut self, policy: SeverityPolicy) -> Self {
        self.severity_policy = policy;
        self
    }

    /// Replaces the detection rules
    #[must_use]
    pub fn with_detection_rules(mut self, rules: DetectionRules) -> Self {
        self.detection = Arc::new(rules);
        self
    }

    /// Replaces the Harmony shims
    #[must_use]
    pub fn with_harmony_shims(mut self, shims: HarmonyShims) -> Self {
        self.harmony = Arc::new(shims);
        self
    }
}
