//! Symbolic references from module code to types and members of other assemblies.
//!
//! Every token operand that leaves the module resolves to a [`SymbolicReference`]. Matching
//! and rewriting always work on the fully qualified form (origin assembly, declaring type,
//! member name and signature), never on a bare name.
//!
//! # Example
//!
//! ```rust
//! use dotshim::metadata::{MemberRef, Signature, TypeRef};
//!
//! let farmer = TypeRef::new("StardewValley", "StardewValley.Farmer");
//! let field = MemberRef::field(farmer.clone(), "money", "System.Int32");
//!
//! assert_eq!(farmer.namespace(), "StardewValley");
//! assert_eq!(farmer.name(), "Farmer");
//! assert_eq!(field.to_string(), "[StardewValley]StardewValley.Farmer::money : System.Int32");
//! assert_eq!(field.signature, Signature::field("System.Int32"));
//! ```

use std::fmt;

/// Full name of the CIL `void` type as it appears in signatures.
pub const VOID_TYPE: &str = "System.Void";

/// A reference to a type living in another assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    /// Name of the assembly the reference claims the type lives in
    pub origin: String,
    /// Namespace-qualified type name, nested types separated by `/`
    pub full_name: String,
}

impl TypeRef {
    /// Creates a new type reference
    pub fn new(origin: impl Into<String>, full_name: impl Into<String>) -> Self {
        TypeRef {
            origin: origin.into(),
            full_name: full_name.into(),
        }
    }

    /// Returns the namespace part of the full name, or `""` for the global namespace
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self.full_name.rfind('.') {
            Some(pos) => &self.full_name[..pos],
            None => "",
        }
    }

    /// Returns the simple type name without namespace
    #[must_use]
    pub fn name(&self) -> &str {
        match self.full_name.rfind('.') {
            Some(pos) => &self.full_name[pos + 1..],
            None => &self.full_name,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.origin, self.full_name)
    }
}

/// The shape of a referenced member.
///
/// Types are kept as their full names; the crate never needs to structurally
/// compare generic instantiations, only to detect drift between a reference and
/// what the host actually declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signature {
    /// A field of the given type
    Field {
        /// Full name of the field type
        field_type: String,
    },
    /// A method, constructor or accessor
    Method {
        /// `true` for instance methods (an implicit `this` argument)
        has_this: bool,
        /// Full name of the return type, [`VOID_TYPE`] for none
        return_type: String,
        /// Full names of the parameter types
        parameters: Vec<String>,
    },
}

impl Signature {
    /// Creates a field signature
    pub fn field(field_type: impl Into<String>) -> Self {
        Signature::Field {
            field_type: field_type.into(),
        }
    }

    /// Creates an instance method signature
    pub fn instance_method(return_type: impl Into<String>, parameters: &[&str]) -> Self {
        Signature::Method {
            has_this: true,
            return_type: return_type.into(),
            parameters: parameters.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Creates a static method signature
    pub fn static_method(return_type: impl Into<String>, parameters: &[&str]) -> Self {
        Signature::Method {
            has_this: false,
            return_type: return_type.into(),
            parameters: parameters.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Returns `true` for field signatures
    #[must_use]
    pub fn is_field(&self) -> bool {
        matches!(self, Signature::Field { .. })
    }

    /// The type a member produces: the field type, or the method return type
    #[must_use]
    pub fn value_type(&self) -> &str {
        match self {
            Signature::Field { field_type } => field_type,
            Signature::Method { return_type, .. } => return_type,
        }
    }

    /// Number of values a call consumes from the evaluation stack, `this` included.
    ///
    /// Returns `None` for field signatures.
    #[must_use]
    pub fn argument_count(&self) -> Option<usize> {
        match self {
            Signature::Field { .. } => None,
            Signature::Method {
                has_this,
                parameters,
                ..
            } => Some(parameters.len() + usize::from(*has_this)),
        }
    }

    /// Returns `true` if a call through this signature pushes a value
    #[must_use]
    pub fn returns_value(&self) -> bool {
        match self {
            Signature::Field { .. } => true,
            Signature::Method { return_type, .. } => return_type != VOID_TYPE,
        }
    }

    /// Iterates over every type name mentioned by this signature
    pub fn mentioned_types(&self) -> impl Iterator<Item = &str> {
        let (head, tail): (&str, &[String]) = match self {
            Signature::Field { field_type } => (field_type.as_str(), &[] as &[String]),
            Signature::Method {
                return_type,
                parameters,
                ..
            } => (return_type.as_str(), parameters.as_slice()),
        };
        std::iter::once(head).chain(tail.iter().map(String::as_str))
    }

    /// Returns a copy with every mentioned type passed through `rename`
    #[must_use]
    pub fn map_types<F>(&self, mut rename: F) -> Signature
    where
        F: FnMut(&str) -> String,
    {
        match self {
            Signature::Field { field_type } => Signature::Field {
                field_type: rename(field_type.as_str()),
            },
            Signature::Method {
                has_this,
                return_type,
                parameters,
            } => Signature::Method {
                has_this: *has_this,
                return_type: rename(return_type.as_str()),
                parameters: parameters.iter().map(|p| rename(p.as_str())).collect(),
            },
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Field { field_type } => write!(f, "{field_type}"),
            Signature::Method {
                has_this,
                return_type,
                parameters,
            } => {
                if *has_this {
                    write!(f, "instance ")?;
                }
                write!(f, "{return_type}({})", parameters.join(", "))
            }
        }
    }
}

/// A reference to a field or method declared on a type of another assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberRef {
    /// The declaring type
    pub parent: TypeRef,
    /// Member name (`.ctor` for constructors, `get_X` for property getters)
    pub name: String,
    /// Member shape
    pub signature: Signature,
}

impl MemberRef {
    /// Creates a new member reference
    pub fn new(parent: TypeRef, name: impl Into<String>, signature: Signature) -> Self {
        MemberRef {
            parent,
            name: name.into(),
            signature,
        }
    }

    /// Creates a field reference
    pub fn field(parent: TypeRef, name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self::new(parent, name, Signature::field(field_type))
    }

    /// Returns `true` if this references a field
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.signature.is_field()
    }

    /// Returns `true` if this references a method
    #[must_use]
    pub fn is_method(&self) -> bool {
        !self.signature.is_field()
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signature {
            Signature::Field { field_type } => {
                write!(f, "{}::{} : {}", self.parent, self.name, field_type)
            }
            Signature::Method {
                has_this,
                return_type,
                parameters,
            } => {
                if *has_this {
                    write!(f, "instance ")?;
                }
                write!(
                    f,
                    "{} {}::{}({})",
                    return_type,
                    self.parent,
                    self.name,
                    parameters.join(", ")
                )
            }
        }
    }
}

/// The fully qualified target of a token operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolicReference {
    /// A type reference (`castclass`, `newarr`, `box`, ...)
    Type(TypeRef),
    /// A field or method reference
    Member(MemberRef),
}

impl SymbolicReference {
    /// The assembly this reference claims to target
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.declaring_type().origin
    }

    /// The referenced type, or the declaring type of the referenced member
    #[must_use]
    pub fn declaring_type(&self) -> &TypeRef {
        match self {
            SymbolicReference::Type(ty) => ty,
            SymbolicReference::Member(member) => &member.parent,
        }
    }

    /// The member name for member references
    #[must_use]
    pub fn member_name(&self) -> Option<&str> {
        match self {
            SymbolicReference::Type(_) => None,
            SymbolicReference::Member(member) => Some(&member.name),
        }
    }

    /// The member signature for member references
    #[must_use]
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            SymbolicReference::Type(_) => None,
            SymbolicReference::Member(member) => Some(&member.signature),
        }
    }

    /// Returns the member reference, if this is one
    #[must_use]
    pub fn as_member(&self) -> Option<&MemberRef> {
        match self {
            SymbolicReference::Member(member) => Some(member),
            SymbolicReference::Type(_) => None,
        }
    }

    /// Returns `true` if the declaring type or any signature type equals `full_name`
    #[must_use]
    pub fn mentions_type(&self, full_name: &str) -> bool {
        self.declaring_type().full_name == full_name
            || self
                .signature()
                .is_some_and(|sig| sig.mentioned_types().any(|ty| ty == full_name))
    }
}

impl fmt::Display for SymbolicReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicReference::Type(ty) => write!(f, "{ty}"),
            SymbolicReference::Member(member) => write!(f, "{member}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_parts() {
        let ty = TypeRef::new("mscorlib", "System.Console");
        assert_eq!(ty.namespace(), "System");
        assert_eq!(ty.name(), "Console");

        let global = TypeRef::new("Mod", "ModEntry");
        assert_eq!(global.namespace(), "");
        assert_eq!(global.name(), "ModEntry");
    }

    #[test]
    fn argument_count_includes_this() {
        let instance = Signature::instance_method(VOID_TYPE, &["System.Int32"]);
        let static_sig = Signature::static_method("System.String", &["System.Int32"]);

        assert_eq!(instance.argument_count(), Some(2));
        assert_eq!(static_sig.argument_count(), Some(1));
        assert!(!instance.returns_value());
        assert!(static_sig.returns_value());
        assert_eq!(Signature::field("System.Int32").argument_count(), None);
    }

    #[test]
    fn mentions_type_checks_signature() {
        let method = MemberRef::new(
            TypeRef::new("Mod", "Mod.Helpers"),
            "Log",
            Signature::static_method(VOID_TYPE, &["System.IO.FileInfo"]),
        );
        let reference = SymbolicReference::Member(method);

        assert!(reference.mentions_type("System.IO.FileInfo"));
        assert!(reference.mentions_type("Mod.Helpers"));
        assert!(!reference.mentions_type("System.IO.File"));
    }

    #[test]
    fn map_types_renames_all_positions() {
        let sig = Signature::static_method("Harmony.HarmonyInstance", &["System.String"]);
        let renamed = sig.map_types(|ty| ty.replace("Harmony.", "HarmonyLib."));

        assert_eq!(
            renamed,
            Signature::static_method("HarmonyLib.HarmonyInstance", &["System.String"])
        );
    }

    #[test]
    fn display_forms() {
        let call = MemberRef::new(
            TypeRef::new("mscorlib", "System.Console"),
            "WriteLine",
            Signature::static_method(VOID_TYPE, &["System.String"]),
        );
        assert_eq!(
            call.to_string(),
            "System.Void [mscorlib]System.Console::WriteLine(System.String)"
        );
    }
}
