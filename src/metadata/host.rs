//! Description of the members the currently loaded host binaries actually contain.
//!
//! The heuristic finders and rewriters compare a module's references against this
//! catalog to notice references to members that were removed, renamed or changed type
//! since the module was compiled. The catalog is built once by the host and shared
//! read-only between all passes.
//!
//! # Example
//!
//! ```rust
//! use dotshim::metadata::{HostCatalog, HostType, MemberRef, Resolution, TypeRef};
//!
//! let host = HostCatalog::builder()
//!     .with_type(
//!         "StardewValley",
//!         HostType::new("StardewValley.Farmer")
//!             .field("money", "System.Int32")
//!             .property("Name", "System.String", false),
//!     )
//!     .build();
//!
//! let farmer = TypeRef::new("StardewValley", "StardewValley.Farmer");
//! let money = MemberRef::field(farmer.clone(), "money", "System.Int32");
//! let name = MemberRef::field(farmer, "name", "System.String");
//!
//! assert_eq!(host.resolve_member(&money), Resolution::Resolved);
//! assert_eq!(host.resolve_member(&name), Resolution::MemberMissing);
//! ```

use std::collections::HashMap;

use crate::metadata::reference::{MemberRef, Signature, TypeRef, VOID_TYPE};

/// A field declared by a host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostField {
    /// Field name
    pub name: String,
    /// Full name of the field type
    pub field_type: String,
}

/// A method declared by a host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMethod {
    /// Method name
    pub name: String,
    /// Method shape
    pub signature: Signature,
}

/// A property declared by a host type, backed by `get_`/`set_` accessor methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProperty {
    /// Property name
    pub name: String,
    /// Full name of the property type
    pub property_type: String,
    /// Static properties have static accessors
    pub is_static: bool,
    /// The property has a setter
    pub writable: bool,
}

impl HostProperty {
    /// Signature of the `get_` accessor
    #[must_use]
    pub fn getter_signature(&self) -> Signature {
        Signature::Method {
            has_this: !self.is_static,
            return_type: self.property_type.clone(),
            parameters: Vec::new(),
        }
    }

    /// Signature of the `set_` accessor
    #[must_use]
    pub fn setter_signature(&self) -> Signature {
        Signature::Method {
            has_this: !self.is_static,
            return_type: VOID_TYPE.to_string(),
            parameters: vec![self.property_type.clone()],
        }
    }
}

/// A type declared by a host assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostType {
    /// Namespace-qualified type name
    pub full_name: String,
    /// Declared fields
    pub fields: Vec<HostField>,
    /// Declared methods, including property accessors
    pub methods: Vec<HostMethod>,
    /// Declared properties
    pub properties: Vec<HostProperty>,
}

impl HostType {
    /// Creates a type without members
    pub fn new(full_name: impl Into<String>) -> Self {
        HostType {
            full_name: full_name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Adds a field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: impl Into<String>) -> Self {
        self.fields.push(HostField {
            name: name.into(),
            field_type: field_type.into(),
        });
        self
    }

    /// Adds a method
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.methods.push(HostMethod {
            name: name.into(),
            signature,
        });
        self
    }

    /// Adds a read-write property together with its accessor methods
    #[must_use]
    pub fn property(self, name: &str, property_type: &str, is_static: bool) -> Self {
        self.add_property(name, property_type, is_static, true)
    }

    /// Adds a read-only property together with its getter
    #[must_use]
    pub fn readonly_property(self, name: &str, property_type: &str, is_static: bool) -> Self {
        self.add_property(name, property_type, is_static, false)
    }

    fn add_property(
        mut self,
        name: &str,
        property_type: &str,
        is_static: bool,
        writable: bool,
    ) -> Self {
        let property = HostProperty {
            name: name.to_string(),
            property_type: property_type.to_string(),
            is_static,
            writable,
        };
        self.methods.push(HostMethod {
            name: format!("get_{name}"),
            signature: property.getter_signature(),
        });
        if writable {
            self.methods.push(HostMethod {
                name: format!("set_{name}"),
                signature: property.setter_signature(),
            });
        }
        self.properties.push(property);
        self
    }

    /// Looks up a property by name
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<&HostProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Outcome of looking up a member reference in the [`HostCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The member exists with exactly the referenced shape
    Resolved,
    /// The declaring type is not declared by the referenced assembly
    TypeMissing,
    /// The type exists but declares no member with that name and parameter list
    MemberMissing,
    /// The member exists, but its field type or return type differs from the reference
    UnexpectedType {
        /// Type the module expects
        expected: String,
        /// Type the host declares
        actual: String,
    },
}

/// Read-only catalog of host assemblies, their types and members.
#[derive(Debug, Clone, Default)]
pub struct HostCatalog {
    assemblies: HashMap<String, HashMap<String, HostType>>,
}

impl HostCatalog {
    /// Starts building a catalog
    #[must_use]
    pub fn builder() -> HostCatalogBuilder {
        HostCatalogBuilder::default()
    }

    /// Creates an empty catalog
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if the catalog describes the named assembly
    #[must_use]
    pub fn has_assembly(&self, name: &str) -> bool {
        self.assemblies.contains_key(name)
    }

    /// Looks up the type a reference points at
    #[must_use]
    pub fn find_type(&self, ty: &TypeRef) -> Option<&HostType> {
        self.assemblies.get(&ty.origin)?.get(&ty.full_name)
    }

    /// Looks up a member reference.
    ///
    /// Fields are matched by name; a name match with a different field type is reported
    /// as [`Resolution::UnexpectedType`]. Methods are matched by name, instance-ness and
    /// parameter list; if only the return type differs the result is
    /// [`Resolution::UnexpectedType`].
    #[must_use]
    pub fn resolve_member(&self, member: &MemberRef) -> Resolution {
        let Some(host_type) = self.find_type(&member.parent) else {
            return Resolution::TypeMissing;
        };

        match &member.signature {
            Signature::Field { field_type } => {
                match host_type.fields.iter().find(|f| f.name == member.name) {
                    None => Resolution::MemberMissing,
                    Some(field) if field.field_type == *field_type => Resolution::Resolved,
                    Some(field) => Resolution::UnexpectedType {
                        expected: field_type.clone(),
                        actual: field.field_type.clone(),
                    },
                }
            }
            Signature::Method {
                has_this,
                return_type,
                parameters,
            } => {
                let mut return_mismatch = None;
                for candidate in host_type.methods.iter().filter(|m| m.name == member.name) {
                    let Signature::Method {
                        has_this: host_this,
                        return_type: host_return,
                        parameters: host_params,
                    } = &candidate.signature
                    else {
                        continue;
                    };

                    if host_this != has_this || host_params != parameters {
                        continue;
                    }
                    if host_return == return_type {
                        return Resolution::Resolved;
                    }
                    return_mismatch.get_or_insert_with(|| host_return.clone());
                }

                match return_mismatch {
                    Some(actual) => Resolution::UnexpectedType {
                        expected: return_type.clone(),
                        actual,
                    },
                    None => Resolution::MemberMissing,
                }
            }
        }
    }
}

/// Builder for [`HostCatalog`].
#[derive(Debug, Default)]
pub struct HostCatalogBuilder {
    catalog: HostCatalog,
}

impl HostCatalogBuilder {
    /// Registers an assembly, even if it declares no types yet
    #[must_use]
    pub fn with_assembly(mut self, assembly: impl Into<String>) -> Self {
        self.catalog.assemblies.entry(assembly.into()).or_default();
        self
    }

    /// Adds a type to an assembly, replacing an earlier type with the same name
    #[must_use]
    pub fn with_type(mut self, assembly: impl Into<String>, ty: HostType) -> Self {
        self.catalog
            .assemblies
            .entry(assembly.into())
            .or_default()
            .insert(ty.full_name.clone(), ty);
        self
    }

    /// Finishes the catalog
    #[must_use]
    pub fn build(self) -> HostCatalog {
        self.catalog
    }
}
