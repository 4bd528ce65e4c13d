#![forbid(unsafe_code)]

//! Collaborator seams consumed by the operator commands.
//!
//! The commands never touch catalog rows directly. Name resolution goes through
//! [`CatalogMetadata`], privilege checks through [`AclChecker`], and every
//! persisted effect through [`OperatorStore`]. [`InMemoryCatalog`] implements
//! all three for tests and prototyping.

mod memory;
mod record;

pub use memory::{FunctionLookup, InMemoryCatalog};
pub use record::{Dependency, LinkKind, OperatorRecord, OperatorSpec, OperatorUpdate};

use crate::error::Result;
use crate::types::{FuncId, NamespaceId, OperatorId, QualifiedName, RoleId, TypeId, TypeName};

/// Resolves human-readable names to catalog identifiers.
pub trait CatalogMetadata {
    /// Picks the schema a new object named `name` should be created in and
    /// returns it together with the unqualified object name.
    fn creation_namespace(&self, name: &QualifiedName) -> Result<(NamespaceId, String)>;
    /// Returns the name of a schema.
    fn namespace_name(&self, id: NamespaceId) -> Result<String>;
    /// Resolves a type reference. Fails with `UndefinedObject` when unknown.
    fn resolve_type(&self, name: &TypeName) -> Result<TypeId>;
    /// Renders a type for diagnostics.
    fn format_type(&self, id: TypeId) -> String;
    /// Exact-signature function lookup; the arity is `args.len()`.
    fn lookup_function(&self, name: &QualifiedName, args: &[TypeId]) -> Result<Option<FuncId>>;
    /// Return type of a function.
    fn function_return_type(&self, id: FuncId) -> Result<TypeId>;
    /// Finds an operator, including shells, by symbol and operand types.
    fn lookup_operator(
        &self,
        name: &QualifiedName,
        left: Option<TypeId>,
        right: Option<TypeId>,
    ) -> Result<Option<OperatorId>>;
}

/// Object a privilege applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AclObject {
    /// A schema.
    Namespace(NamespaceId),
    /// A data type.
    Type(TypeId),
    /// A function.
    Function(FuncId),
    /// An operator.
    Operator(OperatorId),
}

/// Privilege kinds checked by the operator commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Privilege {
    /// Create objects inside a schema.
    Create,
    /// Use a type.
    Usage,
    /// Call a function.
    Execute,
}

/// Answers privilege questions for a role.
pub trait AclChecker {
    /// Whether `role` holds `privilege` on `object`.
    fn has_privilege(&self, role: RoleId, object: AclObject, privilege: Privilege) -> bool;
    /// Whether `role` owns `object` (or may act as its owner).
    fn is_owner(&self, role: RoleId, object: AclObject) -> bool;
}

/// Persists operator rows and maintains their symmetric links.
pub trait OperatorStore {
    /// Inserts (or fills in a shell for) a fully resolved operator, wiring its
    /// commutator and negator links.
    fn create_operator(&mut self, spec: OperatorSpec) -> Result<OperatorId>;
    /// Applies a partial update and recomputes dependency edges.
    fn update_operator(&mut self, id: OperatorId, update: OperatorUpdate) -> Result<()>;
    /// Deletes a row, rejecting the call when `expected_version` is stale.
    fn delete_operator(&mut self, id: OperatorId, expected_version: u64) -> Result<()>;
    /// Clears `peer`'s link of `kind` if it still points at `removed`.
    fn clear_reciprocal_link(
        &mut self,
        peer: OperatorId,
        kind: LinkKind,
        removed: OperatorId,
    ) -> Result<()>;
    /// Reads the current row.
    fn fetch_operator(&self, id: OperatorId) -> Result<Option<OperatorRecord>>;
}

/// Everything the operator commands need from the surrounding system.
pub trait Catalog: CatalogMetadata + AclChecker + OperatorStore {}

impl<T: CatalogMetadata + AclChecker + OperatorStore + ?Sized> Catalog for T {}
