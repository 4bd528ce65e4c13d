#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::types::{FuncId, NamespaceId, OperatorId, QualifiedName, RoleId, TypeId};

/// Persisted operator row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRecord {
    /// Row identifier.
    pub oid: OperatorId,
    /// Operator symbol.
    pub name: String,
    /// Containing schema.
    pub namespace: NamespaceId,
    /// Left operand; absent for prefix operators.
    pub left_type: Option<TypeId>,
    /// Right operand.
    pub right_type: Option<TypeId>,
    /// Implementing function; absent only for shells.
    pub function: Option<FuncId>,
    /// Return type of `function`; absent only for shells.
    pub result_type: Option<TypeId>,
    /// Commutator link.
    pub commutator: Option<OperatorId>,
    /// Negator link.
    pub negator: Option<OperatorId>,
    /// Usable in merge joins.
    pub can_merge: bool,
    /// Usable in hash joins.
    pub can_hash: bool,
    /// Restriction selectivity estimator.
    pub restrict: Option<FuncId>,
    /// Join selectivity estimator.
    pub join: Option<FuncId>,
    /// Owning role.
    pub owner: RoleId,
    /// Bumped on every in-place write.
    pub version: u64,
}

impl OperatorRecord {
    /// Both operands present.
    pub fn is_binary(&self) -> bool {
        self.left_type.is_some() && self.right_type.is_some()
    }

    /// Result type is `bool`.
    pub fn returns_bool(&self) -> bool {
        self.result_type == Some(TypeId::BOOL)
    }

    /// Forward-reference placeholder with no implementing function yet.
    pub fn is_shell(&self) -> bool {
        self.function.is_none()
    }

    /// Whether the operator links to itself as commutator or negator.
    pub fn is_self_linked(&self) -> bool {
        self.commutator == Some(self.oid) || self.negator == Some(self.oid)
    }

    pub(crate) fn link(&self, kind: LinkKind) -> Option<OperatorId> {
        match kind {
            LinkKind::Commutator => self.commutator,
            LinkKind::Negator => self.negator,
        }
    }

    pub(crate) fn link_mut(&mut self, kind: LinkKind) -> &mut Option<OperatorId> {
        match kind {
            LinkKind::Commutator => &mut self.commutator,
            LinkKind::Negator => &mut self.negator,
        }
    }
}

/// Fully resolved definition handed to [`super::OperatorStore::create_operator`].
///
/// Commutator and negator stay names: resolving them, and creating shells for
/// operators that do not exist yet, is the store's job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorSpec {
    pub name: String,
    pub namespace: NamespaceId,
    pub left_type: Option<TypeId>,
    pub right_type: Option<TypeId>,
    pub function: FuncId,
    pub result_type: TypeId,
    pub commutator: Option<QualifiedName>,
    pub negator: Option<QualifiedName>,
    pub restrict: Option<FuncId>,
    pub join: Option<FuncId>,
    pub can_merge: bool,
    pub can_hash: bool,
    pub owner: RoleId,
}

/// Partial update of the alterable columns.
///
/// The outer `Option` says whether the column is touched; the inner one is
/// the new value, `None` clearing it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperatorUpdate {
    pub restrict: Option<Option<FuncId>>,
    pub join: Option<Option<FuncId>>,
}

impl OperatorUpdate {
    /// Nothing to write.
    pub fn is_empty(&self) -> bool {
        self.restrict.is_none() && self.join.is_none()
    }
}

/// Which symmetric link a maintenance call concerns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Commutator,
    Negator,
}

/// Edge from an operator to an object it depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dependency {
    Namespace(NamespaceId),
    Type(TypeId),
    Function(FuncId),
    Owner(RoleId),
}

impl Dependency {
    pub(crate) fn collect(record: &OperatorRecord) -> Vec<Dependency> {
        let mut deps = vec![Dependency::Namespace(record.namespace)];
        deps.extend(record.left_type.map(Dependency::Type));
        deps.extend(record.right_type.map(Dependency::Type));
        deps.extend(record.result_type.map(Dependency::Type));
        deps.extend(record.function.map(Dependency::Function));
        deps.extend(record.restrict.map(Dependency::Function));
        deps.extend(record.join.map(Dependency::Function));
        deps.push(Dependency::Owner(record.owner));
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}
