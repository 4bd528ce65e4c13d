use std::collections::BTreeMap;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use super::record::{Dependency, LinkKind, OperatorRecord, OperatorSpec, OperatorUpdate};
use super::{AclChecker, AclObject, CatalogMetadata, OperatorStore, Privilege};
use crate::error::{CatalogError, ObjectKind, Result};
use crate::types::{FuncId, NamespaceId, OperatorId, QualifiedName, RoleId, TypeId, TypeName};

/// First identifier handed out to user-created objects.
const FIRST_USER_OID: u32 = 16_384;

/// Spellings accepted for the built-in types besides their canonical names.
const BUILTIN_ALIASES: [(&str, TypeId); 8] = [
    ("bool", TypeId::BOOL),
    ("int8", TypeId::INT8),
    ("int2", TypeId::INT2),
    ("int4", TypeId::INT4),
    ("int", TypeId::INT4),
    ("float8", TypeId::FLOAT8),
    ("regproc", TypeId::OID),
    ("varchar", TypeId::TEXT),
];

/// One recorded call to [`CatalogMetadata::lookup_function`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionLookup {
    /// Name as passed in.
    pub name: QualifiedName,
    /// Number of argument types requested.
    pub arity: usize,
}

#[derive(Clone, Debug)]
struct NamespaceEntry {
    name: String,
    owner: RoleId,
}

#[derive(Clone, Debug)]
struct TypeEntry {
    name: String,
    owner: RoleId,
}

#[derive(Clone, Debug)]
struct FunctionEntry {
    name: String,
    namespace: NamespaceId,
    args: Vec<TypeId>,
    returns: TypeId,
    owner: RoleId,
}

/// Identity of the operator a `create_operator` call is writing.
struct Creating<'a> {
    oid: OperatorId,
    namespace: NamespaceId,
    name: &'a str,
    left: Option<TypeId>,
    right: Option<TypeId>,
    owner: RoleId,
}

#[derive(Clone, Debug, Default)]
struct CatalogState {
    namespaces: FxHashMap<NamespaceId, NamespaceEntry>,
    namespace_by_name: FxHashMap<String, NamespaceId>,
    search_path: Vec<NamespaceId>,
    types: FxHashMap<TypeId, TypeEntry>,
    type_by_name: FxHashMap<(NamespaceId, String), TypeId>,
    functions: FxHashMap<FuncId, FunctionEntry>,
    operators: BTreeMap<OperatorId, OperatorRecord>,
    dependencies: FxHashMap<OperatorId, Vec<Dependency>>,
    grants: FxHashSet<(RoleId, AclObject, Privilege)>,
    superusers: FxHashSet<RoleId>,
    next_oid: u32,
}

/// Self-contained catalog implementing every collaborator trait.
///
/// Built-in types live in `pg_catalog`, which is always searched first; the
/// `public` schema is the initial search path and creation target. Like the
/// server defaults, `PUBLIC` may create in `public`, use every type and execute
/// every function unless a grant is revoked.
pub struct InMemoryCatalog {
    state: CatalogState,
    lookups: Mutex<Vec<FunctionLookup>>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    /// Creates a catalog holding `pg_catalog`, `public` and the built-in types.
    pub fn new() -> Self {
        let mut state = CatalogState {
            next_oid: FIRST_USER_OID,
            ..CatalogState::default()
        };
        let owner = RoleId::BOOTSTRAP_SUPERUSER;
        state.superusers.insert(owner);
        for (id, name) in [
            (NamespaceId::PG_CATALOG, "pg_catalog"),
            (NamespaceId::PUBLIC, "public"),
        ] {
            state.namespaces.insert(
                id,
                NamespaceEntry {
                    name: name.to_string(),
                    owner,
                },
            );
            state.namespace_by_name.insert(name.to_string(), id);
            state
                .grants
                .insert((RoleId::PUBLIC, AclObject::Namespace(id), Privilege::Usage));
        }
        state.grants.insert((
            RoleId::PUBLIC,
            AclObject::Namespace(NamespaceId::PUBLIC),
            Privilege::Create,
        ));
        state.search_path = vec![NamespaceId::PUBLIC];

        for (id, name) in TypeId::BUILTINS {
            state.types.insert(
                id,
                TypeEntry {
                    name: name.to_string(),
                    owner,
                },
            );
            state
                .type_by_name
                .insert((NamespaceId::PG_CATALOG, name.to_string()), id);
            state
                .grants
                .insert((RoleId::PUBLIC, AclObject::Type(id), Privilege::Usage));
        }
        for (alias, id) in BUILTIN_ALIASES {
            state
                .type_by_name
                .insert((NamespaceId::PG_CATALOG, alias.to_string()), id);
        }

        Self {
            state,
            lookups: Mutex::new(Vec::new()),
        }
    }

    fn allocate_oid(&mut self) -> u32 {
        let oid = self.state.next_oid;
        self.state.next_oid += 1;
        oid
    }

    /// Creates a schema owned by `owner`.
    pub fn create_schema(&mut self, name: &str, owner: RoleId) -> NamespaceId {
        let id = NamespaceId(self.allocate_oid());
        self.state.namespaces.insert(
            id,
            NamespaceEntry {
                name: name.to_string(),
                owner,
            },
        );
        self.state.namespace_by_name.insert(name.to_string(), id);
        id
    }

    /// Replaces the schema search path. `pg_catalog` stays implicitly first.
    pub fn set_search_path(&mut self, path: Vec<NamespaceId>) {
        self.state.search_path = path;
    }

    /// Creates a user type usable by `PUBLIC`.
    pub fn create_type(&mut self, namespace: NamespaceId, name: &str, owner: RoleId) -> TypeId {
        let id = TypeId(self.allocate_oid());
        self.state.types.insert(
            id,
            TypeEntry {
                name: name.to_string(),
                owner,
            },
        );
        self.state
            .type_by_name
            .insert((namespace, name.to_ascii_lowercase()), id);
        self.state
            .grants
            .insert((RoleId::PUBLIC, AclObject::Type(id), Privilege::Usage));
        id
    }

    /// Creates a function executable by `PUBLIC`.
    pub fn create_function(
        &mut self,
        namespace: NamespaceId,
        name: &str,
        args: &[TypeId],
        returns: TypeId,
        owner: RoleId,
    ) -> FuncId {
        let id = FuncId(self.allocate_oid());
        self.state.functions.insert(
            id,
            FunctionEntry {
                name: name.to_string(),
                namespace,
                args: args.to_vec(),
                returns,
                owner,
            },
        );
        self.state
            .grants
            .insert((RoleId::PUBLIC, AclObject::Function(id), Privilege::Execute));
        id
    }

    /// Marks `role` as a superuser, bypassing every privilege check.
    pub fn add_superuser(&mut self, role: RoleId) {
        self.state.superusers.insert(role);
    }

    /// Grants a privilege.
    pub fn grant(&mut self, role: RoleId, object: AclObject, privilege: Privilege) {
        self.state.grants.insert((role, object, privilege));
    }

    /// Revokes a privilege previously granted to `role`.
    pub fn revoke(&mut self, role: RoleId, object: AclObject, privilege: Privilege) {
        self.state.grants.remove(&(role, object, privilege));
    }

    /// Current dependency edges of an operator.
    pub fn dependencies(&self, id: OperatorId) -> Vec<Dependency> {
        self.state
            .dependencies
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every operator row, ordered by identifier.
    pub fn operators(&self) -> Vec<OperatorRecord> {
        self.state.operators.values().cloned().collect()
    }

    /// Function lookups performed so far.
    pub fn function_lookups(&self) -> Vec<FunctionLookup> {
        self.lookups.lock().clone()
    }

    /// Runs `f` as one transaction: when it fails every catalog change it made
    /// is rolled back before the error is returned.
    pub fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.state.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(code = err.code(), "catalog.rollback");
                self.state = saved;
                Err(err)
            }
        }
    }

    fn namespace_by_name(&self, name: &str) -> Result<NamespaceId> {
        self.state
            .namespace_by_name
            .get(name)
            .copied()
            .ok_or_else(|| CatalogError::undefined("schema", name))
    }

    /// Schemas to search for an unqualified name, in order.
    fn lookup_path(&self) -> impl Iterator<Item = NamespaceId> + '_ {
        std::iter::once(NamespaceId::PG_CATALOG).chain(
            self.state
                .search_path
                .iter()
                .copied()
                .filter(|ns| *ns != NamespaceId::PG_CATALOG),
        )
    }

    fn candidate_namespaces(&self, name: &QualifiedName) -> Result<Vec<NamespaceId>> {
        match &name.schema {
            Some(schema) => Ok(vec![self.namespace_by_name(schema)?]),
            None => Ok(self.lookup_path().collect()),
        }
    }

    fn find_operator(
        &self,
        namespace: NamespaceId,
        name: &str,
        left: Option<TypeId>,
        right: Option<TypeId>,
    ) -> Option<OperatorId> {
        self.state
            .operators
            .values()
            .find(|op| {
                op.namespace == namespace
                    && op.name == name
                    && op.left_type == left
                    && op.right_type == right
            })
            .map(|op| op.oid)
    }

    fn render_operator(&self, name: &str, left: Option<TypeId>, right: Option<TypeId>) -> String {
        let side = |t: Option<TypeId>| match t {
            Some(t) => self.format_type(t),
            None => "NONE".to_string(),
        };
        format!("{name}({}, {})", side(left), side(right))
    }

    /// Resolves a commutator or negator name for the operator being created,
    /// making a shell when nothing matches yet.
    fn link_target(
        &mut self,
        target: &QualifiedName,
        left: Option<TypeId>,
        right: Option<TypeId>,
        creating: &Creating<'_>,
    ) -> Result<OperatorId> {
        let shell_namespace = match &target.schema {
            Some(schema) => self.namespace_by_name(schema)?,
            None => creating.namespace,
        };
        if shell_namespace == creating.namespace
            && target.name == creating.name
            && left == creating.left
            && right == creating.right
        {
            return Ok(creating.oid);
        }
        for ns in self.candidate_namespaces(target)? {
            if let Some(oid) = self.find_operator(ns, &target.name, left, right) {
                return Ok(oid);
            }
        }
        let owner = creating.owner;
        if !self.has_privilege(owner, AclObject::Namespace(shell_namespace), Privilege::Create) {
            return Err(CatalogError::PermissionDenied {
                kind: ObjectKind::Schema,
                name: self.namespace_name(shell_namespace)?,
            });
        }
        let oid = OperatorId(self.allocate_oid());
        let shell = OperatorRecord {
            oid,
            name: target.name.clone(),
            namespace: shell_namespace,
            left_type: left,
            right_type: right,
            function: None,
            result_type: None,
            commutator: None,
            negator: None,
            can_merge: false,
            can_hash: false,
            restrict: None,
            join: None,
            owner,
            version: 1,
        };
        debug!(oid = oid.0, name = %shell.name, "catalog.operator.shell");
        self.write_row(shell);
        Ok(oid)
    }

    /// Points `peer`'s `kind` link at `base` unless it already points elsewhere.
    fn link_back(&mut self, peer: OperatorId, kind: LinkKind, base: OperatorId) {
        if peer == base {
            return;
        }
        if let Some(record) = self.state.operators.get_mut(&peer) {
            let slot = record.link_mut(kind);
            if slot.is_none() {
                *slot = Some(base);
                record.version += 1;
                trace!(peer = peer.0, base = base.0, ?kind, "catalog.operator.link_back");
            }
        }
    }

    fn write_row(&mut self, record: OperatorRecord) {
        self.state
            .dependencies
            .insert(record.oid, Dependency::collect(&record));
        self.state.operators.insert(record.oid, record);
    }
}

impl CatalogMetadata for InMemoryCatalog {
    fn creation_namespace(&self, name: &QualifiedName) -> Result<(NamespaceId, String)> {
        let namespace = match &name.schema {
            Some(schema) => self.namespace_by_name(schema)?,
            None => self
                .state
                .search_path
                .first()
                .copied()
                .ok_or_else(|| CatalogError::undefined("schema", "<search_path>"))?,
        };
        Ok((namespace, name.name.clone()))
    }

    fn namespace_name(&self, id: NamespaceId) -> Result<String> {
        self.state
            .namespaces
            .get(&id)
            .map(|ns| ns.name.clone())
            .ok_or_else(|| CatalogError::internal(format!("cache lookup failed for schema {id}")))
    }

    fn resolve_type(&self, name: &TypeName) -> Result<TypeId> {
        let key = name.name.name.to_ascii_lowercase();
        for ns in self.candidate_namespaces(&name.name)? {
            if let Some(id) = self.state.type_by_name.get(&(ns, key.clone())) {
                return Ok(*id);
            }
        }
        Err(CatalogError::undefined("type", name.name.to_string()))
    }

    fn format_type(&self, id: TypeId) -> String {
        match self.state.types.get(&id) {
            Some(entry) => entry.name.clone(),
            None => format!("type#{id}"),
        }
    }

    fn lookup_function(&self, name: &QualifiedName, args: &[TypeId]) -> Result<Option<FuncId>> {
        self.lookups.lock().push(FunctionLookup {
            name: name.clone(),
            arity: args.len(),
        });
        for ns in self.candidate_namespaces(name)? {
            let found = self
                .state
                .functions
                .iter()
                .filter(|(_, f)| f.namespace == ns && f.name == name.name && f.args == args)
                .map(|(id, _)| *id)
                .min();
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    fn function_return_type(&self, id: FuncId) -> Result<TypeId> {
        self.state
            .functions
            .get(&id)
            .map(|f| f.returns)
            .ok_or_else(|| CatalogError::internal(format!("cache lookup failed for function {id}")))
    }

    fn lookup_operator(
        &self,
        name: &QualifiedName,
        left: Option<TypeId>,
        right: Option<TypeId>,
    ) -> Result<Option<OperatorId>> {
        for ns in self.candidate_namespaces(name)? {
            if let Some(oid) = self.find_operator(ns, &name.name, left, right) {
                return Ok(Some(oid));
            }
        }
        Ok(None)
    }
}

impl AclChecker for InMemoryCatalog {
    fn has_privilege(&self, role: RoleId, object: AclObject, privilege: Privilege) -> bool {
        self.state.superusers.contains(&role)
            || self.is_owner(role, object)
            || self.state.grants.contains(&(role, object, privilege))
            || self
                .state
                .grants
                .contains(&(RoleId::PUBLIC, object, privilege))
    }

    fn is_owner(&self, role: RoleId, object: AclObject) -> bool {
        if self.state.superusers.contains(&role) {
            return true;
        }
        let owner = match object {
            AclObject::Namespace(id) => self.state.namespaces.get(&id).map(|e| e.owner),
            AclObject::Type(id) => self.state.types.get(&id).map(|e| e.owner),
            AclObject::Function(id) => self.state.functions.get(&id).map(|e| e.owner),
            AclObject::Operator(id) => self.state.operators.get(&id).map(|e| e.owner),
        };
        owner == Some(role)
    }
}

impl OperatorStore for InMemoryCatalog {
    fn create_operator(&mut self, spec: OperatorSpec) -> Result<OperatorId> {
        let existing = self.find_operator(spec.namespace, &spec.name, spec.left_type, spec.right_type);
        let (oid, previous) = match existing {
            Some(oid) => {
                let row = self.state.operators.get(&oid).cloned();
                if row.as_ref().map_or(false, |r| !r.is_shell()) {
                    return Err(CatalogError::DuplicateObject {
                        name: self.render_operator(&spec.name, spec.left_type, spec.right_type),
                    });
                }
                if !self.is_owner(spec.owner, AclObject::Operator(oid)) {
                    return Err(CatalogError::NotOwner {
                        kind: ObjectKind::Operator,
                        name: spec.name.clone(),
                    });
                }
                (oid, row)
            }
            None => (OperatorId(self.allocate_oid()), None),
        };
        let creating = Creating {
            oid,
            namespace: spec.namespace,
            name: &spec.name,
            left: spec.left_type,
            right: spec.right_type,
            owner: spec.owner,
        };

        // Links a shell picked up from its peers survive only if the filled-in
        // operator can carry them.
        let binary = spec.left_type.is_some() && spec.right_type.is_some();
        let boolean = spec.result_type == TypeId::BOOL;
        let mut dropped: Vec<(OperatorId, LinkKind)> = Vec::new();
        let mut inherit = |link: Option<OperatorId>, kind: LinkKind, allowed: bool| match link {
            Some(peer) if !allowed => {
                dropped.push((peer, kind));
                None
            }
            link => link,
        };

        let negator = match &spec.negator {
            Some(target) => {
                let peer = self.link_target(target, spec.left_type, spec.right_type, &creating)?;
                if peer == oid {
                    return Err(CatalogError::invalid("operator cannot be its own negator"));
                }
                Some(peer)
            }
            None => inherit(
                previous.as_ref().and_then(|p| p.negator),
                LinkKind::Negator,
                boolean,
            ),
        };
        let commutator = match &spec.commutator {
            Some(target) => {
                Some(self.link_target(target, spec.right_type, spec.left_type, &creating)?)
            }
            None => inherit(
                previous.as_ref().and_then(|p| p.commutator),
                LinkKind::Commutator,
                binary,
            ),
        };
        for (peer, kind) in dropped {
            trace!(oid = oid.0, peer = peer.0, ?kind, "catalog.operator.drop_inherited_link");
            if peer != oid {
                self.clear_reciprocal_link(peer, kind, oid)?;
            }
        }

        let record = OperatorRecord {
            oid,
            name: spec.name,
            namespace: spec.namespace,
            left_type: spec.left_type,
            right_type: spec.right_type,
            function: Some(spec.function),
            result_type: Some(spec.result_type),
            commutator,
            negator,
            can_merge: spec.can_merge,
            can_hash: spec.can_hash,
            restrict: spec.restrict,
            join: spec.join,
            owner: spec.owner,
            version: previous.as_ref().map_or(1, |p| p.version + 1),
        };
        debug!(
            oid = oid.0,
            name = %record.name,
            filled_shell = previous.is_some(),
            "catalog.operator.insert"
        );
        self.write_row(record);

        if let Some(peer) = commutator {
            self.link_back(peer, LinkKind::Commutator, oid);
        }
        if let Some(peer) = negator {
            self.link_back(peer, LinkKind::Negator, oid);
        }
        Ok(oid)
    }

    fn update_operator(&mut self, id: OperatorId, update: OperatorUpdate) -> Result<()> {
        let mut record = self
            .state
            .operators
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::internal(format!("cache lookup failed for operator {id}")))?;
        if let Some(restrict) = update.restrict {
            record.restrict = restrict;
        }
        if let Some(join) = update.join {
            record.join = join;
        }
        record.version += 1;
        trace!(oid = id.0, version = record.version, "catalog.operator.update");
        self.write_row(record);
        Ok(())
    }

    fn delete_operator(&mut self, id: OperatorId, expected_version: u64) -> Result<()> {
        let current = self
            .state
            .operators
            .get(&id)
            .map(|op| op.version)
            .ok_or_else(|| CatalogError::internal(format!("cache lookup failed for operator {id}")))?;
        if current != expected_version {
            return Err(CatalogError::internal(format!(
                "operator {id} deleted from stale snapshot (version {expected_version}, current {current})"
            )));
        }
        self.state.operators.remove(&id);
        self.state.dependencies.remove(&id);
        debug!(oid = id.0, "catalog.operator.delete");
        Ok(())
    }

    fn clear_reciprocal_link(
        &mut self,
        peer: OperatorId,
        kind: LinkKind,
        removed: OperatorId,
    ) -> Result<()> {
        let Some(record) = self.state.operators.get_mut(&peer) else {
            trace!(peer = peer.0, ?kind, "catalog.operator.clear_link.missing_peer");
            return Ok(());
        };
        if record.link(kind) == Some(removed) {
            *record.link_mut(kind) = None;
            record.version += 1;
            trace!(peer = peer.0, removed = removed.0, ?kind, "catalog.operator.clear_link");
        }
        Ok(())
    }

    fn fetch_operator(&self, id: OperatorId) -> Result<Option<OperatorRecord>> {
        Ok(self.state.operators.get(&id).cloned())
    }
}
