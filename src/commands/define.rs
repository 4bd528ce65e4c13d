use std::fmt;

use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::estimator::{resolve_join_estimator, resolve_restriction_estimator};
use super::options::{fold_define, DefineAttributes, OperatorAttr};
use super::{render_signature, CommandContext};
use crate::catalog::{AclObject, Catalog, OperatorSpec, Privilege};
use crate::error::{CatalogError, ObjectKind, Result};
use crate::types::{FuncId, OperatorId, QualifiedName, TypeId};

/// Characters an operator symbol may be built from.
const OPERATOR_CHARS: &str = "+-*/<>=~!@#%^&|`?";
/// Characters that license a trailing `+` or `-` in a multi-character symbol.
const TRAILING_SIGN_LICENSE: &str = "~!@#%^&|`?";

/// Non-fatal notice raised while defining an operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeWarning {
    /// Unrecognised key as supplied.
    pub attr: String,
}

impl fmt::Display for AttributeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operator attribute \"{}\" not recognized", self.attr)
    }
}

/// Result of a successful definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefineOutcome {
    /// Identifier of the new (or filled-in shell) operator.
    pub oid: OperatorId,
    /// Notices for attributes that were ignored.
    pub warnings: Vec<AttributeWarning>,
}

/// Checks that `name` is usable as an operator symbol.
pub fn is_valid_operator_name(name: &str, max_len: usize) -> bool {
    if name.is_empty() || name.len() >= max_len {
        return false;
    }
    if !name.chars().all(|c| OPERATOR_CHARS.contains(c)) {
        return false;
    }
    if name.contains("--") || name.contains("/*") {
        return false;
    }
    if name.len() > 1 && (name.ends_with('+') || name.ends_with('-')) {
        return name.chars().any(|c| TRAILING_SIGN_LICENSE.contains(c));
    }
    true
}

/// Validates a `CREATE OPERATOR` request and persists it.
///
/// All checks run before the single call to
/// [`OperatorStore::create_operator`](crate::catalog::OperatorStore::create_operator);
/// commutator and negator are forwarded by name.
pub fn define_operator<C: Catalog + ?Sized>(
    catalog: &mut C,
    ctx: &CommandContext,
    name: &QualifiedName,
    attrs: &[OperatorAttr],
) -> Result<DefineOutcome> {
    let role = ctx.role;
    let (namespace, op_name) = catalog.creation_namespace(name)?;
    if !catalog.has_privilege(role, AclObject::Namespace(namespace), Privilege::Create) {
        return Err(CatalogError::PermissionDenied {
            kind: ObjectKind::Schema,
            name: catalog.namespace_name(namespace)?,
        });
    }

    let attrs = fold_define(attrs)?;
    let warnings: Vec<AttributeWarning> = attrs
        .unrecognized
        .iter()
        .map(|attr| AttributeWarning { attr: attr.clone() })
        .collect();
    for warning in &warnings {
        warn!(operator = %name, attr = %warning.attr, "{warning}");
    }

    let Some(function_name) = attrs.function.as_ref() else {
        return Err(CatalogError::invalid("operator function must be specified"));
    };

    let left = attrs
        .left_type
        .as_ref()
        .map(|t| catalog.resolve_type(t))
        .transpose()?;
    let right = attrs
        .right_type
        .as_ref()
        .map(|t| catalog.resolve_type(t))
        .transpose()?;
    let right = match (left, right) {
        (None, None) => {
            return Err(CatalogError::invalid(
                "operator argument types must be specified",
            ))
        }
        (Some(_), None) => {
            return Err(CatalogError::invalid_with_detail(
                "operator right argument type must be specified",
                "Postfix operators are not supported.",
            ))
        }
        (_, Some(right)) => right,
    };
    for ty in left.iter().chain(std::iter::once(&right)) {
        require_type_usage(&*catalog, ctx, *ty)?;
    }

    let args: SmallVec<[TypeId; 2]> = left.into_iter().chain(std::iter::once(right)).collect();
    let function = catalog
        .lookup_function(function_name, &args)?
        .ok_or_else(|| CatalogError::UndefinedFunction {
            signature: render_signature(&*catalog, function_name, &args),
        })?;
    if !catalog.has_privilege(role, AclObject::Function(function), Privilege::Execute) {
        return Err(CatalogError::PermissionDenied {
            kind: ObjectKind::Function,
            name: function_name.to_string(),
        });
    }
    let result_type = catalog.function_return_type(function)?;
    require_type_usage(&*catalog, ctx, result_type)?;
    debug!(
        operator = %name,
        arity = args.len(),
        func = function.0,
        result = result_type.0,
        "operator.define.resolved"
    );

    let restrict = attrs
        .restrict
        .as_ref()
        .map(|n| resolve_restriction_estimator(&*catalog, role, n))
        .transpose()?;
    let join = attrs
        .join
        .as_ref()
        .map(|n| resolve_join_estimator(&*catalog, role, n, ctx.options.allow_legacy_join_signature))
        .transpose()?;

    if !is_valid_operator_name(&op_name, ctx.options.max_name_len) {
        return Err(CatalogError::InvalidName { name: op_name });
    }
    check_shape(&attrs, left.is_some(), result_type, restrict, join)?;

    let spec = OperatorSpec {
        name: op_name,
        namespace,
        left_type: left,
        right_type: Some(right),
        function,
        result_type,
        commutator: attrs.commutator,
        negator: attrs.negator,
        restrict,
        join,
        can_merge: attrs.can_merge,
        can_hash: attrs.can_hash,
        owner: role,
    };
    let oid = catalog.create_operator(spec)?;
    info!(operator = %name, oid = oid.0, "operator.define.created");
    Ok(DefineOutcome { oid, warnings })
}

fn require_type_usage<C: Catalog + ?Sized>(
    catalog: &C,
    ctx: &CommandContext,
    ty: TypeId,
) -> Result<()> {
    if catalog.has_privilege(ctx.role, AclObject::Type(ty), Privilege::Usage) {
        return Ok(());
    }
    Err(CatalogError::PermissionDenied {
        kind: ObjectKind::Type,
        name: catalog.format_type(ty),
    })
}

/// Rejects bindings that the operator's shape cannot carry.
fn check_shape(
    attrs: &DefineAttributes,
    binary: bool,
    result_type: TypeId,
    restrict: Option<FuncId>,
    join: Option<FuncId>,
) -> Result<()> {
    if !binary {
        if attrs.commutator.is_some() {
            return Err(CatalogError::invalid("only binary operators can have commutators"));
        }
        if join.is_some() {
            return Err(CatalogError::invalid("only binary operators can have join selectivity"));
        }
        if attrs.can_merge {
            return Err(CatalogError::invalid("only binary operators can merge join"));
        }
        if attrs.can_hash {
            return Err(CatalogError::invalid("only binary operators can hash"));
        }
    }
    if result_type != TypeId::BOOL {
        if attrs.negator.is_some() {
            return Err(CatalogError::invalid("only boolean operators can have negators"));
        }
        if restrict.is_some() {
            return Err(CatalogError::invalid(
                "only boolean operators can have restriction selectivity",
            ));
        }
        if join.is_some() {
            return Err(CatalogError::invalid("only boolean operators can have join selectivity"));
        }
        if attrs.can_merge {
            return Err(CatalogError::invalid("only boolean operators can merge join"));
        }
        if attrs.can_hash {
            return Err(CatalogError::invalid("only boolean operators can hash"));
        }
    }
    Ok(())
}
