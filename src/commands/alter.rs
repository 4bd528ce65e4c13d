use tracing::{debug, info};

use super::estimator::{resolve_join_estimator, resolve_restriction_estimator};
use super::options::{fold_alter, OperatorAttr};
use super::{lookup_operator_ref, CommandContext};
use crate::catalog::{AclObject, Catalog, OperatorUpdate};
use crate::error::{CatalogError, ObjectKind, Result};
use crate::types::OperatorRef;

/// `ALTER OPERATOR target SET (restrict = ..., join = ...)`.
///
/// Shape checks run against the stored row, since operands and result type
/// cannot change after creation. Only the estimator columns that were named
/// are written.
pub fn alter_operator<C: Catalog + ?Sized>(
    catalog: &mut C,
    ctx: &CommandContext,
    target: &OperatorRef,
    attrs: &[OperatorAttr],
) -> Result<()> {
    let oid = lookup_operator_ref(&*catalog, target)?
        .ok_or_else(|| CatalogError::undefined("operator", target.to_string()))?;
    let current = catalog
        .fetch_operator(oid)?
        .ok_or_else(|| CatalogError::internal(format!("cache lookup failed for operator {oid}")))?;

    let requested = fold_alter(attrs)?;

    if !catalog.is_owner(ctx.role, AclObject::Operator(oid)) {
        return Err(CatalogError::NotOwner {
            kind: ObjectKind::Operator,
            name: current.name.clone(),
        });
    }

    let restrict = match &requested.restrict {
        Some(Some(name)) => Some(Some(resolve_restriction_estimator(&*catalog, ctx.role, name)?)),
        Some(None) => Some(None),
        None => None,
    };
    let join = match &requested.join {
        Some(Some(name)) => Some(Some(resolve_join_estimator(
            &*catalog,
            ctx.role,
            name,
            ctx.options.allow_legacy_join_signature,
        )?)),
        Some(None) => Some(None),
        None => None,
    };
    let sets_restrict = matches!(restrict, Some(Some(_)));
    let sets_join = matches!(join, Some(Some(_)));

    if !current.is_binary() && sets_join {
        return Err(CatalogError::invalid("only binary operators can have join selectivity"));
    }
    if !current.returns_bool() {
        if sets_restrict {
            return Err(CatalogError::invalid(
                "only boolean operators can have restriction selectivity",
            ));
        }
        if sets_join {
            return Err(CatalogError::invalid("only boolean operators can have join selectivity"));
        }
    }

    let update = OperatorUpdate { restrict, join };
    if update.is_empty() {
        debug!(oid = oid.0, "operator.alter.noop");
        return Ok(());
    }
    catalog.update_operator(oid, update)?;
    info!(
        operator = %target,
        oid = oid.0,
        restrict = ?update.restrict,
        join = ?update.join,
        "operator.alter.updated"
    );
    Ok(())
}
