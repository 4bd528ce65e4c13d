use tracing::{debug, info};

use super::{lookup_operator_ref, CommandContext};
use crate::catalog::{AclObject, Catalog, LinkKind};
use crate::error::{CatalogError, ObjectKind, Result};
use crate::types::{OperatorId, OperatorRef};

/// Deletes an operator row after unhooking its commutator and negator.
///
/// The caller has already established that `oid` exists, so a failed fetch is
/// an internal error. When the operator is its own commutator the link reset
/// rewrites the row we just read, so it is read again before the delete.
pub fn remove_operator<C: Catalog + ?Sized>(catalog: &mut C, oid: OperatorId) -> Result<()> {
    let mut record = fetch_existing(&*catalog, oid)?;

    if record.commutator.is_some() || record.negator.is_some() {
        if let Some(peer) = record.commutator {
            catalog.clear_reciprocal_link(peer, LinkKind::Commutator, oid)?;
        }
        if let Some(peer) = record.negator {
            catalog.clear_reciprocal_link(peer, LinkKind::Negator, oid)?;
        }
        if record.is_self_linked() {
            debug!(oid = oid.0, "operator.remove.refetch_self_linked");
            record = fetch_existing(&*catalog, oid)?;
        }
    }

    catalog.delete_operator(oid, record.version)?;
    info!(oid = oid.0, name = %record.name, "operator.remove.deleted");
    Ok(())
}

/// `DROP OPERATOR [IF EXISTS] target`: resolves the reference, checks
/// ownership, then removes the row.
///
/// Returns the removed identifier, or `None` when `missing_ok` and nothing
/// matched, including when the reference names an unknown schema or type.
pub fn remove_operator_by_ref<C: Catalog + ?Sized>(
    catalog: &mut C,
    ctx: &CommandContext,
    target: &OperatorRef,
    missing_ok: bool,
) -> Result<Option<OperatorId>> {
    let found = match lookup_operator_ref(&*catalog, target) {
        Err(CatalogError::UndefinedObject { kind, name }) if missing_ok => {
            debug!(operator = %target, kind, %name, "operator.remove.unresolved_reference");
            None
        }
        other => other?,
    };
    let Some(oid) = found else {
        if missing_ok {
            info!(operator = %target, "operator does not exist, skipping");
            return Ok(None);
        }
        return Err(CatalogError::undefined("operator", target.to_string()));
    };
    if !catalog.is_owner(ctx.role, AclObject::Operator(oid)) {
        return Err(CatalogError::NotOwner {
            kind: ObjectKind::Operator,
            name: target.name.to_string(),
        });
    }
    remove_operator(catalog, oid)?;
    Ok(Some(oid))
}

fn fetch_existing<C: Catalog + ?Sized>(catalog: &C, oid: OperatorId) -> Result<crate::catalog::OperatorRecord> {
    catalog
        .fetch_operator(oid)?
        .ok_or_else(|| CatalogError::internal(format!("cache lookup failed for operator {oid}")))
}
