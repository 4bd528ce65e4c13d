#![forbid(unsafe_code)]

//! Selectivity estimator lookup.
//!
//! Restriction estimators have one accepted signature. Join estimators gained
//! a fifth `SpecialJoinInfo` argument at some point; the four-argument form is
//! still accepted, but a name overloaded across both forms is rejected instead
//! of silently preferring one.

use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use super::render_signature;
use crate::catalog::{AclChecker, AclObject, CatalogMetadata, Privilege};
use crate::error::{CatalogError, ObjectKind, Result};
use crate::types::{FuncId, QualifiedName, RoleId, TypeId};

/// `(planner info, operator oid, argument list, var relid)`
pub const RESTRICT_SIGNATURE: [TypeId; 4] =
    [TypeId::INTERNAL, TypeId::OID, TypeId::INTERNAL, TypeId::INT4];

/// `(planner info, operator oid, argument list, join type, special join info)`
pub const JOIN_SIGNATURE: [TypeId; 5] = [
    TypeId::INTERNAL,
    TypeId::OID,
    TypeId::INTERNAL,
    TypeId::INT2,
    TypeId::INTERNAL,
];

/// Join estimator signature predating the special-join-info argument.
pub const LEGACY_JOIN_SIGNATURE: [TypeId; 4] =
    [TypeId::INTERNAL, TypeId::OID, TypeId::INTERNAL, TypeId::INT2];

/// Which estimator slot a function is being validated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EstimatorKind {
    /// Selectivity of `column OP constant`.
    Restriction,
    /// Selectivity of `a OP b` across a join.
    Join,
}

impl EstimatorKind {
    fn label(self) -> &'static str {
        match self {
            EstimatorKind::Restriction => "restriction",
            EstimatorKind::Join => "join",
        }
    }
}

/// Outcome of resolving a name against several acceptable signatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureMatch {
    /// Exactly one distinct function matched.
    Unique(FuncId),
    /// Distinct functions matched different signatures.
    Ambiguous(SmallVec<[FuncId; 2]>),
    /// Nothing matched.
    Missing,
}

/// Looks `name` up against every signature in `signatures` (newest first).
///
/// Two signatures resolving to the same function count as one match.
pub fn resolve_by_signatures<C: CatalogMetadata + ?Sized>(
    catalog: &C,
    name: &QualifiedName,
    signatures: &[&[TypeId]],
) -> Result<SignatureMatch> {
    let mut found: SmallVec<[FuncId; 2]> = SmallVec::new();
    for signature in signatures {
        if let Some(id) = catalog.lookup_function(name, signature)? {
            trace!(%name, arity = signature.len(), func = id.0, "estimator.signature.hit");
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    Ok(match found.len() {
        0 => SignatureMatch::Missing,
        1 => SignatureMatch::Unique(found[0]),
        _ => SignatureMatch::Ambiguous(found),
    })
}

/// Resolves and validates a restriction estimator.
pub fn resolve_restriction_estimator<C>(catalog: &C, role: RoleId, name: &QualifiedName) -> Result<FuncId>
where
    C: CatalogMetadata + AclChecker + ?Sized,
{
    let func = match resolve_by_signatures(catalog, name, &[&RESTRICT_SIGNATURE[..]])? {
        SignatureMatch::Unique(id) => id,
        _ => {
            return Err(CatalogError::UndefinedFunction {
                signature: render_signature(catalog, name, &RESTRICT_SIGNATURE),
            })
        }
    };
    check_estimator(catalog, role, name, func, EstimatorKind::Restriction)
}

/// Resolves and validates a join estimator.
///
/// With `allow_legacy` unset only the current five-argument signature is
/// considered.
pub fn resolve_join_estimator<C>(
    catalog: &C,
    role: RoleId,
    name: &QualifiedName,
    allow_legacy: bool,
) -> Result<FuncId>
where
    C: CatalogMetadata + AclChecker + ?Sized,
{
    let mut signatures: SmallVec<[&[TypeId]; 2]> = smallvec![&JOIN_SIGNATURE[..]];
    if allow_legacy {
        signatures.push(&LEGACY_JOIN_SIGNATURE[..]);
    }
    let func = match resolve_by_signatures(catalog, name, &signatures)? {
        SignatureMatch::Unique(id) => id,
        SignatureMatch::Ambiguous(candidates) => {
            debug!(%name, ?candidates, "estimator.join.ambiguous");
            return Err(CatalogError::AmbiguousFunction {
                name: name.to_string(),
            });
        }
        SignatureMatch::Missing => {
            return Err(CatalogError::UndefinedFunction {
                signature: render_signature(catalog, name, &JOIN_SIGNATURE),
            })
        }
    };
    check_estimator(catalog, role, name, func, EstimatorKind::Join)
}

fn check_estimator<C>(
    catalog: &C,
    role: RoleId,
    name: &QualifiedName,
    func: FuncId,
    kind: EstimatorKind,
) -> Result<FuncId>
where
    C: CatalogMetadata + AclChecker + ?Sized,
{
    if catalog.function_return_type(func)? != TypeId::FLOAT8 {
        return Err(CatalogError::invalid(format!(
            "{} estimator function {name} must return type float8",
            kind.label()
        )));
    }
    if !catalog.has_privilege(role, AclObject::Function(func), Privilege::Execute) {
        return Err(CatalogError::PermissionDenied {
            kind: ObjectKind::Function,
            name: name.to_string(),
        });
    }
    Ok(func)
}
