#![forbid(unsafe_code)]

//! Operator DDL: `CREATE OPERATOR`, `ALTER OPERATOR ... SET`, `DROP OPERATOR`.
//!
//! Each entry point validates a structured request against the catalog and
//! hands the single resulting write to the [`OperatorStore`](crate::catalog::OperatorStore).
//! Every failure is returned before anything is persisted, except for errors
//! raised by the store itself, which the enclosing transaction rolls back.

/// Estimator function resolution shared by define and alter.
pub mod estimator;

/// Attribute keys and their folding into typed requests.
pub mod options;

/// Runtime configuration for the commands.
pub mod config;

mod alter;
mod define;
mod remove;

pub use alter::alter_operator;
pub use config::{ConfigError, OperatorCommandOptions};
pub use define::{define_operator, is_valid_operator_name, AttributeWarning, DefineOutcome};
pub use options::{AttrValue, OperatorAttr, OperatorOption};
pub use remove::{remove_operator, remove_operator_by_ref};

use crate::catalog::{Catalog, CatalogMetadata};
use crate::error::{CatalogError, Result};
use crate::types::{OperatorId, OperatorRef, QualifiedName, RoleId, TypeId};

/// Who is running a command and under which settings.
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// Acting role for privilege and ownership checks.
    pub role: RoleId,
    /// Command options.
    pub options: OperatorCommandOptions,
}

impl CommandContext {
    /// Context with default options.
    pub fn new(role: RoleId) -> Self {
        Self {
            role,
            options: OperatorCommandOptions::default(),
        }
    }
}

/// Short-lived handle binding a catalog to an acting role.
///
/// ```
/// use opcat::{InMemoryCatalog, OperatorAttr, OperatorCommands, RoleId, TypeId, NamespaceId};
///
/// let mut catalog = InMemoryCatalog::new();
/// catalog.create_function(
///     NamespaceId::PUBLIC,
///     "int_abs",
///     &[TypeId::INT4],
///     TypeId::INT4,
///     RoleId::BOOTSTRAP_SUPERUSER,
/// );
/// let mut commands = OperatorCommands::new(&mut catalog, RoleId::BOOTSTRAP_SUPERUSER);
/// let outcome = commands.define(
///     &"@".into(),
///     &[
///         OperatorAttr::new("right_type", "integer"),
///         OperatorAttr::new("function", "int_abs"),
///     ],
/// )?;
/// assert!(outcome.warnings.is_empty());
/// # Ok::<(), opcat::CatalogError>(())
/// ```
pub struct OperatorCommands<'c, C: Catalog + ?Sized> {
    catalog: &'c mut C,
    ctx: CommandContext,
}

impl<'c, C: Catalog + ?Sized> OperatorCommands<'c, C> {
    /// Binds `catalog` to `role` with default options.
    pub fn new(catalog: &'c mut C, role: RoleId) -> Self {
        Self {
            catalog,
            ctx: CommandContext::new(role),
        }
    }

    /// Replaces the command options.
    pub fn with_options(mut self, options: OperatorCommandOptions) -> Self {
        self.ctx.options = options;
        self
    }

    /// The acting role.
    pub fn role(&self) -> RoleId {
        self.ctx.role
    }

    /// `CREATE OPERATOR name (attributes)`.
    pub fn define(&mut self, name: &QualifiedName, attrs: &[OperatorAttr]) -> Result<DefineOutcome> {
        define_operator(&mut *self.catalog, &self.ctx, name, attrs)
    }

    /// `ALTER OPERATOR target SET (attributes)`.
    pub fn alter(&mut self, target: &OperatorRef, attrs: &[OperatorAttr]) -> Result<()> {
        alter_operator(&mut *self.catalog, &self.ctx, target, attrs)
    }

    /// Drops an operator by identifier. Ownership is the caller's concern.
    pub fn remove(&mut self, oid: OperatorId) -> Result<()> {
        remove_operator(&mut *self.catalog, oid)
    }

    /// `DROP OPERATOR [IF EXISTS] target`.
    pub fn remove_by_ref(&mut self, target: &OperatorRef, missing_ok: bool) -> Result<Option<OperatorId>> {
        remove_operator_by_ref(&mut *self.catalog, &self.ctx, target, missing_ok)
    }
}

/// Renders `name(type, ...)` for diagnostics.
pub(crate) fn render_signature<C: CatalogMetadata + ?Sized>(
    catalog: &C,
    name: &QualifiedName,
    args: &[TypeId],
) -> String {
    let args: Vec<String> = args.iter().map(|t| catalog.format_type(*t)).collect();
    format!("{name}({})", args.join(", "))
}

/// Resolves an operator reference to an existing row, shells included.
pub(crate) fn lookup_operator_ref<C: CatalogMetadata + ?Sized>(
    catalog: &C,
    target: &OperatorRef,
) -> Result<Option<OperatorId>> {
    let Some(right) = &target.right else {
        return Err(CatalogError::invalid_with_detail(
            "operator right argument type must be specified",
            "Postfix operators are not supported.",
        ));
    };
    let left = target
        .left
        .as_ref()
        .map(|t| catalog.resolve_type(t))
        .transpose()?;
    let right = catalog.resolve_type(right)?;
    catalog.lookup_operator(&target.name, left, Some(right))
}
