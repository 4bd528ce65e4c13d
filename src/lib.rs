//! Operator catalog commands.
//!
//! `opcat` implements the lifecycle of user-defined operators in a
//! PostgreSQL-style system catalog: defining them (including shell operators
//! created by forward commutator or negator references), changing their
//! selectivity estimators, and removing them while keeping the symmetric
//! commutator/negator links consistent.
//!
//! The commands are written against the traits in [`catalog`], so any storage
//! engine can host them. [`InMemoryCatalog`] is a complete reference
//! implementation.

#![warn(missing_docs)]

pub mod catalog;
pub mod commands;
pub mod error;
pub mod types;

pub use catalog::{
    AclChecker, AclObject, Catalog, CatalogMetadata, InMemoryCatalog, OperatorRecord, OperatorStore,
    Privilege,
};
pub use commands::{
    AttrValue, CommandContext, DefineOutcome, OperatorAttr, OperatorCommandOptions, OperatorCommands,
};
pub use error::{CatalogError, Result};
pub use types::{FuncId, NamespaceId, OperatorId, OperatorRef, QualifiedName, RoleId, TypeId, TypeName};
