#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::fmt;

use tracing::trace;

use crate::error::{CatalogError, Result};
use crate::types::{QualifiedName, TypeName};

/// Loosely typed attribute argument as produced by a statement parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrValue {
    /// Bare word or quoted string.
    Text(String),
    /// Integer literal.
    Int(i64),
    /// Boolean literal.
    Bool(bool),
    /// Already-split object name.
    Name(QualifiedName),
    /// Type reference, possibly `SETOF`.
    Type(TypeName),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<QualifiedName> for AttrValue {
    fn from(value: QualifiedName) -> Self {
        AttrValue::Name(value)
    }
}

impl From<TypeName> for AttrValue {
    fn from(value: TypeName) -> Self {
        AttrValue::Type(value)
    }
}

/// One `key = value` element of an operator definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorAttr {
    /// Attribute key as written.
    pub key: String,
    /// Argument; `None` for a bare key or an explicit `NONE`.
    pub value: Option<AttrValue>,
}

impl OperatorAttr {
    /// `key = value`.
    pub fn new(key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// A key with no argument (`HASHES`, or `RESTRICT = NONE` in ALTER).
    pub fn bare(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    fn name_arg(&self) -> Result<QualifiedName> {
        match &self.value {
            None => Err(CatalogError::invalid(format!("{} requires a parameter", self.key))),
            Some(value) => name_from_value(&self.key, value),
        }
    }

    fn type_arg(&self) -> Result<TypeName> {
        match &self.value {
            None => Err(CatalogError::invalid(format!("{} requires a parameter", self.key))),
            Some(AttrValue::Type(t)) => Ok(t.clone()),
            Some(AttrValue::Name(n)) => Ok(TypeName::new(n.clone())),
            Some(AttrValue::Text(s)) => Ok(TypeName::new(QualifiedName::parse(s))),
            Some(_) => Err(CatalogError::invalid(format!(
                "argument of {} must be a type name",
                self.key
            ))),
        }
    }

    fn bool_arg(&self) -> Result<bool> {
        let parsed = match &self.value {
            None => Some(true),
            Some(AttrValue::Bool(b)) => Some(*b),
            Some(AttrValue::Int(0)) => Some(false),
            Some(AttrValue::Int(1)) => Some(true),
            Some(AttrValue::Text(s)) => parse_bool(s),
            Some(_) => None,
        };
        parsed.ok_or_else(|| CatalogError::invalid(format!("{} requires a Boolean value", self.key)))
    }
}

fn name_from_value(key: &str, value: &AttrValue) -> Result<QualifiedName> {
    match value {
        AttrValue::Name(n) => Ok(n.clone()),
        AttrValue::Text(s) => Ok(QualifiedName::parse(s)),
        AttrValue::Type(t) if !t.setof => Ok(t.name.clone()),
        _ => Err(CatalogError::invalid(format!(
            "argument of {key} must be a name"
        ))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Closed set of operator attribute keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatorOption {
    /// `left_type` / `leftarg`
    LeftType,
    /// `right_type` / `rightarg`
    RightType,
    /// `function` / `procedure`
    Function,
    /// `commutator`
    Commutator,
    /// `negator`
    Negator,
    /// `restrict`
    Restrict,
    /// `join`
    Join,
    /// `hashes`
    Hashes,
    /// `merges`
    Merges,
    /// Obsolete sort-operator keys, each meaning `merges = true`.
    LegacyMerges(&'static str),
    /// Anything else.
    Unrecognized(String),
}

impl OperatorOption {
    /// Classifies a key, case-insensitively.
    pub fn parse(key: &str) -> Self {
        match key.to_ascii_lowercase().as_str() {
            "left_type" | "leftarg" => OperatorOption::LeftType,
            "right_type" | "rightarg" => OperatorOption::RightType,
            "function" | "procedure" => OperatorOption::Function,
            "commutator" => OperatorOption::Commutator,
            "negator" => OperatorOption::Negator,
            "restrict" => OperatorOption::Restrict,
            "join" => OperatorOption::Join,
            "hashes" => OperatorOption::Hashes,
            "merges" => OperatorOption::Merges,
            "sort1" => OperatorOption::LegacyMerges("sort1"),
            "sort2" => OperatorOption::LegacyMerges("sort2"),
            "ltcmp" => OperatorOption::LegacyMerges("ltcmp"),
            "gtcmp" => OperatorOption::LegacyMerges("gtcmp"),
            _ => OperatorOption::Unrecognized(key.to_string()),
        }
    }

    /// Whether ALTER may change this attribute.
    pub fn is_alterable(&self) -> bool {
        matches!(self, OperatorOption::Restrict | OperatorOption::Join)
    }

    /// Creation-time attributes ALTER reports as immutable rather than unknown.
    pub fn is_immutable(&self) -> bool {
        !self.is_alterable()
            && !matches!(
                self,
                OperatorOption::LegacyMerges(_) | OperatorOption::Unrecognized(_)
            )
    }
}

impl fmt::Display for OperatorOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            OperatorOption::LeftType => "left_type",
            OperatorOption::RightType => "right_type",
            OperatorOption::Function => "function",
            OperatorOption::Commutator => "commutator",
            OperatorOption::Negator => "negator",
            OperatorOption::Restrict => "restrict",
            OperatorOption::Join => "join",
            OperatorOption::Hashes => "hashes",
            OperatorOption::Merges => "merges",
            OperatorOption::LegacyMerges(key) => *key,
            OperatorOption::Unrecognized(key) => key.as_str(),
        };
        f.write_str(key)
    }
}

/// Attributes of a `CREATE OPERATOR`, folded into typed slots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefineAttributes {
    pub left_type: Option<TypeName>,
    pub right_type: Option<TypeName>,
    pub function: Option<QualifiedName>,
    pub commutator: Option<QualifiedName>,
    pub negator: Option<QualifiedName>,
    pub restrict: Option<QualifiedName>,
    pub join: Option<QualifiedName>,
    pub can_hash: bool,
    pub can_merge: bool,
    /// Keys that matched nothing, in input order.
    pub unrecognized: Vec<String>,
}

fn operand_type(attr: &OperatorAttr) -> Result<TypeName> {
    let ty = attr.type_arg()?;
    if ty.setof {
        return Err(CatalogError::invalid(
            "SETOF type not allowed for operator argument",
        ));
    }
    Ok(ty)
}

/// Folds a definition's attribute list. Unknown keys are collected rather
/// than rejected; a later duplicate key overrides an earlier one.
pub fn fold_define(attrs: &[OperatorAttr]) -> Result<DefineAttributes> {
    let mut out = DefineAttributes::default();
    for attr in attrs {
        let option = OperatorOption::parse(&attr.key);
        trace!(%option, "operator.define.attr");
        match option {
            OperatorOption::LeftType => out.left_type = Some(operand_type(attr)?),
            OperatorOption::RightType => out.right_type = Some(operand_type(attr)?),
            OperatorOption::Function => out.function = Some(attr.name_arg()?),
            OperatorOption::Commutator => out.commutator = Some(attr.name_arg()?),
            OperatorOption::Negator => out.negator = Some(attr.name_arg()?),
            OperatorOption::Restrict => out.restrict = Some(attr.name_arg()?),
            OperatorOption::Join => out.join = Some(attr.name_arg()?),
            OperatorOption::Hashes => out.can_hash = attr.bool_arg()?,
            OperatorOption::Merges => out.can_merge = attr.bool_arg()?,
            OperatorOption::LegacyMerges(_) => out.can_merge = true,
            OperatorOption::Unrecognized(key) => out.unrecognized.push(key),
        }
    }
    Ok(out)
}

/// Estimator changes requested by an `ALTER OPERATOR`.
///
/// Outer `None`: untouched. `Some(None)`: clear. `Some(Some(name))`: resolve.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlterAttributes {
    pub restrict: Option<Option<QualifiedName>>,
    pub join: Option<Option<QualifiedName>>,
}

/// Folds an alteration's attribute list; anything but the estimators fails.
pub fn fold_alter(attrs: &[OperatorAttr]) -> Result<AlterAttributes> {
    let mut out = AlterAttributes::default();
    for attr in attrs {
        let value = || match &attr.value {
            None => Ok(None),
            Some(value) => name_from_value(&attr.key, value).map(Some),
        };
        let option = OperatorOption::parse(&attr.key);
        match option {
            OperatorOption::Restrict => out.restrict = Some(value()?),
            OperatorOption::Join => out.join = Some(value()?),
            _ if option.is_immutable() => {
                return Err(CatalogError::ImmutableAttribute {
                    attr: attr.key.clone(),
                })
            }
            _ => {
                return Err(CatalogError::UnrecognizedAttribute {
                    attr: attr.key.clone(),
                })
            }
        }
    }
    Ok(out)
}
