#![forbid(unsafe_code)]

//! Catalog identifiers and name forms shared by every operator command.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a schema (namespace).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct NamespaceId(pub u32);
/// Identifier of a data type.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct TypeId(pub u32);
/// Identifier of a function.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct FuncId(pub u32);
/// Identifier of an operator row.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct OperatorId(pub u32);
/// Identifier of a role (principal).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct RoleId(pub u32);

impl TypeId {
    /// `bool`
    pub const BOOL: TypeId = TypeId(16);
    /// `int8`
    pub const INT8: TypeId = TypeId(20);
    /// `int2`, the join-type argument of join estimators.
    pub const INT2: TypeId = TypeId(21);
    /// `int4`, the relation hint argument of restriction estimators.
    pub const INT4: TypeId = TypeId(23);
    /// `text`
    pub const TEXT: TypeId = TypeId(25);
    /// `oid`, carries the operator identifier into estimators.
    pub const OID: TypeId = TypeId(26);
    /// `float8`, the mandatory estimator return type.
    pub const FLOAT8: TypeId = TypeId(701);
    /// `internal`, opaque planner structures.
    pub const INTERNAL: TypeId = TypeId(2281);

    /// Canonical names of the built-in types, in registration order.
    pub const BUILTINS: [(TypeId, &'static str); 8] = [
        (TypeId::BOOL, "boolean"),
        (TypeId::INT8, "bigint"),
        (TypeId::INT2, "smallint"),
        (TypeId::INT4, "integer"),
        (TypeId::TEXT, "text"),
        (TypeId::OID, "oid"),
        (TypeId::FLOAT8, "double precision"),
        (TypeId::INTERNAL, "internal"),
    ];

    /// Returns the canonical name of a built-in type.
    pub fn builtin_name(self) -> Option<&'static str> {
        Self::BUILTINS
            .iter()
            .find(|(id, _)| *id == self)
            .map(|(_, name)| *name)
    }
}

impl NamespaceId {
    /// The system schema that holds built-in types.
    pub const PG_CATALOG: NamespaceId = NamespaceId(11);
    /// The default user schema.
    pub const PUBLIC: NamespaceId = NamespaceId(2200);
}

impl RoleId {
    /// Pseudo-role whose grants apply to every role.
    pub const PUBLIC: RoleId = RoleId(0);
    /// The bootstrap superuser.
    pub const BOOTSTRAP_SUPERUSER: RoleId = RoleId(10);
}

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

display_id!(NamespaceId, TypeId, FuncId, OperatorId, RoleId);

/// A possibly schema-qualified object name such as `public.my_func`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Explicit schema, when the name was qualified.
    pub schema: Option<String>,
    /// Unqualified object name.
    pub name: String,
}

impl QualifiedName {
    /// Builds an unqualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Builds a schema-qualified name.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Splits a dotted path (`schema.name`) into its parts.
    ///
    /// Operator symbols may themselves contain no dots, so only the last dot
    /// separates the schema.
    pub fn parse(path: &str) -> Self {
        match path.rsplit_once('.') {
            Some((schema, name)) if !schema.is_empty() && !name.is_empty() => {
                Self::qualified(schema, name)
            }
            _ => Self::new(path),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(value: &str) -> Self {
        QualifiedName::parse(value)
    }
}

/// A type reference as written in a definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeName {
    /// Type name, possibly schema-qualified.
    pub name: QualifiedName,
    /// `SETOF` marker; never legal for operator operands.
    #[serde(default)]
    pub setof: bool,
}

impl TypeName {
    /// References a plain (non-set) type.
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        Self {
            name: name.into(),
            setof: false,
        }
    }

    /// References a set-returning form of the type.
    pub fn setof(name: impl Into<QualifiedName>) -> Self {
        Self {
            name: name.into(),
            setof: true,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.setof {
            write!(f, "SETOF {}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        TypeName::new(value)
    }
}

/// Names an existing operator by symbol and operand types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRef {
    /// Operator symbol, possibly schema-qualified.
    pub name: QualifiedName,
    /// Left operand type; absent for prefix operators.
    pub left: Option<TypeName>,
    /// Right operand type.
    pub right: Option<TypeName>,
}

impl OperatorRef {
    /// References a binary operator.
    pub fn binary(
        name: impl Into<QualifiedName>,
        left: impl Into<TypeName>,
        right: impl Into<TypeName>,
    ) -> Self {
        Self {
            name: name.into(),
            left: Some(left.into()),
            right: Some(right.into()),
        }
    }

    /// References a prefix operator.
    pub fn prefix(name: impl Into<QualifiedName>, right: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            left: None,
            right: Some(right.into()),
        }
    }
}

impl fmt::Display for OperatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |t: &Option<TypeName>| match t {
            Some(t) => t.to_string(),
            None => "NONE".to_string(),
        };
        write!(f, "{}({}, {})", self.name, side(&self.left), side(&self.right))
    }
}
