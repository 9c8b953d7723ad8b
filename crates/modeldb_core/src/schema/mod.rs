//! Schema derivation.
//!
//! Entity declarations ([`EntityDecl`]) are classified into field
//! descriptors, wrapped into [`TableDescriptor`]s and collected by the
//! [`SchemaRegistry`], which orders table creation and rejects reference
//! cycles. The [`drift`] module compares derived DDL with what the store
//! recorded.
//!
//! Table and column names are derived deterministically:
//!
//! | Item | Name |
//! |------|------|
//! | Entity table | `<Entity>_table` |
//! | Scalar column | `<attribute>` |
//! | Foreign key column | `fk_<attribute>_id` |
//! | Junction table | `<Entity>_<attribute>_list_table` |
//! | Junction owner column | `fk_self_<owner table>_id` |
//! | Junction target column | `fk_<target table>_id` |

mod classify;
pub mod drift;
mod registry;
mod table;

pub use classify::classify;
pub use registry::SchemaRegistry;
pub use table::{default_for, FieldDescriptor, FieldKind, FieldType, Relation, TableDescriptor};

use modeldb_storage::ColumnType;

/// Name of the identifier attribute and column.
pub const ID: &str = "id";

/// Table name for an entity.
#[must_use]
pub fn table_name(entity: &str) -> String {
    format!("{entity}_table")
}

/// Column name for a foreign key attribute.
#[must_use]
pub fn foreign_key_column(attribute: &str) -> String {
    format!("fk_{attribute}_id")
}

/// Table name for the junction table behind a many-valued attribute.
#[must_use]
pub fn junction_table_name(entity: &str, attribute: &str) -> String {
    format!("{entity}_{attribute}_list_table")
}

/// Junction column holding the owning row's id.
#[must_use]
pub fn junction_owner_column(owner_table: &str) -> String {
    format!("fk_self_{owner_table}_id")
}

/// Junction column holding the related row's id.
#[must_use]
pub fn junction_target_column(target_table: &str) -> String {
    format!("fk_{target_table}_id")
}

/// Returns true if `name` matches `[a-zA-Z_][a-zA-Z0-9_]*`.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// How many values an accessor yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// A single value.
    One,
    /// A many-valued relation.
    Many,
}

/// The declared value type of an accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    /// A scalar stored in a column of the given type.
    Primitive(ColumnType),
    /// Another entity type, by name.
    Entity(String),
    /// A type the classifier cannot map, by name.
    Unrecognized(String),
}

impl DeclaredType {
    fn type_name(&self) -> String {
        match self {
            Self::Primitive(ty) => ty.as_sql().to_string(),
            Self::Entity(name) | Self::Unrecognized(name) => name.clone(),
        }
    }
}

/// One accessor of an entity declaration.
///
/// An accessor describes an attribute the way application code sees it: a
/// name, how many parameters it takes, what it returns, and which entity
/// its attribute type is scoped to. Only accessors with no parameters, a
/// return type, and a scope equal to the declaring entity are valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorDecl {
    name: String,
    params: usize,
    returns: Option<(Arity, DeclaredType)>,
    scope: Option<String>,
}

impl AccessorDecl {
    /// An accessor with no parameters, no return type and no scope.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: 0,
            returns: None,
            scope: None,
        }
    }

    /// Sets the number of parameters.
    #[must_use]
    pub fn params(mut self, count: usize) -> Self {
        self.params = count;
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, arity: Arity, ty: DeclaredType) -> Self {
        self.returns = Some((arity, ty));
        self
    }

    /// Scopes the attribute type to `owner`.
    #[must_use]
    pub fn scoped_to(mut self, owner: impl Into<String>) -> Self {
        self.scope = Some(owner.into());
        self
    }

    /// The accessor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of parameters.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params
    }

    /// The return type, if any.
    #[must_use]
    pub fn return_type(&self) -> Option<&(Arity, DeclaredType)> {
        self.returns.as_ref()
    }

    /// The entity the attribute type is scoped to.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

/// The declaration of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    name: String,
    accessors: Vec<AccessorDecl>,
}

impl EntityDecl {
    /// Starts a declaration of `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EntityDeclBuilder {
        EntityDeclBuilder {
            decl: Self {
                name: name.into(),
                accessors: Vec::new(),
            },
        }
    }

    /// The entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared accessors, in declaration order.
    #[must_use]
    pub fn accessors(&self) -> &[AccessorDecl] {
        &self.accessors
    }

    /// The entity's table name.
    #[must_use]
    pub fn table_name(&self) -> String {
        table_name(&self.name)
    }

    /// Names of the junction tables this entity owns.
    #[must_use]
    pub fn junction_table_names(&self) -> Vec<String> {
        self.accessors
            .iter()
            .filter(|a| matches!(a.returns, Some((Arity::Many, _))))
            .map(|a| junction_table_name(&self.name, &a.name))
            .collect()
    }
}

/// Builder for [`EntityDecl`].
///
/// The `value`, `reference` and `list` helpers add well-formed accessors
/// scoped to the entity being built; [`EntityDeclBuilder::accessor`] adds an
/// arbitrary one.
#[derive(Debug, Clone)]
pub struct EntityDeclBuilder {
    decl: EntityDecl,
}

impl EntityDeclBuilder {
    /// Adds a scalar attribute.
    #[must_use]
    pub fn value(self, name: impl Into<String>, ty: ColumnType) -> Self {
        let owner = self.decl.name.clone();
        self.accessor(
            AccessorDecl::new(name)
                .returns(Arity::One, DeclaredType::Primitive(ty))
                .scoped_to(owner),
        )
    }

    /// Adds a single foreign key to `target`.
    #[must_use]
    pub fn reference(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        let owner = self.decl.name.clone();
        self.accessor(
            AccessorDecl::new(name)
                .returns(Arity::One, DeclaredType::Entity(target.into()))
                .scoped_to(owner),
        )
    }

    /// Adds a many-valued relation to `target`.
    #[must_use]
    pub fn list(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        let owner = self.decl.name.clone();
        self.accessor(
            AccessorDecl::new(name)
                .returns(Arity::Many, DeclaredType::Entity(target.into()))
                .scoped_to(owner),
        )
    }

    /// Adds an accessor as is.
    #[must_use]
    pub fn accessor(mut self, accessor: AccessorDecl) -> Self {
        self.decl.accessors.push(accessor);
        self
    }

    /// Finishes the declaration.
    #[must_use]
    pub fn build(self) -> EntityDecl {
        self.decl
    }
}
