//! Table and field descriptors.

use super::{
    junction_owner_column, junction_table_name, junction_target_column, table_name, ID,
};
use modeldb_storage::{ColumnType, SqlValue};

/// Kind of a classified attribute.
///
/// The declaration order is also the order fields appear in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKind {
    /// The integer surrogate key.
    Id,
    /// A scalar column.
    Value,
    /// A nullable reference to another entity's row.
    ForeignKey,
    /// A many-valued relation stored in a junction table.
    IntermediateTable,
}

/// Value type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// The surrogate key.
    Key,
    /// A scalar of the given column type.
    Scalar(ColumnType),
    /// Rows of the named entity.
    Entity(String),
}

/// One classified attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    attribute: String,
    column: String,
    kind: FieldKind,
    ty: FieldType,
}

impl FieldDescriptor {
    pub(crate) fn id() -> Self {
        Self {
            attribute: ID.to_string(),
            column: ID.to_string(),
            kind: FieldKind::Id,
            ty: FieldType::Key,
        }
    }

    pub(crate) fn value(attribute: &str, ty: ColumnType) -> Self {
        Self {
            attribute: attribute.to_string(),
            column: attribute.to_string(),
            kind: FieldKind::Value,
            ty: FieldType::Scalar(ty),
        }
    }

    pub(crate) fn foreign_key(attribute: &str, column: String, target: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            column,
            kind: FieldKind::ForeignKey,
            ty: FieldType::Entity(target.to_string()),
        }
    }

    pub(crate) fn intermediate(owner: &str, attribute: &str, target: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            column: junction_table_name(owner, attribute),
            kind: FieldKind::IntermediateTable,
            ty: FieldType::Entity(target.to_string()),
        }
    }

    /// The attribute name.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The column name, or the junction table name for
    /// [`FieldKind::IntermediateTable`].
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The field kind.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The field's value type.
    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    /// The referenced entity for foreign keys and relations.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match &self.ty {
            FieldType::Entity(name) => Some(name),
            _ => None,
        }
    }

    /// Returns true if the column may hold `NULL`.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::ForeignKey | FieldKind::IntermediateTable
        )
    }

    /// Returns true if the field is stored in a column of its own table.
    #[must_use]
    pub fn has_column(&self) -> bool {
        self.kind != FieldKind::IntermediateTable
    }

    /// The value a fresh row gets, for fields that are inserted.
    ///
    /// Scalars default to an empty string, zero or false; foreign keys to
    /// `NULL`. The id and relations are never part of an insert.
    #[must_use]
    pub fn default_value(&self) -> Option<SqlValue> {
        match (&self.kind, &self.ty) {
            (FieldKind::Value, FieldType::Scalar(ty)) => Some(default_for(*ty)),
            (FieldKind::ForeignKey, _) => Some(SqlValue::Null),
            _ => None,
        }
    }

    fn column_sql(&self) -> Option<String> {
        match (&self.kind, &self.ty) {
            (FieldKind::Id, _) => Some(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.column)),
            (FieldKind::Value, FieldType::Scalar(ty)) => {
                Some(format!("{} {} NOT NULL", self.column, ty.as_sql()))
            }
            (FieldKind::ForeignKey, FieldType::Entity(target)) => Some(format!(
                "{} INTEGER REFERENCES {}({ID})",
                self.column,
                table_name(target)
            )),
            _ => None,
        }
    }
}

/// Default value of a scalar column type.
#[must_use]
pub fn default_for(ty: ColumnType) -> SqlValue {
    match ty {
        ColumnType::Text => SqlValue::Text(String::new()),
        ColumnType::Integer | ColumnType::BigInt | ColumnType::SmallInt | ColumnType::TinyInt => {
            SqlValue::Integer(0)
        }
        ColumnType::Double | ColumnType::Float => SqlValue::Real(0.0),
        ColumnType::Boolean => SqlValue::Bool(false),
    }
}

/// The relation a junction table stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    owner: String,
    attribute: String,
    target: String,
    owner_column: String,
    target_column: String,
}

impl Relation {
    /// The entity owning the relation.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The owning attribute.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The related entity.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Column holding the owner's row id.
    #[must_use]
    pub fn owner_column(&self) -> &str {
        &self.owner_column
    }

    /// Column holding the related row id.
    #[must_use]
    pub fn target_column(&self) -> &str {
        &self.target_column
    }
}

/// A derived table definition.
///
/// Built once when the schema registry is created and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: String,
    entity: Option<String>,
    fields: Vec<FieldDescriptor>,
    relation: Option<Relation>,
}

impl TableDescriptor {
    /// Table of an entity, from its classified fields.
    pub(crate) fn for_entity(entity: &str, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: table_name(entity),
            entity: Some(entity.to_string()),
            fields,
            relation: None,
        }
    }

    /// Junction table behind a many-valued field of `owner`.
    pub(crate) fn for_junction(owner: &str, field: &FieldDescriptor) -> Option<Self> {
        if field.kind != FieldKind::IntermediateTable {
            return None;
        }
        let target = field.target()?;
        let owner_column = junction_owner_column(&table_name(owner));
        let target_column = junction_target_column(&table_name(target));
        Some(Self {
            name: field.column.clone(),
            entity: None,
            fields: vec![
                FieldDescriptor::id(),
                FieldDescriptor::foreign_key(&owner_column, owner_column.clone(), owner),
                FieldDescriptor::foreign_key(&target_column, target_column.clone(), target),
            ],
            relation: Some(Relation {
                owner: owner.to_string(),
                attribute: field.attribute.clone(),
                target: target.to_string(),
                owner_column,
                target_column,
            }),
        })
    }

    /// The table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity stored in this table, or `None` for junction tables.
    #[must_use]
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// The relation stored in this table, for junction tables.
    #[must_use]
    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }

    /// All fields, id first.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// The field for an attribute name.
    #[must_use]
    pub fn field(&self, attribute: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.attribute == attribute)
    }

    /// The field stored in `column`.
    #[must_use]
    pub fn field_by_column(&self, column: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.has_column() && f.column == column)
    }

    /// Entities this table references through foreign keys, excluding its
    /// own entity. Relations are not references: junction tables carry them.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::ForeignKey)
            .filter_map(FieldDescriptor::target)
            .filter(|t| Some(*t) != self.entity.as_deref())
            .collect();
        refs.sort_unstable();
        refs.dedup();
        refs
    }

    /// Columns a new row is inserted with, paired with their defaults.
    #[must_use]
    pub fn insert_defaults(&self) -> Vec<(&str, SqlValue)> {
        self.fields
            .iter()
            .filter_map(|f| f.default_value().map(|v| (f.column(), v)))
            .collect()
    }

    /// Columns copied when a row is duplicated.
    #[must_use]
    pub fn copyable_columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Value | FieldKind::ForeignKey))
            .map(FieldDescriptor::column)
            .collect()
    }

    /// The `CREATE TABLE` statement for this table.
    #[must_use]
    pub fn ddl(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        match &self.relation {
            None => parts.extend(self.fields.iter().filter_map(FieldDescriptor::column_sql)),
            Some(j) => {
                parts.push(format!("{ID} INTEGER PRIMARY KEY AUTOINCREMENT"));
                parts.push(format!("{} INTEGER NOT NULL", j.owner_column));
                parts.push(format!("{} INTEGER NOT NULL", j.target_column));
                parts.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {}({ID})",
                    j.owner_column,
                    table_name(&j.owner)
                ));
                parts.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {}({ID})",
                    j.target_column,
                    table_name(&j.target)
                ));
            }
        }
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food() -> TableDescriptor {
        TableDescriptor::for_entity(
            "Food",
            vec![
                FieldDescriptor::id(),
                FieldDescriptor::value("calories", ColumnType::Double),
                FieldDescriptor::value("name", ColumnType::Text),
                FieldDescriptor::foreign_key("owner", "fk_owner_id".into(), "Person"),
                FieldDescriptor::intermediate("Food", "ingredients", "Ingredient"),
            ],
        )
    }

    #[test]
    fn entity_ddl() {
        assert_eq!(
            food().ddl(),
            "CREATE TABLE IF NOT EXISTS Food_table (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             calories DOUBLE NOT NULL, name TEXT NOT NULL, \
             fk_owner_id INTEGER REFERENCES Person_table(id))"
        );
    }

    #[test]
    fn junction_ddl() {
        let table = food();
        let field = table.field("ingredients").unwrap();
        let junction = TableDescriptor::for_junction("Food", field).unwrap();

        assert_eq!(junction.name(), "Food_ingredients_list_table");
        assert!(junction.entity().is_none());
        assert_eq!(
            junction.ddl(),
            "CREATE TABLE IF NOT EXISTS Food_ingredients_list_table (\
             id INTEGER PRIMARY KEY AUTOINCREMENT, \
             fk_self_Food_table_id INTEGER NOT NULL, \
             fk_Ingredient_table_id INTEGER NOT NULL, \
             FOREIGN KEY (fk_self_Food_table_id) REFERENCES Food_table(id), \
             FOREIGN KEY (fk_Ingredient_table_id) REFERENCES Ingredient_table(id))"
        );
        let j = junction.relation().unwrap();
        assert_eq!(j.owner(), "Food");
        assert_eq!(j.attribute(), "ingredients");
        assert_eq!(j.target(), "Ingredient");
    }

    #[test]
    fn scalar_fields_are_not_junctions() {
        let table = food();
        assert!(TableDescriptor::for_junction("Food", table.field("name").unwrap()).is_none());
    }

    #[test]
    fn inserts_skip_id_and_relations() {
        let table = food();
        let defaults = table.insert_defaults();
        assert_eq!(
            defaults,
            vec![
                ("calories", SqlValue::Real(0.0)),
                ("name", SqlValue::Text(String::new())),
                ("fk_owner_id", SqlValue::Null),
            ]
        );
    }

    #[test]
    fn references_exclude_self_and_relations() {
        let atom = TableDescriptor::for_entity(
            "Atom",
            vec![
                FieldDescriptor::id(),
                FieldDescriptor::foreign_key("parent", "fk_parent_id".into(), "Atom"),
                FieldDescriptor::foreign_key("origin", "fk_origin_id".into(), "Lab"),
                FieldDescriptor::intermediate("Atom", "bonds", "Bond"),
            ],
        );
        assert_eq!(atom.references(), vec!["Lab"]);
    }

    #[test]
    fn field_lookup_by_column() {
        let table = food();
        assert_eq!(table.field_by_column("fk_owner_id").unwrap().attribute(), "owner");
        assert!(table.field_by_column("Food_ingredients_list_table").is_none());
    }

    #[test]
    fn defaults_per_type() {
        assert_eq!(default_for(ColumnType::Text), SqlValue::Text(String::new()));
        assert_eq!(default_for(ColumnType::TinyInt), SqlValue::Integer(0));
        assert_eq!(default_for(ColumnType::Float), SqlValue::Real(0.0));
        assert_eq!(default_for(ColumnType::Boolean), SqlValue::Bool(false));
    }
}
