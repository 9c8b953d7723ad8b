//! Attribute value types.
//!
//! A [`PropertyValue`] converts between an attribute's Rust type and the
//! [`SqlValue`] stored in its column. Scalars additionally implement
//! [`ScalarValue`], which names their column type. Foreign keys are
//! `Option<M>` for an entity type `M`: `NULL` reads back as `None`, an id is
//! resolved through the database's proxy cache.

use crate::database::Database;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use modeldb_storage::{ColumnType, SqlValue};

/// Where a stored value was read from.
///
/// Passed to [`PropertyValue::decode`] so conversion failures can name the
/// row and column involved, and so entity references can be resolved.
#[derive(Debug, Clone, Copy)]
pub struct ValueSite<'a> {
    pub(crate) db: &'a Database,
    pub(crate) table: &'a str,
    pub(crate) id: i64,
    pub(crate) column: &'a str,
}

impl<'a> ValueSite<'a> {
    /// The database the value was read from.
    #[must_use]
    pub fn database(&self) -> &'a Database {
        self.db
    }

    /// The table.
    #[must_use]
    pub fn table(&self) -> &'a str {
        self.table
    }

    /// The row id.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// The column.
    #[must_use]
    pub fn column(&self) -> &'a str {
        self.column
    }

    /// A type mismatch error for `found` at this site.
    #[must_use]
    pub fn mismatch(&self, expected: &'static str, found: &SqlValue) -> CoreError {
        CoreError::TypeMismatch {
            table: self.table.to_string(),
            id: self.id,
            column: self.column.to_string(),
            expected,
            found: found.kind(),
        }
    }
}

/// A type that can be stored in a column.
pub trait PropertyValue: Clone + PartialEq + Send + Sync + Sized + 'static {
    /// Converts the value into its stored form.
    fn encode(&self) -> SqlValue;

    /// Converts a stored value back.
    ///
    /// # Errors
    ///
    /// Fails if `raw` cannot represent a value of this type.
    fn decode(raw: SqlValue, site: &ValueSite<'_>) -> CoreResult<Self>;

    /// Returns false for values whose encoded form would be lost on write.
    fn is_storable(&self) -> bool {
        true
    }
}

/// A scalar attribute type with a fixed column type.
pub trait ScalarValue: PropertyValue {
    /// The column type scalars of this type are stored in.
    const COLUMN_TYPE: ColumnType;
}

impl PropertyValue for String {
    fn encode(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }

    fn decode(raw: SqlValue, site: &ValueSite<'_>) -> CoreResult<Self> {
        match raw {
            SqlValue::Text(text) => Ok(text),
            other => Err(site.mismatch("text", &other)),
        }
    }
}

impl ScalarValue for String {
    const COLUMN_TYPE: ColumnType = ColumnType::Text;
}

macro_rules! integer_value {
    ($($ty:ty => $column:ident),* $(,)?) => {
        $(
            impl PropertyValue for $ty {
                fn encode(&self) -> SqlValue {
                    SqlValue::Integer(i64::from(*self))
                }

                fn decode(raw: SqlValue, site: &ValueSite<'_>) -> CoreResult<Self> {
                    raw.as_i64()
                        .and_then(|v| <$ty>::try_from(v).ok())
                        .ok_or_else(|| site.mismatch(stringify!($ty), &raw))
                }
            }

            impl ScalarValue for $ty {
                const COLUMN_TYPE: ColumnType = ColumnType::$column;
            }
        )*
    };
}

integer_value! {
    i64 => BigInt,
    i32 => Integer,
    i16 => SmallInt,
    i8 => TinyInt,
}

impl PropertyValue for f64 {
    fn encode(&self) -> SqlValue {
        SqlValue::Real(*self)
    }

    // SQLite binds NaN as NULL.
    fn is_storable(&self) -> bool {
        !self.is_nan()
    }

    fn decode(raw: SqlValue, site: &ValueSite<'_>) -> CoreResult<Self> {
        raw.as_f64().ok_or_else(|| site.mismatch("f64", &raw))
    }
}

impl ScalarValue for f64 {
    const COLUMN_TYPE: ColumnType = ColumnType::Double;
}

impl PropertyValue for f32 {
    fn encode(&self) -> SqlValue {
        SqlValue::Real(f64::from(*self))
    }

    fn is_storable(&self) -> bool {
        !self.is_nan()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn decode(raw: SqlValue, site: &ValueSite<'_>) -> CoreResult<Self> {
        raw.as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| site.mismatch("f32", &raw))
    }
}

impl ScalarValue for f32 {
    const COLUMN_TYPE: ColumnType = ColumnType::Float;
}

impl PropertyValue for bool {
    fn encode(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }

    fn decode(raw: SqlValue, site: &ValueSite<'_>) -> CoreResult<Self> {
        raw.as_bool().ok_or_else(|| site.mismatch("bool", &raw))
    }
}

impl ScalarValue for bool {
    const COLUMN_TYPE: ColumnType = ColumnType::Boolean;
}

impl<M: Entity> PropertyValue for Option<M> {
    fn encode(&self) -> SqlValue {
        match self {
            Some(entity) => SqlValue::Integer(entity.id()),
            None => SqlValue::Null,
        }
    }

    fn decode(raw: SqlValue, site: &ValueSite<'_>) -> CoreResult<Self> {
        let invalid = |found: String| CoreError::InvalidForeignKey {
            table: site.table.to_string(),
            id: site.id,
            column: site.column.to_string(),
            found,
        };
        match raw {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(id) => match site.db.select::<M>(id) {
                Ok(entity) => Ok(Some(entity)),
                Err(CoreError::RowNotFound { .. }) => {
                    Err(invalid(format!("dangling id {id} into {}", M::table_name())))
                }
                Err(e) => Err(e),
            },
            other => Err(invalid(format!("{} value {other}", other.kind()))),
        }
    }
}
