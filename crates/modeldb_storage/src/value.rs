//! Values exchanged with the SQL engine.

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use std::fmt;

/// A single value read from or bound into a statement.
///
/// Booleans are kept distinct from integers so that a column declared
/// `BOOLEAN` reads back as [`SqlValue::Bool`] even though the engine stores
/// it as an integer.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// Any integer column (`INTEGER`, `BIGINT`, `SMALLINT`, `TINYINT`).
    Integer(i64),
    /// Any floating point column (`DOUBLE`, `FLOAT`, `REAL`).
    Real(f64),
    /// A `TEXT` column.
    Text(String),
    /// A `BOOLEAN` column.
    Bool(bool),
    /// A `BLOB` column, passed through untouched.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns true for [`SqlValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer payload, treating booleans as 0/1.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Returns the floating point payload, widening integers.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the text payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload, accepting 0/1 integers.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Integer(0) => Some(false),
            Self::Integer(1) => Some(true),
            _ => None,
        }
    }

    /// Name of the variant, used in type mismatch messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
            Self::Blob(_) => "blob",
        }
    }

    pub(crate) fn from_engine(value: ValueRef<'_>, column_type: Option<ColumnType>) -> Option<Self> {
        let value = match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(v) => match column_type {
                Some(ColumnType::Boolean) => Self::Bool(v != 0),
                Some(ColumnType::Double | ColumnType::Float) => {
                    #[allow(clippy::cast_precision_loss)]
                    let v = v as f64;
                    Self::Real(v)
                }
                _ => Self::Integer(v),
            },
            ValueRef::Real(v) => Self::Real(v),
            ValueRef::Text(bytes) => Self::Text(std::str::from_utf8(bytes).ok()?.to_string()),
            ValueRef::Blob(bytes) => Self::Blob(bytes.to_vec()),
        };
        Some(value)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            Self::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            Self::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(impl From<$ty> for SqlValue {
            fn from(v: $ty) -> Self {
                Self::Integer(i64::from(v))
            }
        })*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::Real(f64::from(v))
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Column types understood by the driver.
///
/// These are the declared types written into generated DDL. The engine
/// itself only knows storage classes, so the declared type is what lets the
/// driver pick the right variant of [`SqlValue`] when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// `INTEGER`, 32-bit.
    Integer,
    /// `BIGINT`, 64-bit.
    BigInt,
    /// `SMALLINT`, 16-bit.
    SmallInt,
    /// `TINYINT`, 8-bit.
    TinyInt,
    /// `TEXT`.
    Text,
    /// `BOOLEAN`.
    Boolean,
    /// `DOUBLE`.
    Double,
    /// `FLOAT`.
    Float,
}

impl ColumnType {
    /// The type name used in DDL.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::SmallInt => "SMALLINT",
            Self::TinyInt => "TINYINT",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
        }
    }

    /// Maps a declared column type back to a [`ColumnType`].
    ///
    /// Matching is case-insensitive. `INT` and `REAL` are accepted as
    /// aliases since hand-written tables use them.
    #[must_use]
    pub fn from_declared(declared: &str) -> Option<Self> {
        match declared.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => Some(Self::Integer),
            "BIGINT" => Some(Self::BigInt),
            "SMALLINT" => Some(Self::SmallInt),
            "TINYINT" => Some(Self::TinyInt),
            "TEXT" | "VARCHAR" => Some(Self::Text),
            "BOOLEAN" | "BOOL" => Some(Self::Boolean),
            "DOUBLE" | "REAL" => Some(Self::Double),
            "FLOAT" => Some(Self::Float),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_types_are_case_insensitive() {
        assert_eq!(ColumnType::from_declared("boolean"), Some(ColumnType::Boolean));
        assert_eq!(ColumnType::from_declared(" Double "), Some(ColumnType::Double));
        assert_eq!(ColumnType::from_declared("REAL"), Some(ColumnType::Double));
        assert_eq!(ColumnType::from_declared("DATETIME"), None);
    }

    #[test]
    fn ddl_names_parse_back() {
        for ty in [
            ColumnType::Integer,
            ColumnType::BigInt,
            ColumnType::SmallInt,
            ColumnType::TinyInt,
            ColumnType::Text,
            ColumnType::Boolean,
            ColumnType::Double,
            ColumnType::Float,
        ] {
            assert_eq!(ColumnType::from_declared(ty.as_sql()), Some(ty));
        }
    }

    #[test]
    fn boolean_columns_read_as_bool() {
        let v = SqlValue::from_engine(ValueRef::Integer(1), Some(ColumnType::Boolean));
        assert_eq!(v, Some(SqlValue::Bool(true)));
        let v = SqlValue::from_engine(ValueRef::Integer(1), Some(ColumnType::Integer));
        assert_eq!(v, Some(SqlValue::Integer(1)));
    }

    #[test]
    fn integer_stored_in_real_column_widens() {
        let v = SqlValue::from_engine(ValueRef::Integer(3), Some(ColumnType::Double));
        assert_eq!(v, Some(SqlValue::Real(3.0)));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert_eq!(SqlValue::from_engine(ValueRef::Text(&[0xff, 0xfe]), None), None);
    }

    #[test]
    fn option_none_is_null() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(4_i32)), SqlValue::Integer(4));
    }

    #[test]
    fn accessors() {
        assert_eq!(SqlValue::Bool(true).as_i64(), Some(1));
        assert_eq!(SqlValue::Integer(0).as_bool(), Some(false));
        assert_eq!(SqlValue::Integer(2).as_bool(), None);
        assert_eq!(SqlValue::Integer(2).as_f64(), Some(2.0));
        assert_eq!(SqlValue::from("x").as_str(), Some("x"));
        assert!(SqlValue::Null.is_null());
    }
}
