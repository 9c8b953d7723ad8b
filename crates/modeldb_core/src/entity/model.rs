//! The entity trait and typed attribute selectors.

use super::proxy::{EntityProxy, RowIdentity};
use crate::database::Database;
use crate::error::CoreResult;
use crate::schema::{self, EntityDecl};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A scalar or foreign key attribute of entity `M` holding values of `T`.
///
/// Attribute selectors are the associated constants generated by
/// [`model!`](crate::model), e.g. `Food::NAME`. A selector is bound to one
/// owning entity and one value type, so a query or accessor can only be
/// built from attributes that belong to the entity being queried.
pub struct Attr<M, T> {
    name: &'static str,
    column: &'static str,
    _marker: PhantomData<fn() -> (M, T)>,
}

impl<M, T> Attr<M, T> {
    /// A selector for `name`, stored in `column`.
    #[must_use]
    pub const fn new(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            _marker: PhantomData,
        }
    }

    /// The attribute name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// The column the attribute is stored in.
    #[must_use]
    pub const fn column(self) -> &'static str {
        self.column
    }
}

impl<M, T> Clone for Attr<M, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, T> Copy for Attr<M, T> {}

impl<M, T> fmt::Debug for Attr<M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attr")
            .field("name", &self.name)
            .field("column", &self.column)
            .finish()
    }
}

/// A many-valued relation of entity `M` to entity `N`.
pub struct ListAttr<M, N> {
    name: &'static str,
    _marker: PhantomData<fn() -> (M, N)>,
}

impl<M, N> ListAttr<M, N> {
    /// A selector for the relation `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The attribute name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl<M, N> Clone for ListAttr<M, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, N> Copy for ListAttr<M, N> {}

impl<M, N> fmt::Debug for ListAttr<M, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListAttr").field("name", &self.name).finish()
    }
}

/// A persistent entity type.
///
/// Values of an entity type are handles over one row. Handles for the same
/// row compare equal; handles returned while another handle for the row is
/// alive share a single [`EntityProxy`].
///
/// Implementations are generated by [`model!`](crate::model).
pub trait Entity: Clone + PartialEq + Send + Sync + Sized + 'static {
    /// The entity name. The table is `<ENTITY_NAME>_table`.
    const ENTITY_NAME: &'static str;

    /// The declaration the schema is derived from.
    fn declaration() -> EntityDecl;

    #[doc(hidden)]
    fn from_proxy(proxy: Arc<EntityProxy>) -> Self;

    #[doc(hidden)]
    fn proxy(&self) -> &Arc<EntityProxy>;

    /// The row id.
    fn id(&self) -> i64 {
        self.proxy().id()
    }

    /// The entity's table name.
    fn table_name() -> String {
        schema::table_name(Self::ENTITY_NAME)
    }

    /// The row this handle refers to.
    fn identity(&self) -> RowIdentity {
        self.proxy().identity()
    }

    /// Returns true if both handles share one proxy.
    fn is_same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.proxy(), other.proxy())
    }

    /// Returns true if property writes go straight to the store.
    fn is_eager(&self) -> bool {
        self.proxy().is_eager()
    }

    /// The database the row lives in.
    fn database(&self) -> &Database {
        self.proxy().database()
    }

    /// Runs `f` against a lazy handle of the same row, then writes every
    /// property set inside `f` in a single `UPDATE`.
    ///
    /// Nothing is written if `f` fails. Change listeners registered on
    /// other handles of the row are not notified.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or the error of the final write.
    fn commit<F>(&self, f: F) -> CoreResult<()>
    where
        F: FnOnce(&Self) -> CoreResult<()>,
    {
        let lazy = Self::from_proxy(self.proxy().detached_lazy());
        f(&lazy)?;
        lazy.flush()
    }

    /// Writes the buffered values of a lazy handle.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::WriteFailed`](crate::CoreError::WriteFailed)
    /// if the `UPDATE` fails, or [`CoreError::RowNotFound`](crate::CoreError::RowNotFound)
    /// if the row no longer exists.
    fn flush(&self) -> CoreResult<()> {
        self.proxy().flush()
    }

    /// A readable rendering of the row, e.g.
    /// `Food[id=1, name="Rice", calories=0.0, ingredients=[Ingredient#2]]`.
    ///
    /// # Errors
    ///
    /// Fails if the row cannot be read.
    fn describe(&self) -> CoreResult<String> {
        self.proxy().describe()
    }
}
