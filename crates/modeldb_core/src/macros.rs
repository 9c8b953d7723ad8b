//! The `model!` declaration macro.

/// Declares one or more entity types.
///
/// Each attribute line reads `CONST => name: kind(Type)`:
///
/// - `value(T)`: a scalar stored in column `name`. `T` is one of `String`,
///   `i64`, `i32`, `i16`, `i8`, `f64`, `f32` or `bool`.
/// - `reference(M)`: a nullable foreign key to entity `M`, stored in column
///   `fk_name_id`. Its value type is `Option<M>`.
/// - `list(M)`: a many-valued relation to entity `M`, stored in the junction
///   table `<Entity>_name_list_table`.
///
/// For every attribute the macro generates the selector constant `CONST`
/// and the accessor `name()`, which returns a [`Property`](crate::Property)
/// or, for lists, a [`Collection`](crate::Collection).
///
/// ```rust,ignore
/// use modeldb_core::{model, Database, Entity};
///
/// model! {
///     /// A dish.
///     pub struct Food {
///         NAME => name: value(String),
///         CALORIES => calories: value(f64),
///         OWNER => owner: reference(Person),
///         INGREDIENTS => ingredients: list(Ingredient),
///     }
///
///     /// Something a dish is made of.
///     pub struct Ingredient {
///         NAME => name: value(String),
///     }
/// }
///
/// let rice = db.create::<Food>()?;
/// rice.name().set("Rice")?;
/// let matches = db.select_where::<Food>()?.filter(Food::NAME).like("%Rice%").as_list()?;
/// ```
///
/// Handles compare equal, and hash alike, when they refer to the same row.
#[macro_export]
macro_rules! model {
    (@member $owner:ident, [$(#[$fmeta:meta])*] $konst:ident, $field:ident, value, $ty:ty) => {
        #[doc = concat!("Selector of the `", stringify!($field), "` attribute.")]
        pub const $konst: $crate::Attr<$owner, $ty> =
            $crate::Attr::new(stringify!($field), stringify!($field));

        #[doc = concat!("The `", stringify!($field), "` attribute.")]
        $(#[$fmeta])*
        pub fn $field(&self) -> $crate::Property<$ty> {
            $crate::Entity::proxy(self).property(Self::$konst)
        }
    };
    (@member $owner:ident, [$(#[$fmeta:meta])*] $konst:ident, $field:ident, reference, $ty:ty) => {
        #[doc = concat!("Selector of the `", stringify!($field), "` reference.")]
        pub const $konst: $crate::Attr<$owner, ::std::option::Option<$ty>> =
            $crate::Attr::new(stringify!($field), concat!("fk_", stringify!($field), "_id"));

        #[doc = concat!("The `", stringify!($field), "` reference.")]
        $(#[$fmeta])*
        pub fn $field(&self) -> $crate::Property<::std::option::Option<$ty>> {
            $crate::Entity::proxy(self).property(Self::$konst)
        }
    };
    (@member $owner:ident, [$(#[$fmeta:meta])*] $konst:ident, $field:ident, list, $ty:ty) => {
        #[doc = concat!("Selector of the `", stringify!($field), "` relation.")]
        pub const $konst: $crate::ListAttr<$owner, $ty> = $crate::ListAttr::new(stringify!($field));

        #[doc = concat!("The `", stringify!($field), "` relation.")]
        $(#[$fmeta])*
        ///
        /// # Errors
        ///
        /// Fails if the related ids cannot be loaded.
        pub fn $field(&self) -> $crate::CoreResult<$crate::Collection<$ty>> {
            $crate::Entity::proxy(self).collection(Self::$konst)
        }
    };

    (@decl $builder:ident, $field:ident, value, $ty:ty) => {
        $builder.value(stringify!($field), <$ty as $crate::ScalarValue>::COLUMN_TYPE)
    };
    (@decl $builder:ident, $field:ident, reference, $ty:ty) => {
        $builder.reference(stringify!($field), <$ty as $crate::Entity>::ENTITY_NAME)
    };
    (@decl $builder:ident, $field:ident, list, $ty:ty) => {
        $builder.list(stringify!($field), <$ty as $crate::Entity>::ENTITY_NAME)
    };

    ($(
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $konst:ident => $field:ident : $kind:ident ( $ty:ty )
            ),* $(,)?
        }
    )*) => {$(
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name {
            proxy: ::std::sync::Arc<$crate::EntityProxy>,
        }

        impl $name {
            $( $crate::model!(@member $name, [$(#[$fmeta])*] $konst, $field, $kind, $ty); )*
        }

        impl $crate::Entity for $name {
            const ENTITY_NAME: &'static str = stringify!($name);

            fn declaration() -> $crate::schema::EntityDecl {
                let builder = $crate::schema::EntityDecl::builder(stringify!($name));
                $( let builder = $crate::model!(@decl builder, $field, $kind, $ty); )*
                builder.build()
            }

            fn from_proxy(proxy: ::std::sync::Arc<$crate::EntityProxy>) -> Self {
                Self { proxy }
            }

            fn proxy(&self) -> &::std::sync::Arc<$crate::EntityProxy> {
                &self.proxy
            }
        }

        impl ::std::cmp::PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.proxy.id() == other.proxy.id()
                    && self.proxy.table_name() == other.proxy.table_name()
            }
        }

        impl ::std::cmp::Eq for $name {}

        impl ::std::hash::Hash for $name {
            fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                ::std::hash::Hash::hash(self.proxy.table_name(), state);
                ::std::hash::Hash::hash(&self.proxy.id(), state);
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}#{}", stringify!($name), self.proxy.id())
            }
        }
    )*};
}

#[cfg(test)]
mod tests {
    use crate::schema::{Arity, DeclaredType, FieldKind, SchemaRegistry};
    use crate::{ColumnType, Entity};

    crate::model! {
        /// A test owner.
        pub struct Keeper {
            LABEL => label: value(String),
        }

        /// A test item.
        pub struct Parcel {
            /// How heavy it is.
            WEIGHT => weight: value(f32),
            SEALED => sealed: value(bool),
            KEEPER => keeper: reference(Keeper),
            CONTENTS => contents: list(Keeper),
        }
    }

    #[test]
    fn selectors_carry_columns() {
        assert_eq!(Parcel::WEIGHT.name(), "weight");
        assert_eq!(Parcel::WEIGHT.column(), "weight");
        assert_eq!(Parcel::KEEPER.name(), "keeper");
        assert_eq!(Parcel::KEEPER.column(), "fk_keeper_id");
        assert_eq!(Parcel::CONTENTS.name(), "contents");
        assert_eq!(Parcel::ENTITY_NAME, "Parcel");
        assert_eq!(Parcel::table_name(), "Parcel_table");
    }

    #[test]
    fn declaration_matches_attributes() {
        let decl = Parcel::declaration();
        assert_eq!(decl.name(), "Parcel");
        let returns: Vec<_> = decl
            .accessors()
            .iter()
            .map(|a| (a.name().to_string(), a.return_type().cloned()))
            .collect();
        assert_eq!(
            returns,
            vec![
                (
                    "weight".to_string(),
                    Some((Arity::One, DeclaredType::Primitive(ColumnType::Float)))
                ),
                (
                    "sealed".to_string(),
                    Some((Arity::One, DeclaredType::Primitive(ColumnType::Boolean)))
                ),
                (
                    "keeper".to_string(),
                    Some((Arity::One, DeclaredType::Entity("Keeper".into())))
                ),
                (
                    "contents".to_string(),
                    Some((Arity::Many, DeclaredType::Entity("Keeper".into())))
                ),
            ]
        );
    }

    #[test]
    fn declarations_classify() {
        let registry = SchemaRegistry::new()
            .merge(&[Parcel::declaration(), Keeper::declaration()])
            .unwrap();
        let table = registry.entity_table("Parcel").unwrap();
        let kinds: Vec<_> = table.fields().iter().map(|f| f.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                FieldKind::Id,
                FieldKind::Value,
                FieldKind::Value,
                FieldKind::ForeignKey,
                FieldKind::IntermediateTable,
            ]
        );
        assert!(registry.junction("Parcel", "contents").is_some());
    }
}
