//! Attribute classification.

use super::table::FieldDescriptor;
use super::{foreign_key_column, is_valid_name, Arity, DeclaredType, EntityDecl, ID};
use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeSet, HashSet};

/// Classifies the accessors of `decl` into field descriptors.
///
/// `known` holds the names of every entity taking part in the schema,
/// including `decl` itself. The result starts with the id field, followed by
/// scalar, foreign key and relation fields, each group sorted by name.
///
/// # Errors
///
/// Returns a schema definition error when an accessor takes parameters,
/// returns nothing, uses the reserved name `id`, is not scoped to `decl`,
/// or has a type that is neither a scalar nor a known entity.
pub fn classify(decl: &EntityDecl, known: &BTreeSet<String>) -> CoreResult<Vec<FieldDescriptor>> {
    let entity = decl.name();
    if !is_valid_name(entity) {
        return Err(CoreError::invalid_name(entity));
    }

    let mut seen = HashSet::new();
    let mut fields = vec![FieldDescriptor::id()];

    for accessor in decl.accessors() {
        let name = accessor.name();
        if name == ID {
            return Err(CoreError::invalid_declaration(
                entity,
                format!("accessor '{ID}' is reserved for the identifier"),
            ));
        }
        if !is_valid_name(name) {
            return Err(CoreError::invalid_name(name));
        }
        if !seen.insert(name) {
            return Err(CoreError::invalid_declaration(
                entity,
                format!("accessor '{name}' is declared twice"),
            ));
        }
        if accessor.param_count() > 0 {
            return Err(CoreError::invalid_declaration(
                entity,
                format!("accessor '{name}' must not take parameters"),
            ));
        }
        let Some((arity, ty)) = accessor.return_type() else {
            return Err(CoreError::invalid_declaration(
                entity,
                format!("accessor '{name}' must return a value"),
            ));
        };
        if accessor.scope() != Some(entity) {
            return Err(CoreError::invalid_declaration(
                entity,
                format!("the type of accessor '{name}' is not scoped to {entity}"),
            ));
        }

        let field = match (arity, ty) {
            (Arity::One, DeclaredType::Primitive(column)) => FieldDescriptor::value(name, *column),
            (Arity::One, DeclaredType::Entity(target)) if known.contains(target) => {
                FieldDescriptor::foreign_key(name, foreign_key_column(name), target)
            }
            (Arity::Many, DeclaredType::Entity(target)) if known.contains(target) => {
                FieldDescriptor::intermediate(entity, name, target)
            }
            (_, DeclaredType::Entity(target)) | (Arity::Many, DeclaredType::Unrecognized(target)) => {
                return Err(CoreError::UnknownEntityReference {
                    entity: entity.to_string(),
                    attribute: name.to_string(),
                    target: target.clone(),
                });
            }
            (Arity::One, DeclaredType::Unrecognized(_)) | (Arity::Many, DeclaredType::Primitive(_)) => {
                return Err(CoreError::UnsupportedValueType {
                    entity: entity.to_string(),
                    attribute: name.to_string(),
                    type_name: ty.type_name(),
                });
            }
        };
        fields.push(field);
    }

    fields.sort_by(|a, b| {
        a.kind()
            .cmp(&b.kind())
            .then_with(|| a.attribute().cmp(b.attribute()))
    });
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AccessorDecl, FieldKind};
    use modeldb_storage::ColumnType;

    fn known(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn fields_are_grouped_and_sorted() {
        let decl = EntityDecl::builder("Food")
            .list("ingredients", "Ingredient")
            .value("name", ColumnType::Text)
            .reference("owner", "Person")
            .value("calories", ColumnType::Double)
            .build();
        let fields = classify(&decl, &known(&["Food", "Ingredient", "Person"])).unwrap();

        let layout: Vec<_> = fields.iter().map(|f| (f.kind(), f.attribute())).collect();
        assert_eq!(
            layout,
            vec![
                (FieldKind::Id, "id"),
                (FieldKind::Value, "calories"),
                (FieldKind::Value, "name"),
                (FieldKind::ForeignKey, "owner"),
                (FieldKind::IntermediateTable, "ingredients"),
            ]
        );
        assert_eq!(fields[3].column(), "fk_owner_id");
    }

    #[test]
    fn self_reference_is_a_foreign_key() {
        let decl = EntityDecl::builder("Atom").reference("parent", "Atom").build();
        let fields = classify(&decl, &known(&["Atom"])).unwrap();
        assert_eq!(fields[1].kind(), FieldKind::ForeignKey);
    }

    #[test]
    fn parameterized_accessor_is_rejected() {
        let decl = EntityDecl::builder("Food")
            .accessor(
                AccessorDecl::new("name")
                    .params(1)
                    .returns(Arity::One, DeclaredType::Primitive(ColumnType::Text))
                    .scoped_to("Food"),
            )
            .build();
        let err = classify(&decl, &known(&["Food"])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDeclaration { .. }));
    }

    #[test]
    fn void_accessor_is_rejected() {
        let decl = EntityDecl::builder("Food")
            .accessor(AccessorDecl::new("touch").scoped_to("Food"))
            .build();
        assert!(classify(&decl, &known(&["Food"])).is_err());
    }

    #[test]
    fn reserved_id_is_rejected() {
        let decl = EntityDecl::builder("Food").value("id", ColumnType::Integer).build();
        let err = classify(&decl, &known(&["Food"])).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn unscoped_attribute_type_is_rejected() {
        let decl = EntityDecl::builder("Food")
            .accessor(
                AccessorDecl::new("name")
                    .returns(Arity::One, DeclaredType::Primitive(ColumnType::Text))
                    .scoped_to("Person"),
            )
            .build();
        let err = classify(&decl, &known(&["Food", "Person"])).unwrap_err();
        assert!(err.to_string().contains("not scoped"));
    }

    #[test]
    fn unknown_relation_target_is_rejected() {
        let decl = EntityDecl::builder("Food").list("ingredients", "Ingredient").build();
        let err = classify(&decl, &known(&["Food"])).unwrap_err();
        assert!(matches!(err, CoreError::UnknownEntityReference { .. }));
    }

    #[test]
    fn unrecognized_scalar_is_rejected() {
        let decl = EntityDecl::builder("Food")
            .accessor(
                AccessorDecl::new("expires")
                    .returns(Arity::One, DeclaredType::Unrecognized("Instant".into()))
                    .scoped_to("Food"),
            )
            .build();
        let err = classify(&decl, &known(&["Food"])).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedValueType { .. }));
    }

    #[test]
    fn invalid_entity_name_is_rejected() {
        let decl = EntityDecl::builder("Food; DROP").build();
        assert!(matches!(
            classify(&decl, &known(&["Food; DROP"])),
            Err(CoreError::InvalidName { .. })
        ));
    }
}
