//! Persistent collection tests.

use modeldb_core::{CoreError, Entity, SqlValue};
use modeldb_testkit::prelude::*;
use proptest::prelude::*;

fn junction_targets(db: &TestDatabase, owner: &Food) -> Vec<i64> {
    let result = db
        .query(
            "SELECT fk_Ingredient_table_id FROM Food_ingredients_list_table \
             WHERE fk_self_Food_table_id = ? ORDER BY id",
            &[SqlValue::Integer(owner.id())],
        )
        .unwrap();
    result
        .column("fk_Ingredient_table_id")
        .unwrap_or_default()
        .iter()
        .filter_map(SqlValue::as_i64)
        .collect()
}

#[test]
fn pushed_elements_are_persisted() {
    let db = TestDatabase::with_models();
    let dish = db.create::<Food>().unwrap();
    let rice = db.create::<Ingredient>().unwrap();
    let egg = db.create::<Ingredient>().unwrap();

    let ingredients = dish.ingredients().unwrap();
    ingredients.push(&rice).unwrap();
    ingredients.push(&egg).unwrap();

    assert_eq!(ingredients.len(), 2);
    assert_eq!(ingredients.get(0).unwrap(), rice);
    assert!(ingredients.get(1).unwrap().is_same_instance(&egg));
    assert_eq!(junction_targets(&db, &dish), vec![rice.id(), egg.id()]);
}

#[test]
fn collections_reload_after_the_owner_is_released() {
    let db = TestDatabase::with_models();
    let rice = db.create::<Ingredient>().unwrap();
    let egg = db.create::<Ingredient>().unwrap();
    let id = {
        let dish = db.create::<Food>().unwrap();
        let ingredients = dish.ingredients().unwrap();
        ingredients.push(&rice).unwrap();
        ingredients.push(&egg).unwrap();
        dish.id()
    };

    let dish = db.select::<Food>(id).unwrap();
    assert_eq!(dish.ingredients().unwrap().to_vec().unwrap(), vec![rice, egg]);
}

#[test]
fn one_collection_per_handle() {
    let db = TestDatabase::with_models();
    let dish = db.create::<Food>().unwrap();
    let rice = db.create::<Ingredient>().unwrap();

    dish.ingredients().unwrap().push(&rice).unwrap();
    let again = db.select::<Food>(dish.id()).unwrap();
    assert_eq!(again.ingredients().unwrap().ids(), vec![rice.id()]);
}

#[test]
fn positional_edits() {
    let db = TestDatabase::with_models();
    let dish = db.create::<Food>().unwrap();
    let a = db.create::<Ingredient>().unwrap();
    let b = db.create::<Ingredient>().unwrap();
    let c = db.create::<Ingredient>().unwrap();

    let list = dish.ingredients().unwrap();
    list.push(&a).unwrap();
    list.push(&c).unwrap();
    list.add_at(1, &b).unwrap();
    assert_eq!(list.ids(), vec![a.id(), b.id(), c.id()]);
    assert_eq!(list.index_of(&b), Some(1));

    list.set_at(0, &c).unwrap();
    assert_eq!(list.ids(), vec![c.id(), b.id(), c.id()]);
    assert_eq!(list.get(0).unwrap(), c);

    list.remove_at(1).unwrap();
    assert_eq!(list.ids(), vec![c.id(), c.id()]);
    assert!(!list.contains(&b));

    assert_eq!(list.remove(&c).unwrap(), 2);
    assert!(list.is_empty());
    assert!(junction_targets(&db, &dish).is_empty());
}

#[test]
fn out_of_range_positions_are_rejected() {
    let db = TestDatabase::with_models();
    let dish = db.create::<Food>().unwrap();
    let rice = db.create::<Ingredient>().unwrap();
    let list = dish.ingredients().unwrap();

    assert!(matches!(
        list.add_at(1, &rice),
        Err(CoreError::IndexOutOfBounds { index: 1, len: 0 })
    ));
    assert!(matches!(
        list.remove_at(0),
        Err(CoreError::IndexOutOfBounds { .. })
    ));
    assert!(matches!(list.get(0), Err(CoreError::IndexOutOfBounds { .. })));
    assert!(matches!(
        list.set_at(3, &rice),
        Err(CoreError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn clear_removes_every_junction_row() {
    let db = TestDatabase::with_models();
    let dish = db.create::<Food>().unwrap();
    let other = db.create::<Food>().unwrap();
    let rice = db.create::<Ingredient>().unwrap();

    dish.ingredients().unwrap().push(&rice).unwrap();
    dish.ingredients().unwrap().push(&rice).unwrap();
    other.ingredients().unwrap().push(&rice).unwrap();

    dish.ingredients().unwrap().clear().unwrap();
    assert!(junction_targets(&db, &dish).is_empty());
    assert_eq!(junction_targets(&db, &other), vec![rice.id()]);
}

#[test]
fn reordering_is_unsupported() {
    let db = TestDatabase::with_models();
    let dish = db.create::<Food>().unwrap();
    let list = dish.ingredients().unwrap();
    assert!(matches!(list.sort(), Err(CoreError::Unsupported { .. })));
    assert!(matches!(list.dedup(), Err(CoreError::Unsupported { .. })));
}

#[test]
fn deleting_a_target_updates_live_owners() {
    let db = TestDatabase::with_models();
    let dish = db.create::<Food>().unwrap();
    let rice = db.create::<Ingredient>().unwrap();
    let egg = db.create::<Ingredient>().unwrap();

    let list = dish.ingredients().unwrap();
    list.push(&rice).unwrap();
    list.push(&egg).unwrap();
    list.push(&rice).unwrap();

    db.delete(&rice).unwrap();

    assert_eq!(list.ids(), vec![egg.id()]);
    assert_eq!(junction_targets(&db, &dish), vec![egg.id()]);
}

#[test]
fn deleting_a_target_updates_collections_that_outlive_their_owner_handle() {
    let db = TestDatabase::with_models();
    let rice = db.create::<Ingredient>().unwrap();
    let egg = db.create::<Ingredient>().unwrap();
    let list = {
        let dish = db.create::<Food>().unwrap();
        let list = dish.ingredients().unwrap();
        list.push(&rice).unwrap();
        list.push(&egg).unwrap();
        list
    };

    db.delete(&rice).unwrap();

    assert_eq!(list.ids(), vec![egg.id()]);
    assert_eq!(list.len(), 1);
    assert_eq!(list.get(0).unwrap(), egg);
}

#[test]
fn deleting_an_owner_removes_its_junction_rows() {
    let db = TestDatabase::with_models();
    let dish = db.create::<Food>().unwrap();
    let rice = db.create::<Ingredient>().unwrap();
    dish.ingredients().unwrap().push(&rice).unwrap();
    rice.used_in().unwrap().push(&dish).unwrap();

    db.delete(&dish).unwrap();

    assert!(junction_targets(&db, &dish).is_empty());
    assert!(rice.used_in().unwrap().is_empty());
    assert_eq!(db.select::<Ingredient>(rice.id()).unwrap(), rice);
}

#[test]
fn self_relations() {
    let db = TestDatabase::with_models();
    let ada = db.create::<Person>().unwrap();
    let grace = db.create::<Person>().unwrap();

    ada.friends().unwrap().push(&grace).unwrap();
    ada.friends().unwrap().push(&ada).unwrap();
    assert_eq!(ada.friends().unwrap().to_vec().unwrap(), vec![grace.clone(), ada.clone()]);

    db.delete(&grace).unwrap();
    assert_eq!(ada.friends().unwrap().ids(), vec![ada.id()]);
}

#[test]
fn dangling_junction_rows_fail_to_resolve() {
    let db = TestDatabase::with_models();
    let dish = db.create::<Food>().unwrap();
    let rice = db.create::<Ingredient>().unwrap();
    let list = dish.ingredients().unwrap();
    list.push(&rice).unwrap();

    db.execute(&format!("DELETE FROM Ingredient_table WHERE id = {}", rice.id()))
        .unwrap();
    drop(rice);

    assert!(matches!(
        list.get(0),
        Err(CoreError::InvalidForeignKey { .. })
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn edits_match_a_plain_vector(ops in collection_ops_strategy(24)) {
        let db = TestDatabase::with_models();
        let dish = db.create::<Food>().unwrap();
        let pool: Vec<Ingredient> = (0..4).map(|_| db.create::<Ingredient>().unwrap()).collect();
        let list = dish.ingredients().unwrap();
        let mut model: Vec<i64> = Vec::new();

        for op in &ops {
            let Some(index) = op.index_for(model.len()) else {
                continue;
            };
            match op {
                CollectionOp::AddAt { seed, .. } => {
                    let ingredient = &pool[usize::from(*seed) % pool.len()];
                    list.add_at(index, ingredient).unwrap();
                    model.insert(index, ingredient.id());
                }
                CollectionOp::RemoveAt { .. } => {
                    list.remove_at(index).unwrap();
                    model.remove(index);
                }
            }
            prop_assert_eq!(list.ids(), model.clone());
        }

        let mut stored = junction_targets(&db, &dish);
        let mut expected = model.clone();
        stored.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn add_then_remove_restores_the_list(initial in 0usize..6, index in any::<usize>()) {
        let db = TestDatabase::with_models();
        let dish = db.create::<Food>().unwrap();
        let rice = db.create::<Ingredient>().unwrap();
        let egg = db.create::<Ingredient>().unwrap();
        let list = dish.ingredients().unwrap();
        for _ in 0..initial {
            list.push(&rice).unwrap();
        }
        let before = list.ids();

        let at = index % (initial + 1);
        list.add_at(at, &egg).unwrap();
        prop_assert_eq!(list.get(at).unwrap(), egg.clone());
        list.remove_at(at).unwrap();

        prop_assert_eq!(list.ids(), before);
        prop_assert_eq!(junction_targets(&db, &dish).len(), initial);
    }
}
