//! Query builder tests.

use modeldb_core::{CoreError, Entity, SqlValue};
use modeldb_testkit::prelude::*;

fn kitchen() -> (TestDatabase, Vec<Food>) {
    let db = TestDatabase::with_models();
    let mut foods = Vec::new();
    for (name, calories) in [
        ("Fried Rice", 520.0),
        ("Noodles", 430.0),
        ("Rice Pudding", 310.0),
        ("Salad", 90.0),
    ] {
        let food = db.create::<Food>().unwrap();
        food.name().set(name).unwrap();
        food.calories().set(calories).unwrap();
        foods.push(food);
    }
    (db, foods)
}

fn names(foods: &[Food]) -> Vec<String> {
    foods.iter().map(|f| f.name().get().unwrap()).collect()
}

#[test]
fn like_matches_substrings() {
    let (db, _foods) = kitchen();
    let rice = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::NAME)
        .like("%Rice%")
        .order_ascending_by(Food::NAME)
        .as_list()
        .unwrap();
    assert_eq!(names(&rice), vec!["Fried Rice", "Rice Pudding"]);
}

#[test]
fn results_share_live_proxies() {
    let (db, foods) = kitchen();
    let found = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::NAME)
        .equal("Salad")
        .as_list()
        .unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].is_same_instance(&foods[3]));
}

#[test]
fn comparisons_and_ordering() {
    let (db, _foods) = kitchen();
    let light = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::CALORIES)
        .less_than(400.0)
        .order_descending_by(Food::CALORIES)
        .as_list()
        .unwrap();
    assert_eq!(names(&light), vec!["Rice Pudding", "Salad"]);

    let between = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::CALORIES)
        .greater_than_or_equal(310.0)
        .and(Food::CALORIES)
        .less_than_or_equal(430.0)
        .order_ascending_by(Food::CALORIES)
        .as_list()
        .unwrap();
    assert_eq!(names(&between), vec!["Rice Pudding", "Noodles"]);

    let either = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::NAME)
        .equal("Salad")
        .or(Food::CALORIES)
        .greater_than(500.0)
        .order_ascending_by(Food::NAME)
        .as_list()
        .unwrap();
    assert_eq!(names(&either), vec!["Fried Rice", "Salad"]);
}

#[test]
fn membership_and_negation() {
    let (db, _foods) = kitchen();
    let picked = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::NAME)
        .is_in(["Salad".to_string(), "Noodles".to_string()])
        .order_ascending_by(Food::NAME)
        .as_list()
        .unwrap();
    assert_eq!(names(&picked), vec!["Noodles", "Salad"]);

    let rest = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::NAME)
        .not_like("%Rice%")
        .and(Food::NAME)
        .not_equal("Salad")
        .as_list()
        .unwrap();
    assert_eq!(names(&rest), vec!["Noodles"]);

    let none = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::CALORIES)
        .not_in([520.0, 430.0, 310.0, 90.0])
        .as_list()
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn foreign_key_predicates() {
    let (db, foods) = kitchen();
    let cook = db.create::<Person>().unwrap();
    foods[1].owner().set(cook.clone()).unwrap();

    let cooked = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::OWNER)
        .equal(cook)
        .as_list()
        .unwrap();
    assert_eq!(cooked, vec![foods[1].clone()]);

    let orphaned = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::OWNER)
        .is_null()
        .as_list()
        .unwrap();
    assert_eq!(orphaned.len(), 3);

    let owned = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::OWNER)
        .is_not_null()
        .as_list()
        .unwrap();
    assert_eq!(owned, vec![foods[1].clone()]);
}

#[test]
fn values_are_bound_not_inlined() {
    let db = TestDatabase::with_models();
    let (sql, params) = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::NAME)
        .like("%Rice%")
        .and(Food::CALORIES)
        .greater_than(100.0)
        .order_ascending_by(Food::NAME)
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT id FROM Food_table WHERE name LIKE ? AND calories > ? ORDER BY name ASC"
    );
    assert_eq!(params, vec![SqlValue::from("%Rice%"), SqlValue::Real(100.0)]);

    let (sql, params) = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::OWNER)
        .is_in(Vec::<Option<Person>>::new())
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT id FROM Food_table WHERE fk_owner_id IN ()");
    assert!(params.is_empty());
}

#[test]
fn quotes_in_values_are_harmless() {
    let (db, foods) = kitchen();
    foods[0].name().set("Rice'); DROP TABLE Food_table; --").unwrap();
    let found = db
        .select_where::<Food>()
        .unwrap()
        .filter(Food::NAME)
        .equal("Rice'); DROP TABLE Food_table; --")
        .as_list()
        .unwrap();
    assert_eq!(found, vec![foods[0].clone()]);
    assert!(db.table_names().unwrap().contains(&"Food_table".to_string()));
}

#[test]
fn select_all_orders_by_id() {
    let (db, foods) = kitchen();
    assert_eq!(db.select_all::<Food>().unwrap(), foods);
    assert!(db.select_all::<Furniture>().unwrap().is_empty());
    assert_eq!(
        db.select_where::<Food>().unwrap().to_sql().unwrap().0,
        "SELECT id FROM Food_table"
    );
}

#[test]
fn queries_need_a_registered_entity() {
    let db = TestDatabase::memory();
    assert!(matches!(
        db.select_where::<Food>(),
        Err(CoreError::UnknownEntity { .. })
    ));
}

#[test]
fn deleted_rows_drop_out_of_results() {
    let (db, foods) = kitchen();
    db.delete(&foods[0]).unwrap();
    let ids: Vec<i64> = db.select_all::<Food>().unwrap().iter().map(|f| f.id()).collect();
    assert_eq!(ids, vec![foods[1].id(), foods[2].id(), foods[3].id()]);
}
