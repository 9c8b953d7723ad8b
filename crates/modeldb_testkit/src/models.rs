//! Sample entity models.
//!
//! Together they cover every scalar type, foreign keys between distinct
//! entities, a self-referencing foreign key, and many-valued relations in
//! one direction, both directions and onto the same entity.

use modeldb_core::schema::EntityDecl;
use modeldb_core::{model, Entity};

model! {
    /// A postal address.
    pub struct Address {
        STREET => street: value(String),
        NUMBER => number: value(i32),
        CITY => city: value(String),
    }

    /// A person living at an address.
    pub struct Person {
        NAME => name: value(String),
        AGE => age: value(i32),
        /// Where the person lives.
        ADDRESS => address: reference(Address),
        /// Other people this person knows.
        FRIENDS => friends: list(Person),
    }

    /// A workplace employing people.
    pub struct Workplace {
        NAME => name: value(String),
        LOCATION => location: reference(Address),
        EMPLOYEES => employees: list(Person),
    }

    /// A dish.
    pub struct Food {
        NAME => name: value(String),
        CALORIES => calories: value(f64),
        /// Who cooked it.
        OWNER => owner: reference(Person),
        INGREDIENTS => ingredients: list(Ingredient),
    }

    /// Something a dish is made of.
    pub struct Ingredient {
        NAME => name: value(String),
        WEIGHT => weight: value(f32),
        VEGAN => vegan: value(bool),
        /// Dishes using this ingredient.
        USED_IN => used_in: list(Food),
    }

    /// An atom in a molecule graph.
    pub struct Atom {
        SYMBOL => symbol: value(String),
        PROTONS => protons: value(i16),
        CHARGE => charge: value(i8),
        MASS => mass: value(f64),
        HALF_LIFE => half_life: value(i64),
        STABLE => stable: value(bool),
        /// The atom this one was split from.
        PARENT => parent: reference(Atom),
        BONDS => bonds: list(Atom),
    }

    /// A piece of furniture.
    pub struct Furniture {
        KIND => kind: value(String),
        LEGS => legs: value(i8),
        WEIGHT => weight: value(f32),
        PRICE => price: value(f64),
        SERIAL => serial: value(i64),
        ANTIQUE => antique: value(bool),
    }
}

/// Declarations of every sample model.
pub fn all_declarations() -> Vec<EntityDecl> {
    vec![
        Address::declaration(),
        Person::declaration(),
        Workplace::declaration(),
        Food::declaration(),
        Ingredient::declaration(),
        Atom::declaration(),
        Furniture::declaration(),
    ]
}
