//! Property-based test generators using proptest.
//!
//! Provides strategies for generating attribute values and collection edit
//! sequences.

use proptest::prelude::*;

/// Strategy for generating entity and attribute names.
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,23}").expect("Invalid regex")
}

/// Strategy for generating strings that survive a text column unchanged.
///
/// Includes quotes and percent signs, which must not leak into SQL text.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 '%_\"-]{0,48}").expect("Invalid regex")
}

/// Strategy for generating finite doubles.
pub fn finite_f64_strategy() -> impl Strategy<Value = f64> {
    prop::num::f64::NORMAL | prop::num::f64::ZERO | prop::num::f64::SUBNORMAL
}

/// Strategy for generating finite floats.
pub fn finite_f32_strategy() -> impl Strategy<Value = f32> {
    prop::num::f32::NORMAL | prop::num::f32::ZERO
}

/// One edit of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOp {
    /// Insert the element with the given seed at a position.
    AddAt {
        /// Position, reduced modulo `len + 1` when applied.
        index: usize,
        /// Seed the element is derived from.
        seed: u8,
    },
    /// Remove the element at a position.
    RemoveAt {
        /// Position, reduced modulo `len` when applied.
        index: usize,
    },
}

impl CollectionOp {
    /// Resolves the raw index against a collection of length `len`.
    ///
    /// Returns `None` for a removal from an empty collection.
    #[must_use]
    pub fn index_for(&self, len: usize) -> Option<usize> {
        match self {
            Self::AddAt { index, .. } => Some(index % (len + 1)),
            Self::RemoveAt { .. } if len == 0 => None,
            Self::RemoveAt { index } => Some(index % len),
        }
    }
}

/// Strategy for generating a single collection edit.
pub fn collection_op_strategy() -> impl Strategy<Value = CollectionOp> {
    prop_oneof![
        2 => (any::<usize>(), any::<u8>()).prop_map(|(index, seed)| CollectionOp::AddAt { index, seed }),
        1 => any::<usize>().prop_map(|index| CollectionOp::RemoveAt { index }),
    ]
}

/// Strategy for generating sequences of collection edits.
pub fn collection_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<CollectionOp>> {
    prop::collection::vec(collection_op_strategy(), 0..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldb_core::schema::is_valid_name;

    proptest! {
        #[test]
        fn identifiers_are_valid_names(name in identifier_strategy()) {
            prop_assert!(is_valid_name(&name));
        }

        #[test]
        fn doubles_are_finite(value in finite_f64_strategy()) {
            prop_assert!(value.is_finite());
        }

        #[test]
        fn resolved_indices_are_in_range(op in collection_op_strategy(), len in 0usize..16) {
            match (&op, op.index_for(len)) {
                (CollectionOp::AddAt { .. }, Some(i)) => prop_assert!(i <= len),
                (CollectionOp::RemoveAt { .. }, Some(i)) => prop_assert!(i < len),
                (CollectionOp::RemoveAt { .. }, None) => prop_assert_eq!(len, 0),
                (CollectionOp::AddAt { .. }, None) => prop_assert!(false),
            }
        }
    }
}
