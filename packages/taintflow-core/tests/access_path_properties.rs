// Algebraic laws of access paths, checked over generated bases and
// accessor chains.

use proptest::prelude::*;
use taintflow_core::{AccessPath, Accessor};

fn accessors() -> impl Strategy<Value = Vec<Accessor>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,4}".prop_map(Accessor::field),
            Just(Accessor::Element),
        ],
        0..5,
    )
}

fn paths() -> impl Strategy<Value = AccessPath<String>> {
    ("[a-z]{1,3}", accessors()).prop_map(|(base, accessors)| {
        let mut path = AccessPath::from_base(base);
        for accessor in accessors {
            path = path.appended(accessor);
        }
        path
    })
}

proptest! {
    #[test]
    fn starts_with_is_reflexive(path in paths()) {
        prop_assert!(path.starts_with(&path));
    }

    #[test]
    fn minus_self_leaves_empty_tail(path in paths()) {
        prop_assert_eq!(path.minus(&path), Some(vec![]));
    }

    #[test]
    fn extended_path_starts_with_its_prefix(path in paths(), tail in accessors()) {
        let extended = path.extended(&tail);
        prop_assert!(extended.starts_with(&path));
        prop_assert_eq!(extended.minus(&path), Some(tail));
    }

    #[test]
    fn minus_then_extended_restores_the_path(long in paths(), cut in 0usize..5) {
        let take = cut.min(long.accessors().len());
        let prefix = AccessPath::new(
            long.base().cloned(),
            long.accessors()[..take].to_vec(),
        );
        let tail = long.minus(&prefix).unwrap();
        prop_assert_eq!(prefix.extended(&tail), long);
    }

    #[test]
    fn appended_grows_by_exactly_one(path in paths(), accessor in prop_oneof![
        "[a-z]{1,4}".prop_map(Accessor::field),
        Just(Accessor::Element),
    ]) {
        let grown = path.appended(accessor.clone());
        prop_assert_eq!(grown.accessors().len(), path.accessors().len() + 1);
        prop_assert_eq!(grown.accessors().last(), Some(&accessor));
        prop_assert!(grown.starts_with(&path));
        prop_assert!(!path.starts_with(&grown));
    }

    #[test]
    fn stripping_trailing_elements_is_idempotent(path in paths()) {
        let stripped = path.remove_trailing_element_accessors();
        prop_assert!(!matches!(stripped.accessors().last(), Some(Accessor::Element)));
        prop_assert_eq!(
            stripped.remove_trailing_element_accessors(),
            stripped.clone()
        );
        prop_assert!(path.starts_with(&stripped));
    }

    #[test]
    fn unrelated_bases_never_prefix_each_other(accessors in accessors()) {
        let x = AccessPath::from_base("x".to_string()).extended(&accessors);
        let y = AccessPath::from_base("y".to_string());
        prop_assert!(!x.starts_with(&y));
        prop_assert_eq!(x.minus(&y), None);
    }
}
