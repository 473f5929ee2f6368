//! Property tests: key codec round-trip and predicate-join rewrite equivalence.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

use tabula_algebra::{
    concat, decat, CartesianProduct, Collection, Filters, JoinStrategy, JoinType, Key,
    MemCollection, Operator, Predicate, PredicateJoin, Selection,
};

fn arb_leaf_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        any::<u64>().prop_map(Key::Index),
        "[\\[\\]\",a-z0-9\\\\]{0,8}".prop_map(Key::Name),
    ]
}

fn arb_key() -> impl Strategy<Value = Key> {
    arb_leaf_key().prop_recursive(3, 16, 2, |inner| {
        (inner.clone(), inner).prop_map(|(a, b)| concat(&a, &b))
    })
}

/// Rows with a small value domain so joins actually match.
fn arb_rows(prefix: &'static str) -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::vec((0u8..4, 0u8..4), 0..6).prop_map(move |cells| {
        cells
            .into_iter()
            .enumerate()
            .map(|(i, (v, id))| {
                let value = if v == 3 { json!(format!("{}", v)) } else { json!(v) };
                (format!("{}{}", prefix, i), json!({"v": value, "id": id}))
            })
            .collect()
    })
}

fn sorted_rows(op: &Operator) -> Vec<(String, String)> {
    let mut rows: Vec<(String, String)> = op
        .items(&Filters::default())
        .unwrap()
        .map(|row| {
            let (k, v) = row.unwrap();
            (k.to_string(), v.to_string())
        })
        .collect();
    rows.sort();
    rows
}

proptest! {
    #[test]
    fn key_roundtrip(a in arb_key(), b in arb_key()) {
        let (left, right) = decat(&concat(&a, &b)).unwrap();
        prop_assert_eq!(left, a);
        prop_assert_eq!(right, b);
    }

    #[test]
    fn equality_rewrite_matches_product_then_filter(
        rows1 in arb_rows("a"),
        rows2 in arb_rows("b"),
        which in 0usize..3,
    ) {
        let left = Arc::new(Operator::leaf(Arc::new(
            MemCollection::dict("A.x", rows1).unwrap().with_index("v").unwrap(),
        )));
        let right = Arc::new(Operator::leaf(Arc::new(
            MemCollection::dict("B.y", rows2).unwrap().with_index("v").unwrap(),
        )));
        // empty inputs infer no properties, so only names that resolve are usable
        prop_assume!(!left.properties().is_empty() && !right.properties().is_empty());

        let predicate = match which {
            0 => Predicate::fields_compare("s1_v", "=", "s2_v").unwrap(),
            1 => Predicate::fields_compare("s2_id", "=", "s1_v").unwrap(),
            _ => Predicate::fields_compare("s1_id", "=", "s2_id").unwrap(),
        };

        let join = PredicateJoin::new(JoinType::Inner, left.clone(), right.clone(), predicate.clone()).unwrap();
        prop_assert!(matches!(join.strategy(), JoinStrategy::FieldJoin { .. }), "expected FieldJoin strategy");

        let product = Operator::Product(CartesianProduct::new(left, right).unwrap());
        let reference = Operator::Selection(Selection::new(predicate, Arc::new(product)).unwrap());

        prop_assert_eq!(sorted_rows(&Operator::PredicateJoin(join)), sorted_rows(&reference));
    }
}
