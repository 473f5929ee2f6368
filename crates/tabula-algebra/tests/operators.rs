//! Operator semantics over in-memory collections.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tabula_algebra::{
    concat, paginate, AlgebraError, CartesianProduct, Collection, FieldJoin, FilterKind, Filters,
    ItemIter, JoinStrategy, JoinType, Key, Kind, MemCollection, Operator, Predicate, PredicateJoin,
    Projection, Properties, Selection,
};

fn leaf(c: MemCollection) -> Arc<Operator> {
    Arc::new(Operator::leaf(Arc::new(c)))
}

fn coll1() -> Arc<Operator> {
    leaf(MemCollection::dict("A.one", vec![("k1", json!({"f": "x"})), ("k2", json!({"f": "y"}))]).unwrap())
}

fn coll2() -> Arc<Operator> {
    leaf(MemCollection::dict("B.two", vec![("m1", json!({"g": "x"}))]).unwrap())
}

fn collect(iter: ItemIter<'_>) -> Vec<(Key, Value)> {
    iter.collect::<Result<Vec<_>, _>>().unwrap()
}

/// Counts rows pulled from the wrapped collection.
#[derive(Debug)]
struct Counting {
    inner: MemCollection,
    pulled: Arc<AtomicUsize>,
}

impl Collection for Counting {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn kind(&self) -> Kind {
        self.inner.kind()
    }

    fn properties(&self) -> &Properties {
        self.inner.properties()
    }

    fn items(&self, filters: &Filters) -> tabula_algebra::Result<ItemIter<'_>> {
        let pulled = self.pulled.clone();
        Ok(Box::new(self.inner.items(filters)?.inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        })))
    }

    fn item(&self, key: &Key) -> tabula_algebra::Result<Option<Value>> {
        self.inner.item(key)
    }
}

#[test]
fn test_inner_join_fixture() {
    let join = FieldJoin::new(JoinType::Inner, coll1(), "f", coll2(), "g").unwrap();
    assert_eq!(join.join_type(), JoinType::Inner);
    assert_eq!(join.fields(), ("f", "g"));
    let rows = collect(join.items(&Filters::default()).unwrap());
    assert_eq!(
        rows,
        vec![(concat(&Key::from("k1"), &Key::from("m1")), json!({"f": "x", "g": "x"}))]
    );
}

#[test]
fn test_left_join_fixture() {
    let join = FieldJoin::new(JoinType::Left, coll1(), "f", coll2(), "g").unwrap();
    let rows = collect(join.items(&Filters::default()).unwrap());
    assert_eq!(
        rows,
        vec![
            (concat(&Key::from("k1"), &Key::from("m1")), json!({"f": "x", "g": "x"})),
            (concat(&Key::from("k2"), &Key::empty()), json!({"f": "y", "g": null})),
        ]
    );
}

#[test]
fn test_diff_join_fixture() {
    let join = FieldJoin::new(JoinType::Diff, coll1(), "f", coll2(), "g").unwrap();
    let rows = collect(join.items(&Filters::default()).unwrap());
    assert_eq!(rows, vec![(concat(&Key::from("k2"), &Key::empty()), json!({"f": "y"}))]);
    assert_eq!(join.properties().keys().collect::<Vec<_>>(), vec!["f"]);
}

#[test]
fn test_left_join_prefixes_colliding_names() {
    let a = leaf(MemCollection::dict("A.a", vec![("a1", json!({"code": 1, "name": "one"}))]).unwrap());
    let b = leaf(MemCollection::dict("B.b", vec![("b1", json!({"code": 2, "name": "two"}))]).unwrap());
    let join = FieldJoin::new(JoinType::Left, a, "code", b, "code").unwrap();
    let rows = collect(join.items(&Filters::default()).unwrap());
    assert_eq!(
        rows[0].1,
        json!({"s1_code": 1, "s1_name": "one", "s2_code": null, "s2_name": null})
    );
}

#[test]
fn test_join_point_lookup_matches_iteration() {
    for join_type in [JoinType::Inner, JoinType::Left, JoinType::Diff] {
        let join = Operator::FieldJoin(FieldJoin::new(join_type, coll1(), "f", coll2(), "g").unwrap());
        for (key, value) in collect(join.items(&Filters::default()).unwrap()) {
            assert_eq!(join.item(&key).unwrap(), Some(value));
        }
        // a pairing the join never produces
        let stray = concat(&Key::from("k2"), &Key::from("m1"));
        assert_eq!(join.item(&stray).unwrap(), None);
    }
}

#[test]
fn test_join_skip_counts_expanded_rows() {
    let b = leaf(
        MemCollection::dict("B.two", vec![("m1", json!({"g": "x"})), ("m2", json!({"g": "x"}))]).unwrap(),
    );
    let join = Operator::FieldJoin(FieldJoin::new(JoinType::Left, coll1(), "f", b, "g").unwrap());
    assert!(join.implemented_filters().contains(&FilterKind::Skip));

    let all = collect(join.items(&Filters::default()).unwrap());
    assert_eq!(all.len(), 3);
    let skipped = collect(paginate(&join, 2).unwrap());
    assert_eq!(skipped, all[2..].to_vec());
}

#[test]
fn test_projection_order_and_missing_field() {
    let c = leaf(
        MemCollection::dict(
            "A.t",
            vec![("r1", json!({"a": 1, "b": 2, "c": 3})), ("r2", json!({"b": 5}))],
        )
        .unwrap(),
    );
    let proj = Projection::new(c, vec![("c".into(), "z".into()), ("b".into(), "a".into())]).unwrap();
    assert_eq!(proj.id(), "proj(A.t,[c>z,b>a])");
    assert_eq!(proj.input().id(), "A.t");
    assert_eq!(proj.pairs()[1], ("b".to_string(), "a".to_string()));

    let mut rows = proj.items(&Filters::default()).unwrap();
    let (key, first) = rows.next().unwrap().unwrap();
    assert_eq!(key, Key::from("r1"));
    let names: Vec<_> = first.as_object().unwrap().keys().cloned().collect();
    assert_eq!(names, vec!["z", "a"]);

    let err = rows.next().unwrap().unwrap_err();
    assert_eq!(err, AlgebraError::MissingField("c".to_string()));
}

#[test]
fn test_projection_is_lazy() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let inner = MemCollection::list(
        "A.l",
        Kind::ListOfTuples,
        (0..100).map(|i| json!({"n": i})),
    )
    .unwrap();
    let counting = Operator::leaf(Arc::new(Counting {
        inner,
        pulled: pulled.clone(),
    }));
    let proj = Projection::new(Arc::new(counting), vec![("n".into(), "m".into())]).unwrap();
    let first: Vec<_> = proj.items(&Filters::default()).unwrap().take(3).collect();
    assert_eq!(first.len(), 3);
    assert_eq!(pulled.load(Ordering::SeqCst), 3);
}

#[test]
fn test_selection_pushdown_and_post_filter_agree() {
    let rows = vec![
        ("a", json!({"pop": 10})),
        ("b", json!({"pop": 30})),
        ("c", json!({"pop": 20})),
    ];
    let native = leaf(MemCollection::dict("A.p", rows.clone()).unwrap());
    let pulled = Arc::new(AtomicUsize::new(0));
    let plain = Arc::new(Operator::leaf(Arc::new(Counting {
        inner: MemCollection::dict("A.p", rows).unwrap(),
        pulled: pulled.clone(),
    })));

    let predicate = Predicate::constant("pop", ">=", 20).unwrap();
    let pushed = Selection::new(predicate.clone(), native).unwrap();
    let filtered = Selection::new(predicate, plain).unwrap();
    assert!(pushed.pushes_down());
    assert!(!filtered.pushes_down());
    assert_eq!(pushed.predicate(), filtered.predicate());
    assert_eq!(pushed.input().id(), filtered.input().id());

    let expected = collect(filtered.items(&Filters::default()).unwrap());
    assert_eq!(collect(pushed.items(&Filters::default()).unwrap()), expected);
    assert_eq!(expected.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(), vec![Key::from("b"), Key::from("c")]);
    assert_eq!(pulled.load(Ordering::SeqCst), 3);
}

fn counting(inner: MemCollection) -> (Arc<Operator>, Arc<AtomicUsize>) {
    let pulled = Arc::new(AtomicUsize::new(0));
    let op = Operator::leaf(Arc::new(Counting {
        inner,
        pulled: pulled.clone(),
    }));
    (Arc::new(op), pulled)
}

fn numbered(id: &str, n: usize) -> MemCollection {
    MemCollection::list(id, Kind::ListOfTuples, (0..n).map(|i| json!({"f": "x", "n": i}))).unwrap()
}

#[test]
fn test_selection_skip_counts_matching_rows() {
    let rows = vec![
        ("a", json!({"pop": 10})),
        ("b", json!({"pop": 30})),
        ("c", json!({"pop": 20})),
        ("d", json!({"pop": 40})),
    ];
    let predicate = Predicate::constant("pop", ">=", 20).unwrap();
    let pushed = Operator::Selection(
        Selection::new(predicate.clone(), leaf(MemCollection::dict("A.p", rows.clone()).unwrap())).unwrap(),
    );
    let (plain, _) = counting(MemCollection::dict("A.p", rows).unwrap());
    let filtered = Operator::Selection(Selection::new(predicate, plain).unwrap());

    assert_eq!(pushed.implemented_filters(), &[FilterKind::Skip]);
    assert!(filtered.implemented_filters().is_empty());

    let native = collect(paginate(&pushed, 1).unwrap());
    assert_eq!(native, collect(paginate(&filtered, 1).unwrap()));
    assert_eq!(
        native.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(),
        vec![Key::from("c"), Key::from("d")]
    );
}

#[test]
fn test_product_is_lazy() {
    let (left, left_pulled) = counting(numbered("A.l", 50));
    let (right, right_pulled) = counting(numbered("B.r", 50));
    let product = Operator::Product(CartesianProduct::new(left, right).unwrap());
    let first: Vec<_> = product.items(&Filters::default()).unwrap().take(1).collect();
    assert_eq!(first.len(), 1);
    assert_eq!(left_pulled.load(Ordering::SeqCst), 1);
    assert_eq!(right_pulled.load(Ordering::SeqCst), 1);
}

#[test]
fn test_field_join_is_lazy() {
    let (left, left_pulled) = counting(numbered("A.l", 50));
    let join = Operator::FieldJoin(FieldJoin::new(JoinType::Inner, left, "f", coll2(), "g").unwrap());
    let first: Vec<_> = join.items(&Filters::default()).unwrap().take(1).collect();
    assert_eq!(first.len(), 1);
    assert_eq!(left_pulled.load(Ordering::SeqCst), 1);
}

#[test]
fn test_paginate_surfaces_errors_in_skipped_rows() {
    let (sparse, _) = counting(
        MemCollection::dict(
            "A.s",
            vec![("a", json!({"pop": 1})), ("b", json!({})), ("c", json!({"pop": 3}))],
        )
        .unwrap(),
    );
    let sel = Operator::Selection(Selection::new(Predicate::constant("pop", ">", 0).unwrap(), sparse).unwrap());
    assert!(sel.implemented_filters().is_empty());

    let rows: Vec<_> = paginate(&sel, 1).unwrap().collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], Err(AlgebraError::MissingField("pop".to_string())));
    assert_eq!(rows[1].as_ref().unwrap().0, Key::from("c"));
}

#[test]
fn test_selection_point_lookup() {
    let sel = Selection::new(Predicate::constant("f", "=", "x").unwrap(), coll1()).unwrap();
    assert_eq!(sel.item(&Key::from("k1")).unwrap(), Some(json!({"f": "x"})));
    assert_eq!(sel.item(&Key::from("k2")).unwrap(), None);
}

#[test]
fn test_product() {
    let product = CartesianProduct::new(coll1(), coll2()).unwrap();
    assert_eq!((product.left().id(), product.right().id()), ("A.one".to_string(), "B.two".to_string()));
    assert_eq!(product.merger().resolve("g").unwrap().original_name, "g");
    let rows = collect(product.items().unwrap());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1], (concat(&Key::from("k2"), &Key::from("m1")), json!({"f": "y", "g": "x"})));
    assert_eq!(product.item(&rows[1].0).unwrap(), Some(rows[1].1.clone()));
    assert!(matches!(
        product.item(&Key::from("k1")),
        Err(AlgebraError::MalformedKey(_))
    ));
}

#[test]
fn test_value_collections_are_rejected() {
    let values = leaf(MemCollection::list("A.v", Kind::ListOfValues, vec![json!(1)]).unwrap());
    let err = CartesianProduct::new(coll1(), values.clone()).unwrap_err();
    assert!(matches!(err, AlgebraError::IncompatibleKind { kind: Kind::ListOfValues, .. }));
    assert!(FieldJoin::new(JoinType::Inner, values.clone(), "f", coll2(), "g").is_err());
    assert!(Projection::new(values.clone(), vec![]).is_err());
    assert!(Selection::new(Predicate::constant("f", "=", 1).unwrap(), values).is_err());
}

#[test]
fn test_predicate_join_rewrites_equality() {
    let join = PredicateJoin::new(
        JoinType::Inner,
        coll1(),
        coll2(),
        Predicate::fields_compare("g", "=", "f").unwrap(),
    )
    .unwrap();
    assert_eq!(
        join.strategy(),
        &JoinStrategy::FieldJoin {
            left_field: "f".to_string(),
            right_field: "g".to_string()
        }
    );
    assert_eq!(join.plan().id(), "inner-join(A.one,f,B.two,g)");
    assert_eq!(join.id(), "inner-join(A.one,B.two,g=f)");
    let rows = collect(join.items(&Filters::default()).unwrap());
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_predicate_join_comparison_falls_back() {
    let join = PredicateJoin::new(
        JoinType::Inner,
        coll1(),
        coll2(),
        Predicate::fields_compare("f", ">", "g").unwrap(),
    )
    .unwrap();
    assert_eq!(join.strategy(), &JoinStrategy::ProductThenFilter);
    assert!(matches!(join.plan(), Operator::Selection(_)));
    let rows = collect(join.items(&Filters::default()).unwrap());
    assert_eq!(rows, vec![(concat(&Key::from("k2"), &Key::from("m1")), json!({"f": "y", "g": "x"}))]);
}

#[test]
fn test_predicate_join_only_inner() {
    let err = PredicateJoin::new(
        JoinType::Left,
        coll1(),
        coll2(),
        Predicate::fields_compare("f", "=", "g").unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, AlgebraError::NotImplemented(_)));
}

#[test]
fn test_operator_ids() {
    let sel = Operator::Selection(
        Selection::new(Predicate::constant("f", "=", "x").unwrap(), coll1()).unwrap(),
    );
    assert_eq!(sel.id(), "select(f=\"x\",A.one)");
    let product = Operator::Product(CartesianProduct::new(coll1(), coll2()).unwrap());
    assert_eq!(product.id(), "product(A.one,B.two)");
    let join = Operator::FieldJoin(FieldJoin::new(JoinType::Diff, coll1(), "f", coll2(), "g").unwrap());
    assert_eq!(join.id(), "diff-join(A.one,f,B.two,g)");
    assert_eq!(join.fingerprint().len(), 64);
}
