//! Query results checked against a linear scan and an in-memory R-tree.

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use rtindex::{Envelope, Geometry, RTreeIndex};
use rtindex_int_test::test_util::{
    cleanup, create_point_context, create_rectangle_context, point_features, push_all,
    query_envelopes, rectangle_features, run_test, scan_contained, scan_intersecting,
    sort_numeric, Feature,
};

type OracleItem = GeomWithData<Rectangle<[f64; 2]>, String>;

fn oracle(features: &[Feature]) -> RTree<OracleItem> {
    let items = features
        .iter()
        .map(|f| {
            let e = f.geometry.envelope();
            GeomWithData::new(
                Rectangle::from_corners([e.min_x, e.min_y], [e.max_x, e.max_y]),
                f.id.clone(),
            )
        })
        .collect();
    RTree::bulk_load(items)
}

fn oracle_intersecting(tree: &RTree<OracleItem>, query: &Envelope) -> Vec<String> {
    let aabb = AABB::from_corners([query.min_x, query.min_y], [query.max_x, query.max_y]);
    let mut ids: Vec<String> = tree
        .locate_in_envelope_intersecting(&aabb)
        .map(|item| item.data.clone())
        .collect();
    sort_numeric(&mut ids);
    ids
}

fn check_queries(index: &RTreeIndex, features: &[Feature], seed: u64) -> rtindex::IndexResult<()> {
    let tree = oracle(features);
    for query in query_envelopes(25, seed) {
        let found = index.intersections(&query)?;
        assert_eq!(found, scan_intersecting(features, &query), "query {}", query);
        assert_eq!(found, oracle_intersecting(&tree, &query), "query {}", query);
        assert_eq!(index.contained(&query)?, scan_contained(features, &query));
    }
    Ok(())
}

#[test]
fn test_point_queries_match_scan() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            let features = point_features(2000, 42);
            push_all(&index, &features)?;

            assert_eq!(index.count()?, 2000);
            check_queries(&index, &features, 1)
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_rectangle_queries_match_scan() {
    run_test(
        || create_rectangle_context(),
        |ctx| {
            let index = ctx.index();
            let features = rectangle_features(1500, 9);
            push_all(&index, &features)?;

            assert_eq!(index.count()?, 1500);
            check_queries(&index, &features, 2)
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_small_pages_grow_deep_tree() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            let features = point_features(3000, 77);
            push_all(&index, &features)?;

            let stats = index.stats()?;
            assert_eq!(stats.record_count, 3000);
            assert!(stats.tree_height >= 3, "height {}", stats.tree_height);
            assert_eq!(stats.page_size, 512);

            index.close()?;
            index.open_flag("rs")?;
            assert_eq!(index.stats()?.tree_height, stats.tree_height);
            check_queries(&index, &features, 3)
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_queries_after_delete() {
    run_test(
        || create_rectangle_context(),
        |ctx| {
            let index = ctx.index();
            let features = rectangle_features(800, 13);
            push_all(&index, &features)?;

            let (removed, kept) = features.split_at(300);
            for feature in removed {
                assert!(index.delete(&feature.geometry)?, "{}", feature.geometry);
            }
            assert_eq!(index.count()?, 500);

            check_queries(&index, kept, 4)
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_delete_missing_geometry() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            push_all(&index, &point_features(100, 5))?;
            assert!(!index.delete(&Geometry::point(500.0, 500.0))?);
            assert_eq!(index.count()?, 100);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_whole_globe_returns_everything() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            let features = point_features(600, 21);
            push_all(&index, &features)?;

            let globe = Envelope::new(-180.0, -90.0, 180.0, 90.0);
            let mut expected: Vec<String> = features.iter().map(|f| f.id.clone()).collect();
            sort_numeric(&mut expected);
            assert_eq!(index.intersections(&globe)?, expected);
            assert_eq!(index.contained(&globe)?, expected);
            assert_eq!(index.all_ids()?, expected);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
