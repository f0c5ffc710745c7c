//! Create, reopen and close behavior of an index file pair.

use rtindex::{
    CreateOptions, Envelope, Geometry, IndexError, OpenMode, Precision, RTreeIndex, RecordType,
};
use rtindex_int_test::test_util::{
    cleanup, create_point_context, create_rectangle_context, create_test_context, point_features,
    push_all, run_test,
};

#[test]
fn test_point_features_survive_reopen() {
    run_test(
        || create_test_context(RecordType::Point, CreateOptions::default()),
        |ctx| {
            let index = ctx.index();
            let features = point_features(478, 478);
            push_all(&index, &features)?;
            index.close()?;

            index.open_flag("rs")?;
            assert_eq!(index.mode(), Some(OpenMode::ReadOnly));
            assert_eq!(index.count()?, 478);

            let reopened = RTreeIndex::open_path(ctx.path(), OpenMode::ReadOnly)?;
            assert_eq!(reopened.count()?, 478);
            assert_eq!(reopened.all_ids()?.len(), 478);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_world_corner_rectangles() {
    run_test(
        || create_rectangle_context(),
        |ctx| {
            let index = ctx.index();
            index.push(&Geometry::rectangle(-180.0, -90.0, -160.0, -70.0), "1")?;
            index.push(&Geometry::rectangle(-180.0, 70.0, -160.0, 90.0), "2")?;
            index.push(&Geometry::rectangle(160.0, 70.0, 180.0, 90.0), "3")?;
            index.push(&Geometry::rectangle(160.0, -90.0, 180.0, -70.0), "4")?;
            assert_eq!(index.count()?, 4);

            let globe = Envelope::new(-180.0, -90.0, 180.0, 90.0);
            assert_eq!(index.intersections(&globe)?, vec!["1", "2", "3", "4"]);

            index.close()?;
            index.open(OpenMode::ReadOnly)?;
            assert_eq!(index.intersections(&globe)?, vec!["1", "2", "3", "4"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_duplicates_are_kept() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            for _ in 0..40 {
                index.push(&Geometry::point(3.0, 4.0), "same")?;
            }
            assert_eq!(index.count()?, 40);

            let hits = index.intersections(&Envelope::from_point(3.0, 4.0))?;
            assert_eq!(hits.len(), 40);
            assert!(hits.iter().all(|id| id == "same"));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_open_and_close_are_idempotent() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            index.push(&Geometry::point(1.0, 1.0), "1")?;

            index.open(OpenMode::ReadWrite)?;
            index.open(OpenMode::ReadWrite)?;
            assert_eq!(index.count()?, 1);

            index.close()?;
            index.close()?;
            assert!(!index.is_open());
            assert!(matches!(index.count(), Err(IndexError::Closed)));
            assert!(matches!(
                index.intersections(&Envelope::new(0.0, 0.0, 2.0, 2.0)),
                Err(IndexError::Closed)
            ));

            index.open_flag("r+")?;
            assert_eq!(index.count()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_read_only_rejects_mutation() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            push_all(&index, &point_features(20, 1))?;
            index.open(OpenMode::ReadOnly)?;

            assert!(matches!(
                index.push(&Geometry::point(0.0, 0.0), "x"),
                Err(IndexError::ReadOnly)
            ));
            assert!(matches!(
                index.delete(&Geometry::point(0.0, 0.0)),
                Err(IndexError::ReadOnly)
            ));
            assert_eq!(index.count()?, 20);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_double_precision_keeps_coordinates() {
    run_test(
        || {
            create_test_context(
                RecordType::Point,
                CreateOptions::default().with_float(false).with_page_size(1024),
            )
        },
        |ctx| {
            let index = ctx.index();
            let (x, y) = (12.345678901234, -45.678901234567);
            index.push(&Geometry::point(x, y), "precise")?;
            index.close()?;

            index.open(OpenMode::ReadOnly)?;
            let stats = index.stats()?;
            assert_eq!(stats.precision, Precision::Double);
            assert_eq!(stats.page_size, 1024);
            assert_eq!(index.intersections(&Envelope::from_point(x, y))?, vec!["precise"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_foreign_file_is_rejected() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            index.close()?;
            std::fs::write(rtindex::files::idx_path(ctx.path()), vec![7u8; 1024])?;

            let result = RTreeIndex::open_path(ctx.path(), OpenMode::ReadOnly);
            assert!(matches!(
                result,
                Err(IndexError::Corrupted(_)) | Err(IndexError::Serialization(_))
            ));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
