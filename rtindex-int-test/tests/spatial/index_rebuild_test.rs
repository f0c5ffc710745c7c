//! Rebuilding an index beside the original and moving it into place.

use rtindex::{
    CreateOptions, Envelope, Geometry, IndexError, OpenMode, RTreeIndex, RecordType,
};
use rtindex_int_test::test_util::{
    cleanup, create_point_context, point_features, push_all, run_test,
};

#[test]
fn test_rebuild_through_temp() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            push_all(&index, &point_features(50, 1))?;
            index.close()?;

            let temp = RTreeIndex::temp(ctx.path());
            assert_ne!(temp, ctx.path());
            let rebuilt = point_features(120, 2);
            {
                let page_size = RTreeIndex::recommend_page_size(rebuilt.len() as u64);
                let options = CreateOptions::default().with_page_size(page_size);
                let scratch = RTreeIndex::create(&temp, RecordType::Point, &options)?;
                push_all(&scratch, &rebuilt)?;
            }
            assert!(RTreeIndex::exists(&temp));
            assert!(RTreeIndex::exists(ctx.path()));

            RTreeIndex::move_index(&temp, ctx.path(), true)?;
            assert!(!RTreeIndex::exists(&temp));

            index.open(OpenMode::ReadOnly)?;
            assert_eq!(index.count()?, 120);
            assert_eq!(index.stats()?.page_size, 4096);
            let globe = Envelope::new(-180.0, -90.0, 180.0, 90.0);
            assert_eq!(index.intersections(&globe)?.len(), 120);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_move_without_overwrite_keeps_both() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            index.close()?;

            let other = ctx.dir().join("other");
            RTreeIndex::create(&other, RecordType::Point, &CreateOptions::default())?.close()?;

            let result = RTreeIndex::move_index(&other, ctx.path(), false);
            assert!(matches!(result, Err(IndexError::AlreadyExists(_))));
            assert!(RTreeIndex::exists(&other));
            assert!(RTreeIndex::exists(ctx.path()));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_clean_removes_pair() {
    run_test(
        || create_point_context(),
        |ctx| {
            let index = ctx.index();
            index.close()?;
            let idx = rtindex::files::idx_path(ctx.path());
            assert_eq!(RTreeIndex::entry(&idx), ctx.path());

            RTreeIndex::clean(ctx.path())?;
            assert!(!RTreeIndex::exists(ctx.path()));
            assert!(!idx.exists());

            let reopened = RTreeIndex::new(&idx);
            assert!(matches!(
                reopened.open(OpenMode::ReadOnly),
                Err(IndexError::Io(_))
            ));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_rebuild_of_tmp_named_index_keeps_original() {
    run_test(
        || create_point_context(),
        |ctx| {
            let options = CreateOptions::default().with_page_size(512);
            let original = ctx.dir().join("roads.tmp");
            {
                let index = RTreeIndex::create(&original, RecordType::Point, &options)?;
                index.push(&Geometry::point(1.0, 2.0), "keep")?;
            }

            let temp = RTreeIndex::temp(&original);
            assert_ne!(temp, original);
            {
                let overwrite = options.clone().with_overwrite(true);
                let scratch = RTreeIndex::create(&temp, RecordType::Point, &overwrite)?;
                scratch.push(&Geometry::point(3.0, 4.0), "rebuilt")?;
            }

            let index = RTreeIndex::open_path(&original, OpenMode::ReadOnly)?;
            assert_eq!(index.count()?, 1);
            assert_eq!(index.all_ids()?, vec!["keep".to_string()]);
            index.close()?;

            assert_ne!(
                RTreeIndex::temp(ctx.dir().join("roads.v1")),
                RTreeIndex::temp(ctx.dir().join("roads.v2"))
            );

            RTreeIndex::clean(&temp)?;
            RTreeIndex::clean(&original)
        },
        |ctx| cleanup(ctx),
    )
}
