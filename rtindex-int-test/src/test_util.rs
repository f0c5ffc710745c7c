use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtindex::{CreateOptions, Envelope, Geometry, IndexResult, RTreeIndex, RecordType};
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

/// Runs `test` against the context built by `before`, then always runs
/// `after`. Any error or panic fails the test with its context.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> IndexResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> IndexResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> IndexResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => after(ctx)
                    .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                Err(e) => {
                    let _ = after(ctx);
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            },
            Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        }
    });

    let message = match result {
        Ok(Ok(_)) => return,
        Ok(Err((e, bt))) => {
            if !bt.is_empty() && !bt.contains("disabled") {
                eprintln!("\nBacktrace:\n{}", bt);
            }
            e
        }
        Err(panic_err) => {
            if let Some(s) = panic_err.downcast_ref::<&str>() {
                format!("Panic: {}", s)
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                format!("Panic: {}", s)
            } else {
                "Panic: unknown payload".to_string()
            }
        }
    };

    panic!(
        "Test failed after {:?}. Last error: {}",
        start_time.elapsed(),
        message
    );
}

#[derive(Clone)]
pub struct TestContext {
    dir: Arc<TempDir>,
    index: Arc<RTreeIndex>,
}

impl TestContext {
    pub fn new(dir: TempDir, index: RTreeIndex) -> Self {
        Self {
            dir: Arc::new(dir),
            index: Arc::new(index),
        }
    }

    /// Directory holding this context's files.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Entry path of the context's index.
    pub fn path(&self) -> PathBuf {
        self.index.path().to_path_buf()
    }

    pub fn index(&self) -> Arc<RTreeIndex> {
        self.index.clone()
    }
}

/// A fresh index, opened read-write, in its own temporary directory.
pub fn create_test_context(
    record_type: RecordType,
    options: CreateOptions,
) -> IndexResult<TestContext> {
    let dir = tempfile::tempdir()?;
    let index = RTreeIndex::create(dir.path().join("features"), record_type, &options)?;
    Ok(TestContext::new(dir, index))
}

/// Point index on the smallest page size, so a few hundred points already
/// build a multi-level tree.
pub fn create_point_context() -> IndexResult<TestContext> {
    create_test_context(RecordType::Point, CreateOptions::default().with_page_size(512))
}

pub fn create_rectangle_context() -> IndexResult<TestContext> {
    create_test_context(
        RecordType::Rectangle,
        CreateOptions::default().with_page_size(512),
    )
}

pub fn cleanup(ctx: TestContext) -> IndexResult<()> {
    ctx.index().close()?;
    RTreeIndex::clean(ctx.path())
}

/// A geometry with the id it is indexed under.
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry,
}

/// `count` points spread over the globe, ids `"0"`, `"1"`, ...
///
/// Coordinates are drawn as `f32` so they survive a float index unchanged.
pub fn point_features(count: usize, seed: u64) -> Vec<Feature> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| Feature {
            id: i.to_string(),
            geometry: Geometry::point(
                rng.gen_range(-180.0f32..180.0) as f64,
                rng.gen_range(-90.0f32..90.0) as f64,
            ),
        })
        .collect()
}

/// `count` small rectangles spread over the globe, ids `"0"`, `"1"`, ...
pub fn rectangle_features(count: usize, seed: u64) -> Vec<Feature> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let x = rng.gen_range(-180.0f32..170.0);
            let y = rng.gen_range(-90.0f32..80.0);
            let w = rng.gen_range(0.0f32..10.0);
            let h = rng.gen_range(0.0f32..10.0);
            Feature {
                id: i.to_string(),
                geometry: Geometry::rectangle(
                    x as f64,
                    y as f64,
                    (x + w) as f64,
                    (y + h) as f64,
                ),
            }
        })
        .collect()
}

/// Random query windows inside the globe.
pub fn query_envelopes(count: usize, seed: u64) -> Vec<Envelope> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let x = rng.gen_range(-180.0..150.0);
            let y = rng.gen_range(-90.0..60.0);
            let w = rng.gen_range(0.0..60.0);
            let h = rng.gen_range(0.0..40.0);
            Envelope::new(x, y, x + w, y + h)
        })
        .collect()
}

pub fn push_all(index: &RTreeIndex, features: &[Feature]) -> IndexResult<()> {
    for feature in features {
        index.push(&feature.geometry, &feature.id)?;
    }
    Ok(())
}

/// Ids of `features` overlapping `query`, found by a linear scan.
pub fn scan_intersecting(features: &[Feature], query: &Envelope) -> Vec<String> {
    let mut ids: Vec<String> = features
        .iter()
        .filter(|f| f.geometry.envelope().intersects(query))
        .map(|f| f.id.clone())
        .collect();
    sort_numeric(&mut ids);
    ids
}

/// Ids of `features` lying inside `query`, found by a linear scan.
pub fn scan_contained(features: &[Feature], query: &Envelope) -> Vec<String> {
    let mut ids: Vec<String> = features
        .iter()
        .filter(|f| query.contains(&f.geometry.envelope()))
        .map(|f| f.id.clone())
        .collect();
    sort_numeric(&mut ids);
    ids
}

/// Sorts numeric ids by value.
pub fn sort_numeric(ids: &mut [String]) {
    ids.sort_by_key(|id| id.parse::<u64>().unwrap_or(u64::MAX));
}
