//! Worker pool: fixed-size rayon pool pulling jobs from a shared cursor

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::config::ResizeRequest;
use crate::error::{CompressError, Result};
use crate::processing::{process_job, ImageCodec};

pub mod progress;
pub mod scheduler;

pub use progress::*;
pub use scheduler::*;

/// Hardware concurrency above which two threads are left for the system
const RESERVE_THRESHOLD: usize = 7;

/// Threads kept free on large machines
const RESERVED_THREADS: usize = 2;

/// Compute the number of workers for a run.
///
/// `cap` is an explicit worker count from the user and is honoured as-is
/// (bounded by the job count). Without it, the detected `hardware`
/// concurrency is used and two threads are reserved on machines with more
/// than seven.
pub fn pool_size(jobs: usize, hardware: usize, cap: Option<usize>) -> usize {
    if jobs == 0 {
        return 0;
    }

    let size = match cap {
        Some(cap) => cap.min(jobs),
        None => {
            let size = hardware.min(jobs);
            if size == hardware && hardware > RESERVE_THRESHOLD {
                size - RESERVED_THREADS
            } else {
                size
            }
        }
    };

    size.max(1)
}

/// Everything a worker reads; borrowed for the lifetime of the pool
pub struct WorkerContext<'a, C: ?Sized> {
    pub catalog: &'a Catalog,
    pub request: &'a ResizeRequest,
    pub output_dir: &'a Path,
    pub distributor: &'a WorkDistributor,
    pub progress: &'a ProgressState,
    pub codec: &'a C,
}

/// Best-effort text of a panic payload
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Worker loop: claim, process, count, repeat until the cursor is exhausted.
///
/// Per-file failures are logged and counted; they never stop the loop. A
/// panic inside the codec is caught and counted as a failure of that file.
/// Returns the number of jobs this worker claimed.
pub fn run_worker<C>(id: usize, context: &WorkerContext<'_, C>) -> usize
where
    C: ImageCodec + ?Sized,
{
    let mut claimed = 0;

    while let Some(index) = context.distributor.claim_next() {
        let Some(job) = context.catalog.get(index) else {
            warn!(worker = id, index, "Claimed index outside the catalog");
            continue;
        };
        claimed += 1;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            process_job(
                &job.source_path,
                context.output_dir,
                context.request,
                context.codec,
            )
        }))
        .unwrap_or_else(|payload| {
            Err(CompressError::codec_panic(
                &job.source_path,
                panic_message(payload),
            ))
        });

        match result {
            Ok(outcome) => {
                context.progress.record_success();
                debug!(
                    worker = id,
                    "Wrote {:?} ({} -> {}) in {:.1}ms",
                    outcome.output_path,
                    outcome.original,
                    outcome.resized,
                    outcome.processing_time.as_secs_f64() * 1000.0
                );
            }
            Err(e) => {
                context.progress.record_failure();
                let path = e.file_path().unwrap_or(job.source_path.as_path());
                if e.is_recoverable() {
                    error!(
                        worker = id,
                        path = %path.display(),
                        "Skipping image: {}",
                        e.user_message()
                    );
                } else {
                    error!(
                        worker = id,
                        path = %path.display(),
                        "Unexpected failure, skipping image: {}",
                        e
                    );
                }
            }
        }
    }

    debug!(worker = id, claimed, "Worker finished");
    claimed
}

/// Fixed-size pool of OS threads
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `size` workers to exhaustion and wait for all of them.
    pub fn run<C>(&self, context: &WorkerContext<'_, C>) -> Result<()>
    where
        C: ImageCodec + ?Sized,
    {
        if self.size == 0 {
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.size)
            .thread_name(|i| format!("imgcompress-worker-{i}"))
            .build()
            .map_err(|e| CompressError::parallel(format!("Failed to start worker pool: {e}")))?;

        info!("Starting {} workers for {} images", self.size, context.catalog.len());

        pool.scope(|scope| {
            for id in 0..self.size {
                scope.spawn(move |_| {
                    run_worker(id, context);
                });
            }
        });

        debug!(
            "Workers claimed {} of {} jobs",
            context.distributor.claimed(),
            context.distributor.len()
        );

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::ImageFormat;
    use crate::processing::{Dimensions, PixelLayout};
    use image::DynamicImage;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(PathBuf),
        Resize { target: Dimensions, layout: PixelLayout },
        Encode { output: PathBuf, format: ImageFormat, quality: u8 },
    }

    /// Codec that records operations instead of touching pixels.
    /// Sources whose name contains "corrupt" fail to decode, "panic" makes
    /// decode panic, and "alpha" decodes as RGBA.
    #[derive(Default)]
    pub struct MockCodec {
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    impl MockCodec {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn decoded(&self) -> Vec<PathBuf> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Decode(path) => Some(path),
                    _ => None,
                })
                .collect()
        }
    }

    impl ImageCodec for MockCodec {
        fn decode(&self, path: &Path) -> Result<DynamicImage> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(path.to_path_buf()));

            let name = path.file_name().unwrap().to_string_lossy();
            if name.contains("corrupt") {
                return Err(CompressError::decode(path, "invalid header"));
            }
            if name.contains("panic") {
                panic!("decoder exploded on {name}");
            }
            if name.contains("alpha") {
                return Ok(DynamicImage::new_rgba8(40, 20));
            }
            Ok(DynamicImage::new_rgb8(40, 20))
        }

        fn resize(
            &self,
            _source: &Path,
            _image: &DynamicImage,
            target: Dimensions,
            layout: PixelLayout,
        ) -> Result<DynamicImage> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Resize { target, layout });
            Ok(DynamicImage::new_rgb8(target.width, target.height))
        }

        fn encode(
            &self,
            _image: &DynamicImage,
            format: ImageFormat,
            quality: u8,
            output: &Path,
        ) -> Result<()> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                output: output.to_path_buf(),
                format,
                quality,
            });
            Ok(())
        }
    }

    fn synthetic_catalog(names: &[&str]) -> Catalog {
        Catalog::from_paths(names.iter().map(|name| PathBuf::from("/in").join(name)))
    }

    #[test]
    fn test_pool_size() {
        // Empty run starts nobody
        assert_eq!(pool_size(0, 8, None), 0);
        assert_eq!(pool_size(0, 8, Some(4)), 0);

        // Fewer jobs than threads
        assert_eq!(pool_size(3, 16, None), 3);
        assert_eq!(pool_size(1, 1, None), 1);

        // Reservation only on large machines when every thread would be used
        assert_eq!(pool_size(100, 16, None), 14);
        assert_eq!(pool_size(100, 8, None), 6);
        assert_eq!(pool_size(100, 7, None), 7);
        assert_eq!(pool_size(100, 4, None), 4);

        // Explicit cap is honoured without reservation
        assert_eq!(pool_size(100, 16, Some(16)), 16);
        assert_eq!(pool_size(100, 16, Some(4)), 4);
        assert_eq!(pool_size(2, 16, Some(4)), 2);
    }

    #[test]
    fn test_single_worker_processes_everything() {
        let catalog = synthetic_catalog(&["a.jpg", "b.png", "c.jpeg"]);
        let request = ResizeRequest::new().percentage(50).quality(80);
        let distributor = WorkDistributor::new(catalog.len());
        let progress = ProgressState::new(catalog.len());
        let codec = MockCodec::new();

        let context = WorkerContext {
            catalog: &catalog,
            request: &request,
            output_dir: Path::new("/out"),
            distributor: &distributor,
            progress: &progress,
            codec: &codec,
        };

        assert_eq!(run_worker(0, &context), 3);
        assert_eq!(progress.completed(), 3);
        assert_eq!(progress.failed(), 0);

        let ops = codec.get_operations();
        assert!(ops.contains(&RecordedOp::Resize {
            target: Dimensions::new(20, 10),
            layout: PixelLayout::Rgb,
        }));
        assert!(ops.contains(&RecordedOp::Encode {
            output: PathBuf::from("/out/b_50_80.png"),
            format: ImageFormat::Png,
            quality: 80,
        }));
        assert!(ops.contains(&RecordedOp::Encode {
            output: PathBuf::from("/out/c_50_80.jpeg"),
            format: ImageFormat::Jpeg,
            quality: 80,
        }));

        // Exhausted: a second call finds nothing
        assert_eq!(run_worker(1, &context), 0);
    }

    #[test]
    fn test_failures_are_isolated() {
        let catalog = synthetic_catalog(&["ok1.png", "corrupt.jpg", "ok2.jpg", "clip.gif"]);
        let request = ResizeRequest::new();
        let distributor = WorkDistributor::new(catalog.len());
        let progress = ProgressState::new(catalog.len());
        let codec = MockCodec::new();

        let context = WorkerContext {
            catalog: &catalog,
            request: &request,
            output_dir: Path::new("/out"),
            distributor: &distributor,
            progress: &progress,
            codec: &codec,
        };

        WorkerPool::new(2).run(&context).unwrap();

        // Corrupt source fails at decode, the gif at output format detection
        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.failed(), 2);
        assert!(progress.is_done());
        assert!(!codec.decoded().contains(&PathBuf::from("/in/clip.gif")));
    }

    #[test]
    fn test_codec_panic_counts_as_failure() {
        let catalog = synthetic_catalog(&["before.png", "panic.jpg", "after.png"]);
        let request = ResizeRequest::new();
        let distributor = WorkDistributor::new(catalog.len());
        let progress = ProgressState::new(catalog.len());
        let codec = MockCodec::new();

        let context = WorkerContext {
            catalog: &catalog,
            request: &request,
            output_dir: Path::new("/out"),
            distributor: &distributor,
            progress: &progress,
            codec: &codec,
        };

        // One worker: the panic must not end its loop
        assert_eq!(run_worker(0, &context), 3);
        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.failed(), 1);
        assert!(progress.is_done());
        assert_eq!(codec.decoded().len(), 3);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic");
    }

    #[test]
    fn test_progress_never_exceeds_total_while_running() {
        let names: Vec<String> = (0..500)
            .map(|i| {
                if i % 7 == 0 {
                    format!("corrupt{i:03}.jpg")
                } else {
                    format!("img{i:03}.png")
                }
            })
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let catalog = synthetic_catalog(&refs);
        let request = ResizeRequest::new().percentage(50);
        let distributor = WorkDistributor::new(catalog.len());
        let progress = ProgressState::new(catalog.len());
        let codec = MockCodec::new();

        let context = WorkerContext {
            catalog: &catalog,
            request: &request,
            output_dir: Path::new("/out"),
            distributor: &distributor,
            progress: &progress,
            codec: &codec,
        };

        let samples = std::thread::scope(|scope| {
            let observer = scope.spawn(|| {
                let mut samples = 0_usize;
                let mut last_settled = 0;
                loop {
                    let done = progress.is_done();
                    let completed = progress.completed();
                    let settled = progress.settled();
                    assert!(completed <= progress.total());
                    assert!(settled <= progress.total());
                    assert!(settled >= last_settled);
                    last_settled = settled;
                    samples += 1;
                    if done {
                        break samples;
                    }
                    std::thread::yield_now();
                }
            });

            WorkerPool::new(4).run(&context).unwrap();
            observer.join().unwrap()
        });

        assert!(samples >= 1);
        assert_eq!(progress.settled(), 500);
        assert_eq!(progress.failed(), (0..500).filter(|i| i % 7 == 0).count());
        assert_eq!(distributor.claimed(), 500);
    }

    #[test]
    fn test_alpha_sources_use_rgba_layout() {
        let catalog = synthetic_catalog(&["alpha.png"]);
        let request = ResizeRequest::new().width(10);
        let distributor = WorkDistributor::new(1);
        let progress = ProgressState::new(1);
        let codec = MockCodec::new();

        let context = WorkerContext {
            catalog: &catalog,
            request: &request,
            output_dir: Path::new("/out"),
            distributor: &distributor,
            progress: &progress,
            codec: &codec,
        };
        run_worker(0, &context);

        assert!(codec.get_operations().contains(&RecordedOp::Resize {
            target: Dimensions::new(10, 5),
            layout: PixelLayout::Rgba,
        }));
    }

    #[test]
    fn test_pool_visits_every_job_once() {
        let names: Vec<String> = (0..200).map(|i| format!("img{i:03}.png")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let catalog = synthetic_catalog(&refs);
        let request = ResizeRequest::new();
        let distributor = WorkDistributor::new(catalog.len());
        let progress = ProgressState::new(catalog.len());
        let codec = MockCodec::new();

        let context = WorkerContext {
            catalog: &catalog,
            request: &request,
            output_dir: Path::new("/out"),
            distributor: &distributor,
            progress: &progress,
            codec: &codec,
        };

        WorkerPool::new(8).run(&context).unwrap();

        let decoded = codec.decoded();
        let unique: HashSet<_> = decoded.iter().collect();
        assert_eq!(decoded.len(), 200);
        assert_eq!(unique.len(), 200);
        assert_eq!(progress.completed(), 200);
        assert_eq!(distributor.claim_next(), None);
    }

    #[test]
    fn test_zero_sized_pool_is_noop() {
        let catalog = Catalog::default();
        let request = ResizeRequest::new();
        let distributor = WorkDistributor::new(0);
        let progress = ProgressState::new(0);
        let codec = MockCodec::new();

        let context = WorkerContext {
            catalog: &catalog,
            request: &request,
            output_dir: Path::new("/out"),
            distributor: &distributor,
            progress: &progress,
            codec: &codec,
        };

        assert!(WorkerPool::new(0).run(&context).is_ok());
        assert!(codec.get_operations().is_empty());
    }
}
