//! Run lifecycle: validate, catalog, start pool and monitor, report

use std::thread;
use std::time::Instant;

use console::style;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::{MonitorConfig, RunOptions};
use crate::error::{CompressError, Result};
use crate::parallel::{
    pool_size, ProgressMonitor, ProgressState, WorkDistributor, WorkerContext, WorkerPool,
};
use crate::processing::ImageCodec;

/// Aggregate outcome of one run, produced after every thread has joined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub total_found: usize,
    pub processed: usize,
    pub failed: usize,
    pub workers: usize,
    pub elapsed_seconds: f64,
}

impl RunResult {
    fn empty(elapsed_seconds: f64) -> Self {
        Self {
            total_found: 0,
            processed: 0,
            failed: 0,
            workers: 0,
            elapsed_seconds,
        }
    }

    /// Images written per second, zero for an instant or empty run
    pub fn images_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.processed as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }

    /// Print summary to stdout
    pub fn print_summary(&self) {
        println!("{}", style("Processing Summary:").bold());
        println!(
            "  {}: {} of {}",
            style("Processed").green(),
            self.processed,
            self.total_found
        );
        if self.failed > 0 {
            println!("  {}: {}", style("Failed").red(), self.failed);
        }
        println!("  {}: {}", style("Workers").cyan(), self.workers);
        println!(
            "  {}: {:.3}s",
            style("Duration").blue(),
            self.elapsed_seconds
        );
        if self.processed > 0 {
            println!(
                "  {}: {:.1} images/sec",
                style("Speed").cyan(),
                self.images_per_second()
            );
        }
    }
}

/// Owns the codec and display settings; one coordinator can drive many runs
pub struct RunCoordinator<C> {
    codec: C,
    monitor: MonitorConfig,
    show_progress: bool,
    hardware_threads: usize,
}

impl<C: ImageCodec> RunCoordinator<C> {
    /// Create a coordinator using the detected hardware concurrency
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            monitor: MonitorConfig::default(),
            show_progress: true,
            hardware_threads: num_cpus::get(),
        }
    }

    /// Set progress monitor configuration
    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    /// Draw the progress bar (still subject to `monitor.enabled`)
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Override the detected hardware concurrency
    pub fn hardware_threads(mut self, threads: usize) -> Self {
        self.hardware_threads = threads.max(1);
        self
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Execute one complete run.
    ///
    /// Fatal errors (bad parameters, missing input directory, output
    /// directory creation, pool startup) are returned. Per-image failures are
    /// only counted in [`RunResult::failed`].
    pub fn run(&self, options: &RunOptions) -> Result<RunResult> {
        let start_time = Instant::now();

        let plan = options.validate()?;
        info!(
            "Resizing images from {:?} into {:?} ({:?}, quality {})",
            plan.input_dir, plan.output_dir, plan.request.mode, plan.request.quality
        );

        std::fs::create_dir_all(&plan.output_dir)?;

        let catalog = Catalog::build(&plan.input_dir, plan.image_name.as_deref())?;
        info!("Found {} images to process", catalog.len());

        if catalog.is_empty() {
            return Ok(RunResult::empty(start_time.elapsed().as_secs_f64()));
        }

        let workers = pool_size(catalog.len(), self.hardware_threads, plan.threads);
        let distributor = WorkDistributor::new(catalog.len());
        let progress = ProgressState::new(catalog.len());
        let monitor = if self.show_progress && self.monitor.enabled {
            ProgressMonitor::new(catalog.len(), &self.monitor)
        } else {
            ProgressMonitor::hidden(catalog.len(), &self.monitor)
        };

        let context = WorkerContext {
            catalog: &catalog,
            request: &plan.request,
            output_dir: &plan.output_dir,
            distributor: &distributor,
            progress: &progress,
            codec: &self.codec,
        };
        let pool = WorkerPool::new(workers);

        thread::scope(|scope| -> Result<()> {
            let watcher = thread::Builder::new()
                .name("progress-monitor".to_string())
                .spawn_scoped(scope, || monitor.run(&progress))
                .map_err(|e| {
                    CompressError::parallel(format!("Failed to start progress monitor: {e}"))
                })?;

            let pooled = {
                let _closer = progress.close_on_drop();
                pool.run(&context)
            };

            if watcher.join().is_err() {
                warn!("Progress monitor terminated abnormally");
            }

            pooled
        })?;

        let result = RunResult {
            total_found: catalog.len(),
            processed: progress.completed(),
            failed: progress.failed(),
            workers,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        };

        info!(
            "Processed {}/{} images ({} failed) with {} workers in {:.3}s",
            result.processed, result.total_found, result.failed, result.workers, result.elapsed_seconds
        );

        Ok(result)
    }
}
