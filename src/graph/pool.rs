//! Worker Pool
//!
//! Fixed set of OS threads pulling boxed jobs from one `flume` channel.
//! A pool with zero workers runs every job inline on the calling thread,
//! which is what single-threaded targets use.

use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<flume::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `threads` workers. `0` yields an inline pool.
    #[must_use]
    pub fn new(threads: usize) -> Self {
        if threads == 0 {
            return Self::inline();
        }

        let (sender, receiver) = flume::unbounded::<Job>();
        let workers = (0..threads)
            .filter_map(|i| {
                let receiver = receiver.clone();
                std::thread::Builder::new()
                    .name(format!("render-worker-{i}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                        }
                    })
                    .map_err(|err| log::warn!("Failed to spawn render worker {i}: {err}"))
                    .ok()
            })
            .collect::<Vec<_>>();

        if workers.is_empty() {
            log::warn!("No render workers could be spawned; recording inline");
            return Self::inline();
        }

        log::info!("Render worker pool started with {} threads", workers.len());
        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// A pool that records on the calling thread.
    #[must_use]
    pub fn inline() -> Self {
        Self {
            sender: None,
            workers: Vec::new(),
        }
    }

    /// One worker per available core, minus the coordinating thread.
    #[must_use]
    pub fn with_available_parallelism() -> Self {
        let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self::new(cores.saturating_sub(1))
    }

    #[inline]
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Runs `job` on a worker, or immediately when the pool is inline.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        match &self.sender {
            Some(sender) => {
                if let Err(flume::SendError(job)) = sender.send(Box::new(job)) {
                    // Every worker has exited.
                    job();
                }
            }
            None => job(),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Render worker terminated by panic");
            }
        }
    }
}
