use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::error::BrowseError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of named worker threads fed from one FIFO queue.
///
/// With a single worker, jobs run strictly one at a time in submission order.
/// Shutdown does not drain: queued jobs are discarded and running ones are
/// left to finish on their own.
pub struct WorkerPool {
    name: String,
    size: usize,
    sender: Mutex<Option<Sender<Job>>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(name: &str, size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let shutdown = Arc::new(AtomicBool::new(false));

        for index in 0..size {
            let receiver = receiver.clone();
            let shutdown = Arc::clone(&shutdown);
            let spawned = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || run_worker(receiver, shutdown));
            if let Err(err) = spawned {
                tracing::error!(pool = name, index, "failed to spawn worker: {err}");
            }
        }
        tracing::debug!(pool = name, size, "worker pool started");

        Self {
            name: name.to_string(),
            size,
            sender: Mutex::new(Some(sender)),
            shutdown,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.try_submit(job) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("submission ignored: {err}");
                false
            }
        }
    }

    fn try_submit<F>(&self, job: F) -> Result<(), BrowseError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shut_down() {
            return Err(BrowseError::WorkerShutdown(self.name.clone()));
        }
        let guard = self.sender.lock().unwrap_or_else(|err| err.into_inner());
        let sender = guard
            .as_ref()
            .ok_or_else(|| BrowseError::WorkerShutdown(self.name.clone()))?;
        sender
            .send(Box::new(job))
            .map_err(|_| BrowseError::WorkerShutdown(self.name.clone()))
    }

    pub fn shutdown_now(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sender
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .take();
        tracing::debug!(pool = %self.name, "worker pool shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown_now();
    }
}

fn run_worker(receiver: Receiver<Job>, shutdown: Arc<AtomicBool>) {
    while let Ok(job) = receiver.recv() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        job();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Barrier, mpsc};
    use std::time::Duration;

    #[test]
    fn single_worker_keeps_submission_order() {
        let pool = WorkerPool::new("hierarchy", 1);
        let (tx, rx) = mpsc::channel();
        for i in 0..20 {
            let tx = tx.clone();
            assert!(pool.submit(move || {
                tx.send(i).unwrap();
            }));
        }
        let seen: Vec<_> = (0..20)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn submit_after_shutdown_is_a_noop() {
        let pool = WorkerPool::new("thumbnails", 2);
        pool.shutdown_now();
        assert!(pool.is_shut_down());
        assert!(!pool.submit(|| panic!("must not run")));
        pool.shutdown_now();
    }

    #[test]
    fn queued_jobs_are_dropped_on_shutdown() {
        let pool = WorkerPool::new("hierarchy", 1);
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (ran_tx, ran_rx) = mpsc::channel::<()>();

        pool.submit(move || {
            started_tx.send(()).unwrap();
            let _ = gate_rx.recv();
        });
        pool.submit(move || {
            let _ = ran_tx.send(());
        });
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        pool.shutdown_now();
        gate_tx.send(()).unwrap();

        assert!(ran_rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn idle_workers_do_not_block_each_other() {
        let pool = WorkerPool::new("thumbnails", 2);
        let barrier = Arc::new(Barrier::new(2));
        let (tx, rx) = mpsc::channel();
        for id in 0..2 {
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            pool.submit(move || {
                barrier.wait();
                tx.send(id).unwrap();
            });
        }
        let mut done: Vec<_> = (0..2)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        done.sort();
        assert_eq!(done, vec![0, 1]);
    }

    #[test]
    fn size_is_at_least_one() {
        let pool = WorkerPool::new("thumbnails", 0);
        assert_eq!(pool.size(), 1);
    }
}
