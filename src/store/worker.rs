use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
};
use std::thread::JoinHandle;

use crossbeam::channel::{
    Receiver,
    Sender,
};
use log::{
    debug,
    warn,
};

use super::registry::Registry;
use crate::error::{
    Result,
    StoreError,
};

/// A registry shared between the editing thread and background loads. Every
/// access, mutating or not, goes through the mutex.
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Result of one background dataset load.
#[derive(Debug)]
pub struct LoadReport {
    pub dataset: String,
    /// Number of regions displayed on success.
    pub result:  Result<usize>,
}

/// Background thread selecting datasets on a [`SharedRegistry`].
///
/// At most one load is in flight: [`LoadWorker::request`] refuses new work
/// until the pending report has been produced.
pub struct LoadWorker {
    sender:       Option<Sender<String>>,
    reports:      Receiver<LoadReport>,
    in_flight:    Arc<AtomicBool>,
    _join_handle: Option<JoinHandle<()>>,
}

fn run_load(
    registry: &SharedRegistry,
    dataset: &str,
) -> Result<usize> {
    let mut guard = registry
        .lock()
        .map_err(|_| StoreError::conflict("registry lock poisoned"))?;
    guard.select_dataset(dataset)
}

impl LoadWorker {
    pub fn spawn(registry: SharedRegistry) -> Self {
        let (sender, jobs) = crossbeam::channel::unbounded::<String>();
        let (report_sender, reports) = crossbeam::channel::unbounded();
        let in_flight = Arc::new(AtomicBool::new(false));
        let local_in_flight = in_flight.clone();

        let join_handle = std::thread::spawn(move || {
            for dataset in jobs.iter() {
                debug!("Loading dataset {dataset} in background");
                let result = run_load(&registry, &dataset);
                local_in_flight.store(false, Ordering::Release);
                if report_sender.send(LoadReport { dataset, result }).is_err() {
                    break;
                }
            }
        });

        Self {
            sender: Some(sender),
            reports,
            in_flight,
            _join_handle: Some(join_handle),
        }
    }

    /// Queues a load of `dataset`. Returns `false` without queuing when a
    /// load is already in flight.
    pub fn request(
        &self,
        dataset: &str,
    ) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Load of {dataset} refused: another load is in flight");
            return false;
        }
        let queued = self
            .sender
            .as_ref()
            .is_some_and(|s| s.send(dataset.to_owned()).is_ok());
        if !queued {
            warn!("Load worker is gone, {dataset} not loaded");
            self.in_flight.store(false, Ordering::Release);
        }
        queued
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Blocks until the pending load reports.
    pub fn wait(&self) -> Option<LoadReport> {
        self.reports.recv().ok()
    }

    /// Report of a finished load, if any.
    pub fn try_report(&self) -> Option<LoadReport> {
        self.reports.try_recv().ok()
    }
}

impl Drop for LoadWorker {
    fn drop(&mut self) {
        self.sender.take();
        while self.reports.try_recv().is_ok() {}
        if let Some(handle) = self._join_handle.take() {
            if handle.join().is_err() {
                warn!("Load worker panicked");
            }
        }
    }
}
