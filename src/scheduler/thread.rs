//! Wall-clock scheduler backed by a worker thread.
//!
//! Tasks are sent to the worker through a crossbeam channel. The worker
//! sleeps on the channel until the earliest task falls due, so scheduling
//! never blocks the caller. A task that panics takes the worker down with
//! it; later tasks are then dropped with a warning.

use crate::error::{LightError, Result};
use crate::scheduler::{ScheduledHandle, Scheduler, Task};
use crate::sync::lock;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

enum WorkerMessage {
    Schedule {
        due: Instant,
        task: Task,
        handle: ScheduledHandle,
    },
    Shutdown,
}

/// Real-time scheduler.
pub struct ThreadScheduler {
    tx: Sender<WorkerMessage>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadScheduler {
    /// Spawn the worker thread.
    pub fn start() -> Result<Self> {
        let (tx, rx) = unbounded();
        let worker = std::thread::Builder::new()
            .name("lightflow-scheduler".to_string())
            .spawn(move || run_worker(rx))
            .map_err(|e| LightError::Io(e).with_context("Failed to spawn scheduler thread"))?;

        Ok(Self {
            tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Like [`Scheduler::schedule_after`], but reports a worker that is no
    /// longer running instead of handing back a cancelled handle.
    pub fn try_schedule_after(&self, delay: Duration, task: Task) -> Result<ScheduledHandle> {
        let handle = ScheduledHandle::new();
        let msg = WorkerMessage::Schedule {
            due: Instant::now() + delay,
            task,
            handle: handle.clone(),
        };
        self.tx
            .send(msg)
            .map_err(|_| LightError::Channel("scheduler worker is not running".to_string()))?;
        Ok(handle)
    }

    /// Stop the worker and wait for it. Pending tasks are dropped.
    pub fn shutdown(&self) {
        let _ = self.tx.send(WorkerMessage::Shutdown);
        if let Some(worker) = lock(&self.worker).take() {
            if worker.join().is_err() {
                tracing::error!("Scheduler worker terminated by a panicking task");
            }
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Scheduler for ThreadScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> ScheduledHandle {
        match self.try_schedule_after(delay, task) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Dropping task: {}", e);
                ScheduledHandle::cancelled()
            }
        }
    }
}

fn run_worker(rx: Receiver<WorkerMessage>) {
    tracing::debug!("Scheduler thread started");
    let mut queue: BTreeMap<(Instant, u64), (Task, ScheduledHandle)> = BTreeMap::new();
    let mut seq = 0u64;

    loop {
        let msg = match queue.keys().next().map(|(due, _)| *due) {
            Some(due) => {
                let timeout = due.saturating_duration_since(Instant::now());
                match rx.recv_timeout(timeout) {
                    Ok(msg) => Some(msg),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
        };

        match msg {
            Some(WorkerMessage::Schedule { due, task, handle }) => {
                queue.insert((due, seq), (task, handle));
                seq += 1;
            }
            Some(WorkerMessage::Shutdown) => break,
            None => {}
        }

        let now = Instant::now();
        while let Some(key) = queue.keys().next().copied().filter(|(due, _)| *due <= now) {
            if let Some((task, handle)) = queue.remove(&key) {
                if !handle.is_cancelled() {
                    task();
                }
            }
        }
    }

    tracing::debug!("Scheduler thread exiting, {} task(s) dropped", queue.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_runs_task_after_delay() {
        let scheduler = ThreadScheduler::start().unwrap();
        let (tx, rx) = bounded(1);
        let start = Instant::now();
        scheduler.schedule_after(
            Duration::from_millis(20),
            Box::new(move || {
                let _ = tx.send(Instant::now());
            }),
        );
        let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(fired.duration_since(start) >= Duration::from_millis(20));
    }

    #[test]
    fn test_cancelled_task_is_skipped() {
        let scheduler = ThreadScheduler::start().unwrap();
        let (tx, rx) = bounded(2);
        let tx2 = tx.clone();
        let handle = scheduler.schedule_after(
            Duration::from_millis(20),
            Box::new(move || {
                let _ = tx.send(1);
            }),
        );
        scheduler.schedule_after(
            Duration::from_millis(40),
            Box::new(move || {
                let _ = tx2.send(2);
            }),
        );
        handle.cancel();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 2);
    }

    #[test]
    fn test_schedule_after_shutdown_returns_cancelled_handle() {
        let scheduler = ThreadScheduler::start().unwrap();
        scheduler.shutdown();
        let handle = scheduler.schedule_after(Duration::ZERO, Box::new(|| {}));
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_try_schedule_after_shutdown_is_a_channel_error() {
        let scheduler = ThreadScheduler::start().unwrap();
        scheduler.shutdown();
        let err = scheduler.try_schedule_after(Duration::ZERO, Box::new(|| {})).unwrap_err();
        assert!(matches!(err, LightError::Channel(_)));
    }
}
