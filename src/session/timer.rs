use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

const TICK: Duration = Duration::from_secs(1);

/// 1 Hz duration counter
///
/// Counts whole seconds while running. Restarting begins a fresh
/// one-second period, so a partial second before a pause is not counted.
#[derive(Debug, Default)]
pub struct DurationTimer {
    seconds: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl DurationTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let seconds = Arc::clone(&self.seconds);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;
                seconds.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn reset(&mut self) {
        self.seconds.store(0, Ordering::SeqCst);
    }

    pub fn seconds(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for DurationTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
