use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

/// Lets only the last of a burst of calls through.
///
/// Every [`Debouncer::settle`] supersedes the calls before it. After sleeping for the
/// delay, a call reports whether nothing newer arrived in the meantime.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Waits out the delay. `true` if this was the latest call when the delay elapsed.
    pub async fn settle(&self) -> bool {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Makes every pending [`Debouncer::settle`] report `false`.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
