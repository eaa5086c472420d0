use std::sync::{Arc, Condvar, Mutex};

/// Counter of in-flight async steps.
///
/// Increments hand out a [`WaitGuard`]; the count goes down when the guard is
/// dropped, so a step thread that unwinds still releases its slot.
#[derive(Debug, Default)]
pub struct WaitGroup {
    count: Mutex<usize>,
    zero: Condvar,
}

impl WaitGroup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register one in-flight step.
    pub fn add(self: &Arc<Self>) -> WaitGuard {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
        WaitGuard {
            group: Arc::clone(self),
        }
    }

    /// Block until the count is zero. Returns immediately if nothing is
    /// in flight.
    pub fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count > 0 {
            count = self.zero.wait(count).unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn pending(&self) -> usize {
        *self.count.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn done(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.zero.notify_all();
        }
    }
}

/// One registered slot in a [`WaitGroup`].
#[derive(Debug)]
#[must_use = "dropping the guard immediately releases the slot"]
pub struct WaitGuard {
    group: Arc<WaitGroup>,
}

impl WaitGuard {
    /// Release the slot now.
    pub fn done(self) {
        drop(self);
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.group.done();
    }
}
