use ahash::AHashMap;
use parking_lot::Mutex;

use crate::errors::StoreError;

/// Backend operations that can be told to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    LoadGraph,
    SaveGraph,
    UpdateGraph,
    DeleteGraph,
    ListGraphs,
    Close,
}

struct FaultEntry {
    skip: usize,
    remaining: usize,
}

/// Per-backend schedule of injected failures.
///
/// A fault armed with `skip = n` lets the first `n` calls through and then
/// fails the following `failures` calls.
#[derive(Default)]
pub struct FaultPlan {
    entries: Mutex<AHashMap<FaultPoint, FaultEntry>>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.entries.lock().clear();
    }

    pub fn configure(&self, point: FaultPoint, failures: usize) {
        self.configure_after(point, 0, failures);
    }

    pub fn configure_after(&self, point: FaultPoint, skip: usize, failures: usize) {
        let mut guard = self.entries.lock();
        if failures == 0 {
            guard.remove(&point);
        } else {
            guard.insert(
                point,
                FaultEntry {
                    skip,
                    remaining: failures,
                },
            );
        }
    }

    pub(crate) fn check(&self, point: FaultPoint) -> Result<(), StoreError> {
        let mut guard = self.entries.lock();
        if let Some(entry) = guard.get_mut(&point) {
            if entry.skip > 0 {
                entry.skip -= 1;
                return Ok(());
            }
            entry.remaining -= 1;
            if entry.remaining == 0 {
                guard.remove(&point);
            }
            return Err(StoreError::backend(format!("fault injected: {point:?}")));
        }
        Ok(())
    }
}
