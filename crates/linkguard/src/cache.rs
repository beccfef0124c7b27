//! Short-lived verdict cache with in-flight request coalescing.

use linkguard_core::{CompositeVerdict, NormalizedUrl};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::debug;

/// Shared slot that concurrent requests for one URL wait on
pub type InFlight = Arc<OnceCell<Arc<CompositeVerdict>>>;

#[derive(Debug)]
enum Slot {
    Ready {
        verdict: Arc<CompositeVerdict>,
        expires_at: Instant,
    },
    Pending(InFlight),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Assess,
    Deep,
}

/// Outcome of [`ResultCache::begin`]
#[derive(Debug)]
pub enum Entry<'a> {
    /// A fresh verdict is cached
    Hit(Arc<CompositeVerdict>),
    /// Compute (or wait for) the verdict through this registration
    Compute(Pending<'a>),
}

/// A caller's hold on an in-flight computation.
///
/// Dropping it before the cell is filled unregisters the computation once no
/// other caller is waiting on it, so a cancelled request leaves nothing behind.
#[derive(Debug)]
pub struct Pending<'a> {
    cache: &'a ResultCache,
    key: NormalizedUrl,
    cell: InFlight,
    stage: Stage,
}

impl Pending<'_> {
    /// The cell every caller for this key waits on
    #[must_use]
    pub fn cell(&self) -> &OnceCell<Arc<CompositeVerdict>> {
        &self.cell
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        let finished = self.cell.initialized();
        // `put` already replaced a finished assessment's slot.
        if finished && self.stage == Stage::Assess {
            return;
        }
        self.cache.release(self, finished);
    }
}

/// Process-wide cache keyed by normalized URL.
///
/// Every key is registered under one mutex, so concurrent requests for the
/// same URL share a single [`OnceCell`] and only one fan-out runs. Deep
/// analysis of an already cached verdict is registered the same way.
#[derive(Debug)]
pub struct ResultCache {
    slots: Mutex<HashMap<NormalizedUrl, Slot>>,
    deepening: Mutex<HashMap<NormalizedUrl, InFlight>>,
    capacity: usize,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` verdicts
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            deepening: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// A fresh cached verdict, if any
    #[must_use]
    pub fn get(&self, key: &NormalizedUrl) -> Option<Arc<CompositeVerdict>> {
        match self.lock().get(key) {
            Some(Slot::Ready {
                verdict,
                expires_at,
            }) if *expires_at > Instant::now() => Some(Arc::clone(verdict)),
            _ => None,
        }
    }

    /// Look `key` up and register an in-flight computation on a miss.
    ///
    /// With `force` a cached verdict is ignored; a computation already in
    /// flight is still joined.
    pub fn begin(&self, key: &NormalizedUrl, force: bool) -> Entry<'_> {
        let now = Instant::now();
        let mut slots = self.lock();

        let cell = match slots.get(key) {
            Some(Slot::Ready {
                verdict,
                expires_at,
            }) if !force && *expires_at > now => return Entry::Hit(Arc::clone(verdict)),
            Some(Slot::Pending(cell)) => {
                debug!(url = %key, "joining in-flight assessment");
                Arc::clone(cell)
            }
            _ => {
                let cell: InFlight = Arc::new(OnceCell::new());
                slots.insert(key.clone(), Slot::Pending(Arc::clone(&cell)));
                cell
            }
        };

        Entry::Compute(Pending {
            cache: self,
            key: key.clone(),
            cell,
            stage: Stage::Assess,
        })
    }

    /// Register (or join) deep analysis of the verdict cached for `key`.
    ///
    /// The registration lasts until the run finishes; the deepened verdict
    /// itself is stored with [`ResultCache::put`].
    pub fn begin_deep(&self, key: &NormalizedUrl) -> Pending<'_> {
        let mut deepening = lock(&self.deepening);
        let cell = match deepening.get(key) {
            Some(cell) => {
                debug!(url = %key, "joining in-flight deep analysis");
                Arc::clone(cell)
            }
            None => {
                let cell: InFlight = Arc::new(OnceCell::new());
                deepening.insert(key.clone(), Arc::clone(&cell));
                cell
            }
        };

        Pending {
            cache: self,
            key: key.clone(),
            cell,
            stage: Stage::Deep,
        }
    }

    /// Store a finished verdict, replacing any pending slot for the key
    pub fn put(&self, key: NormalizedUrl, verdict: Arc<CompositeVerdict>, ttl: Duration) {
        let now = Instant::now();
        let mut slots = self.lock();
        slots.insert(
            key,
            Slot::Ready {
                verdict,
                expires_at: now + ttl,
            },
        );
        if slots.len() > self.capacity {
            evict(&mut slots, self.capacity, now);
        }
    }

    /// Drop a key, cached or pending
    pub fn invalidate(&self, key: &NormalizedUrl) {
        self.lock().remove(key);
    }

    /// Number of slots (cached and pending)
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is cached or pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of deep analyses in flight
    #[must_use]
    pub fn deepening(&self) -> usize {
        lock(&self.deepening).len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NormalizedUrl, Slot>> {
        lock(&self.slots)
    }

    /// Unregister `pending` if it is still the registered cell and either
    /// finished or abandoned by its last waiter
    fn release(&self, pending: &Pending<'_>, finished: bool) {
        // The map and `pending` itself hold the only references.
        let abandoned =
            |cell: &InFlight| Arc::ptr_eq(cell, &pending.cell) && Arc::strong_count(cell) == 2;

        match pending.stage {
            Stage::Assess => {
                let mut slots = self.lock();
                if matches!(slots.get(&pending.key), Some(Slot::Pending(cell)) if abandoned(cell)) {
                    debug!(url = %pending.key, "abandoned assessment unregistered");
                    slots.remove(&pending.key);
                }
            }
            Stage::Deep => {
                let mut deepening = lock(&self.deepening);
                let current = deepening.get(&pending.key).is_some_and(|cell| {
                    abandoned(cell) || (finished && Arc::ptr_eq(cell, &pending.cell))
                });
                if current {
                    deepening.remove(&pending.key);
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Purge expired verdicts, then the ones closest to expiry.
///
/// Pending slots are never evicted.
fn evict(slots: &mut HashMap<NormalizedUrl, Slot>, capacity: usize, now: Instant) {
    slots.retain(|_, slot| match slot {
        Slot::Ready { expires_at, .. } => *expires_at > now,
        Slot::Pending(_) => true,
    });

    if slots.len() <= capacity {
        return;
    }

    let mut ready: Vec<(Instant, NormalizedUrl)> = slots
        .iter()
        .filter_map(|(key, slot)| match slot {
            Slot::Ready { expires_at, .. } => Some((*expires_at, key.clone())),
            Slot::Pending(_) => None,
        })
        .collect();
    ready.sort_by(|a, b| a.0.cmp(&b.0));

    let excess = slots.len() - capacity;
    for (_, key) in ready.into_iter().take(excess) {
        slots.remove(&key);
    }
    debug!(evicted = excess, "result cache over capacity");
}
