//! Off-thread image loading into display slots.
//!
//! [`ImageWorker::execute`] shows a placeholder right away and hands the
//! heavy lifting (cache lookup, decode, transform) to a worker pool. Finished
//! work comes back over a channel and is bound to its slot by
//! [`ImageWorker::poll`] on the interactive thread, unless the slot has been
//! given another request or dropped in the meantime.

pub mod cache;
pub mod placeholders;
pub mod transform;

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::rc::{Rc, Weak};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::debug;

pub use cache::{CacheStats, ImageCache, Picture};
pub use placeholders::Placeholders;
pub use transform::TransformSpec;

use crate::tasks::{CancelToken, SlotId, SlotRegistry, TaskHandle, TaskId};

/// A display target images are bound to.
pub trait ImageSlot {
    fn slot_id(&self) -> SlotId;

    /// Show a default image while loading, or when there is nothing to load.
    fn show_placeholder(&self, picture: Picture);

    /// Show the finished image.
    fn show_image(&self, picture: Picture);
}

enum Outcome {
    Ready(Picture),
    Cancelled,
    Failed,
}

struct Finished {
    slot: SlotId,
    task: TaskId,
    key: String,
    outcome: Outcome,
}

pub struct ImageWorker {
    cache: ImageCache,
    placeholders: Placeholders,
    pool: rayon::ThreadPool,
    registry: SlotRegistry,
    slots: HashMap<SlotId, Weak<dyn ImageSlot>>,
    sender: mpsc::Sender<Finished>,
    receiver: mpsc::Receiver<Finished>,
    in_flight: usize,
}

impl ImageWorker {
    pub fn new(cache: ImageCache, placeholders: Placeholders, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("wordiary-image-{i}"))
            .build()?;
        let (sender, receiver) = mpsc::channel();
        Ok(Self {
            cache,
            placeholders,
            pool,
            registry: SlotRegistry::new(),
            slots: HashMap::new(),
            sender,
            receiver,
            in_flight: 0,
        })
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Load `path` into `slot`, shaped by `spec`.
    ///
    /// Any request still pending for the slot is cancelled. Re-requesting the
    /// path the slot is already bound to (pending or shown) restarts the work
    /// without flashing the placeholder. Without a path the slot just gets its
    /// placeholder and is forgotten.
    pub fn execute<S>(&mut self, slot: &Rc<S>, path: Option<&str>, spec: &TransformSpec)
    where
        S: ImageSlot + 'static,
    {
        self.prune();
        let slot_id = slot.slot_id();

        if let Some(previous) = self.registry.cancel(slot_id) {
            debug!(slot = slot_id.0, task = previous.id.0, "Cancelled previous image");
            if let Some(path) = path.filter(|p| *p == previous.path()) {
                self.spawn(slot, path, spec);
                return;
            }
        }

        slot.show_placeholder(self.placeholders.get(spec.fallback_index()));

        match path {
            Some(path) => self.spawn(slot, path, spec),
            None => {
                self.slots.remove(&slot_id);
            }
        }
    }

    fn spawn<S>(&mut self, target: &Rc<S>, path: &str, spec: &TransformSpec)
    where
        S: ImageSlot + 'static,
    {
        let slot = target.slot_id();
        let weak: Weak<dyn ImageSlot> = Rc::downgrade(target) as Weak<dyn ImageSlot>;
        self.slots.insert(slot, weak);

        let handle = TaskHandle::new(path);
        let task = handle.id;
        let token = handle.token();
        self.registry.bind(slot, handle);

        let cache = self.cache.clone();
        let sender = self.sender.clone();
        let path = path.to_string();
        let spec = spec.clone();
        self.in_flight += 1;

        self.pool.spawn(move || {
            let outcome = render(&cache, &path, &spec, &token);
            let _ = sender.send(Finished {
                slot,
                task,
                key: spec.cache_key(&path),
                outcome,
            });
        });
    }

    /// Bind whatever has finished so far. Returns how many slots got an image.
    pub fn poll(&mut self) -> usize {
        let mut bound = 0;
        while let Ok(finished) = self.receiver.try_recv() {
            if self.deliver(finished) {
                bound += 1;
            }
        }
        self.prune();
        bound
    }

    /// Block until every spawned request has come back, or `timeout` passes.
    /// Returns how many slots got an image.
    pub fn wait(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut bound = 0;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(finished) => {
                    if self.deliver(finished) {
                        bound += 1;
                    }
                }
                Err(_) => break,
            }
        }
        self.prune();
        bound
    }

    /// Requests spawned but not yet delivered.
    pub fn pending(&self) -> usize {
        self.in_flight
    }

    fn deliver(&mut self, finished: Finished) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        let live = self.registry.finish(finished.slot, finished.task);

        let picture = match finished.outcome {
            Outcome::Ready(picture) => picture,
            Outcome::Cancelled | Outcome::Failed => return false,
        };
        if !live {
            debug!(key = %finished.key, "Discarding superseded image");
            return false;
        }

        let Some(slot) = self.slots.get(&finished.slot).and_then(Weak::upgrade) else {
            self.forget(finished.slot);
            debug!(key = %finished.key, "Slot is gone, discarding image");
            return false;
        };

        self.cache.insert(finished.key, picture.clone());
        slot.show_image(picture);
        true
    }

    fn forget(&mut self, slot: SlotId) {
        self.slots.remove(&slot);
        self.registry.cancel(slot);
    }

    /// Drop bookkeeping for slots that no longer exist.
    fn prune(&mut self) {
        let registry = &mut self.registry;
        self.slots.retain(|slot, weak| {
            let alive = weak.strong_count() > 0;
            if !alive {
                registry.cancel(*slot);
            }
            alive
        });
    }
}

impl Drop for ImageWorker {
    fn drop(&mut self) {
        self.registry.cancel_all();
    }
}

/// Runs on the pool. A decode failure cancels the task so the placeholder stays.
fn render(cache: &ImageCache, path: &str, spec: &TransformSpec, token: &CancelToken) -> Outcome {
    if token.is_cancelled() {
        return Outcome::Cancelled;
    }

    let key = spec.cache_key(path);
    if let Some(picture) = cache.get(&key) {
        debug!(%key, "Image cache hit");
        return Outcome::Ready(picture);
    }

    debug!(%key, "Image cache miss, decoding");
    cache.record_decode();
    match transform::process(Path::new(path), spec) {
        Ok(_) if token.is_cancelled() => Outcome::Cancelled,
        Ok(img) => Outcome::Ready(Picture::new(img)),
        Err(e) => {
            debug!(path, error = %e, "Image decode failed");
            token.cancel();
            Outcome::Failed
        }
    }
}
