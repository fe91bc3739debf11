//! Item factory seam.
//!
//! The spawner decides when and how many items exist; creating and
//! destroying the items themselves belongs to whatever hosts the spawner
//! (a scene, a simulation, a test). [`RecordingFactory`] is the built-in
//! implementation: it hands out sequential handles and reports each spawn
//! on the event stream.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{trace, warn};

use crate::observability::{Event, EventEmitter};

use super::area::{ItemHandle, SpawnRequest};

/// Creates and destroys the items the spawner tracks.
pub trait ItemFactory: Send {
    /// Creates one item and returns its handle.
    fn spawn_item(&mut self, request: &SpawnRequest) -> ItemHandle;

    /// Destroys the item behind `handle`.
    fn destroy_item(&mut self, handle: ItemHandle);
}

/// Factory that records items instead of rendering them.
#[derive(Debug)]
pub struct RecordingFactory {
    emitter: Arc<EventEmitter>,
    next_id: u64,
    live: HashSet<ItemHandle>,
    spawned: u64,
    destroyed: u64,
}

impl RecordingFactory {
    #[must_use]
    pub fn new(emitter: Arc<EventEmitter>) -> Self {
        Self {
            emitter,
            next_id: 1,
            live: HashSet::new(),
            spawned: 0,
            destroyed: 0,
        }
    }

    /// Number of items created and not yet destroyed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_live(&self, handle: ItemHandle) -> bool {
        self.live.contains(&handle)
    }

    /// Items created over the factory's lifetime.
    #[must_use]
    pub const fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Items destroyed over the factory's lifetime.
    #[must_use]
    pub const fn destroyed(&self) -> u64 {
        self.destroyed
    }
}

impl ItemFactory for RecordingFactory {
    fn spawn_item(&mut self, request: &SpawnRequest) -> ItemHandle {
        let handle = ItemHandle(self.next_id);
        self.next_id += 1;
        self.live.insert(handle);
        self.spawned += 1;

        trace!(item = %handle, kind = %request.kind, x = request.position.x, y = request.position.y, "item spawned");
        self.emitter.emit(Event::ItemSpawned {
            timestamp: Utc::now(),
            item: handle.to_string(),
            kind: request.kind.clone(),
            x: request.position.x,
            y: request.position.y,
        });
        handle
    }

    fn destroy_item(&mut self, handle: ItemHandle) {
        if self.live.remove(&handle) {
            self.destroyed += 1;
            trace!(item = %handle, "item destroyed");
        } else {
            warn!(item = %handle, "destroy requested for an item that is not live");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::events::tests::TestWriter;
    use crate::spawn::area::Position;

    fn request() -> SpawnRequest {
        SpawnRequest {
            position: Position { x: 1.0, y: -2.0 },
            kind: "cube".into(),
        }
    }

    #[test]
    fn handles_are_sequential_and_tracked() {
        let mut factory = RecordingFactory::new(Arc::new(EventEmitter::noop()));
        let a = factory.spawn_item(&request());
        let b = factory.spawn_item(&request());
        assert_eq!(a, ItemHandle(1));
        assert_eq!(b, ItemHandle(2));
        assert_eq!(factory.live_count(), 2);

        factory.destroy_item(a);
        assert!(!factory.is_live(a));
        assert!(factory.is_live(b));
        assert_eq!(factory.spawned(), 2);
        assert_eq!(factory.destroyed(), 1);
    }

    #[test]
    fn double_destroy_is_counted_once() {
        let mut factory = RecordingFactory::new(Arc::new(EventEmitter::noop()));
        let a = factory.spawn_item(&request());
        factory.destroy_item(a);
        factory.destroy_item(a);
        assert_eq!(factory.destroyed(), 1);
    }

    #[test]
    fn spawn_emits_event() {
        let tw = TestWriter::new();
        let emitter = Arc::new(EventEmitter::new(Box::new(tw.clone())));
        let mut factory = RecordingFactory::new(emitter);
        factory.spawn_item(&request());

        let events = tw.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "ItemSpawned");
        assert_eq!(events[0]["item"], "item-1");
        assert_eq!(events[0]["kind"], "cube");
    }
}
