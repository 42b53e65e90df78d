use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::domain::repositories::view_cache::ViewCache;

#[derive(Debug, Clone)]
struct RenderedView {
    body: Value,
    rendered_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ViewSlot {
    generation: u64,
    view: Option<RenderedView>,
}

/// In-process store of rendered views. Entries live until their path is
/// revalidated; there is no time-based expiry.
#[derive(Debug, Default)]
pub struct RenderedViewCache {
    slots: DashMap<String, ViewSlot>,
}

impl RenderedViewCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewCache for RenderedViewCache {
    fn get(&self, path: &str) -> Option<Value> {
        self.slots
            .get(path)
            .and_then(|slot| slot.view.as_ref().map(|view| view.body.clone()))
    }

    fn generation(&self, path: &str) -> u64 {
        self.slots.get(path).map_or(0, |slot| slot.generation)
    }

    fn store_if_fresh(&self, path: &str, generation: u64, view: Value) -> bool {
        // The entry guard holds the shard lock, so a revalidation cannot land
        // between the comparison and the write.
        let mut slot = self.slots.entry(path.to_string()).or_default();
        if slot.generation != generation {
            debug!(
                path,
                rendered_for = generation,
                current = slot.generation,
                "view_cache: discarded view rendered before revalidation"
            );
            return false;
        }

        slot.view = Some(RenderedView {
            body: view,
            rendered_at: Utc::now(),
        });
        true
    }

    fn revalidate_path(&self, path: &str) {
        let mut slot = self.slots.entry(path.to_string()).or_default();
        slot.generation += 1;

        if let Some(stale) = slot.view.take() {
            debug!(
                path,
                rendered_at = %stale.rendered_at,
                "view_cache: dropped stale view"
            );
        }
    }
}
