use mockall::automock;
use serde_json::Value;

/// Rendered views keyed by request path.
///
/// Every path carries a generation that [`ViewCache::revalidate_path`] bumps.
/// A renderer reads the generation before loading its data and hands it back
/// to [`ViewCache::store_if_fresh`], so a rendering that raced a revalidation
/// is dropped instead of cached.
#[automock]
pub trait ViewCache {
    fn get(&self, path: &str) -> Option<Value>;
    fn generation(&self, path: &str) -> u64;
    /// Returns `false` when the path was revalidated after `generation` was read.
    fn store_if_fresh(&self, path: &str, generation: u64, view: Value) -> bool;
    /// Marks the view stale so the next request renders it again.
    fn revalidate_path(&self, path: &str);
}
