/// Content caching layer
///
/// Redis cache of ranked related-post id lists. Entries are short-lived and
/// written only after a successful ranking; any cache failure degrades to a
/// database read.
pub mod related_cache;

pub use related_cache::{CachedRelated, RelatedCache, RelatedResultCache};
