/// Business logic layer for content-service
///
/// - Related posts: tiered related-content ranking for a published post
pub mod related;

pub use related::{RankedItem, RelatedPostsService, Tier};
