//! Query-side logic that does not depend on a storage engine: page
//! arithmetic, trigram similarity and the similar-post ranking.

mod pagination;
mod ranking;
pub mod trigram;

pub use pagination::{Page, PageRequest, Paginator};
pub use ranking::{
    SEARCH_SIMILARITY_THRESHOLD, SIMILAR_POSTS_LIMIT, rank_by_comments, rank_by_title,
    rank_similar,
};
