//! Domain entities - the core business objects.

mod comment;
mod post;
mod slug;
mod tag;
mod user;

pub use comment::Comment;
pub use post::{Post, PostStatus};
pub use slug::{is_valid_slug, slugify};
pub use tag::Tag;
pub use user::User;
