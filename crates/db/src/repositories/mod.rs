//! Database repositories.

mod comment;
mod like;
mod post;

pub use comment::CommentRepository;
pub use like::LikeRepository;
pub use post::PostRepository;
