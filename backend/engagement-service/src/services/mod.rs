pub mod comments;
pub mod counters;
pub mod feed;
pub mod follows;
pub mod likes;
pub mod posts;
pub mod videos;

pub use comments::CommentService;
pub use feed::{FeedPage, FeedService};
pub use follows::FollowService;
pub use likes::LikeService;
pub use posts::PostService;
pub use videos::{VideoInput, VideoService};
