pub mod ids;
pub mod queue_item;
pub mod user;
pub mod group;
pub mod service;
pub mod view;

pub use ids::{GroupId, ItemId, UserId};
pub use queue_item::QueueItem;
pub use user::User;
pub use group::{Group, GroupCursor, GroupSummary};
pub use service::DEFAULT_STREAMING_SERVICES;
pub use view::{QueueView, ServiceFilter, SortOption};
