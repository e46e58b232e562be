pub mod accounts;
pub mod consistency;
pub mod directory;
pub mod enrichment;
pub mod error;
pub mod groups;
pub mod personal;
pub mod session;
pub mod shared;
pub mod upload;
pub mod view;

#[cfg(test)]
mod testing;

pub use accounts::{AccountService, SignUp};
pub use consistency::{sweep, Finding, SweepReport};
pub use directory::{DebouncedSearch, GroupDirectory, SearchDebouncer};
pub use error::{ErrorKind, QueueError};
pub use groups::{GroupPage, GroupRegistry, UNKNOWN_GROUP_NAME};
pub use personal::{PersonalQueueManager, PersonalQueueSubscription};
pub use session::Session;
pub use shared::{SharedQueueSubscription, SharedQueueSynchronizer, SubscriptionPhase};
pub use upload::PosterUpload;
pub use view::{services_in, visible_queue};
