pub mod blob;
pub mod error;
pub mod mailer;
pub mod omdb;
pub mod store;
pub mod traits;

pub use blob::{poster_key, BlobError, BlobStore, LocalBlobStore};
pub use error::SourceError;
pub use mailer::{render_welcome, LogMailer, MailError, OutboxMailer, WelcomeMailer, WelcomeMessage};
pub use omdb::OmdbClient;
pub use store::{
    Collection, DocumentStore, DocumentWatch, FileStore, MemoryStore, StoreError, Write, WriteBatch,
};
pub use traits::{LookupOutcome, TitleLookup, TitleMetadata};
