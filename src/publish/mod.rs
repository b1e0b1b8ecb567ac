//! Publishing: object-store uploads and live notifications.

mod error;
pub mod notifications;
mod publisher;
pub mod store;

pub use error::{PublishError, StoreError};
pub use notifications::{FeedEvent, NotificationBroadcaster};
pub use publisher::Publisher;
pub use store::{
    CONTENT_TYPE_JSON, CONTENT_TYPE_XML, HttpObjectStore, LocalDirStore, ObjectStore,
    PublishArtifact, StoreBackend,
};
