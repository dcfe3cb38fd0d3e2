//! Moderation trail
//!
//! Intercepts entity lifecycle events (create/update/delete/restore) and
//! records a pending moderation: field-level before/after values plus the
//! actor, IP address, user agent and URL of the change. Decided moderations
//! can be applied back onto the entity with a transition.
//!
//! ```ignore
//! let moderator = Moderator::builder(config).database(pool)?.build()?;
//! let observer = ModeratableObserver::new(Arc::new(moderator));
//! observer.updated(&mut post).await?;
//! ```

pub mod config;
pub mod context;
pub mod db;
pub mod drivers;
pub mod error;
pub mod model;
pub mod moderation;
pub mod moderator;
pub mod observer;

pub use config::{ModerationConfig, Settings};
pub use drivers::{DatabaseDriver, DriverRegistry, MemoryDriver, ModerationDriver};
pub use error::{ModerationError, ModerationResult};
pub use model::{Attributes, DynamicModel, Model};
pub use moderation::{
    Moderatable, Moderation, ModerationField, ModerationOptions, ModerationStatus,
};
pub use moderator::{Moderator, ModeratorBuilder};
pub use observer::{LifecycleEvent, LifecycleScope, ModeratableObserver};
