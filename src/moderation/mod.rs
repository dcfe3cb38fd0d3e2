//! Moderation core
//!
//! Turns an entity lifecycle event into a [`PendingModeration`]:
//! profile layering, attribute filtering, per-event extraction, context
//! resolution, modifiers and record building. Persistence lives in
//! [`crate::drivers`], orchestration in [`crate::moderator`].

pub mod builder;
pub mod events;
pub mod extractor;
pub mod filter;
pub mod matcher;
pub mod moderatable;
pub mod models;
pub mod modifiers;
pub mod profile;
pub mod resolvers;
pub mod transition;

pub use builder::ModerationRecordBuilder;
pub use events::{EventDispatcher, Moderated, Moderating, ModerationListener, Verdict};
pub use extractor::EventAttributeExtractor;
pub use filter::AttributeFilter;
pub use matcher::EventMatcher;
pub use moderatable::{Moderatable, ModerationOptions, ModerationState};
pub use models::{
    EntityRef, Moderation, ModerationField, ModerationStatus, NewModeration, NewModerationField,
    PendingModeration, Principal,
};
pub use modifiers::{
    AttributeEncoder, AttributeModifier, AttributeRedactor, Base64Encoder, HashRedactor,
    LeftRedactor, ModifierRegistry, RightRedactor,
};
pub use profile::ModerationProfile;
pub use resolvers::{
    GuardUserResolver, IpAddressResolver, RequestIpAddressResolver, RequestUrlResolver,
    RequestUserAgentResolver, ResolvedContext, ResolverRegistry, Resolvers, UrlResolver,
    UserAgentResolver, UserResolver,
};
