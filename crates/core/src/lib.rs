//! Content model and pure publish-side transformations.
//!
//! Everything in this crate is free of network I/O: normalizing untrusted
//! documents, extracting inline assets into standalone files, booking
//! schedule helpers, and the in-process publish event bus.

pub mod assets;
pub mod booking;
pub mod document;
pub mod events;

pub use assets::extract::{extract_assets, pending_asset_count, Extraction, PendingAsset};
pub use assets::inline::MediaType;
pub use assets::validate::ValidationError;
pub use assets::AssetPolicy;
pub use booking::{BookingRequest, BookingRequestError};
pub use document::id::BlockId;
pub use document::model::{
    Align, Background, BackgroundKind, Block, BlockContent, BlockKind, ContentDocument, Fill,
    Grid,
};
pub use document::normalize::normalize;
pub use events::bus::EventBus;
pub use events::types::{FailedEvent, PublishEvent, PublishedEvent};
