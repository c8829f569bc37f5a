//! Schema decoding and aggregation for BPSR captures.
//!
//! Sits on top of [`bpsr_proto`]'s wire layer and turns frames into the two
//! structured outputs the toolkit produces:
//!
//! - combat: [`CombatDecoder`] interprets Notify frames against the
//!   `blueprotobuf_package` schemas and [`CombatReducer`] folds the decoded
//!   stream into a [`CombatSummary`]
//! - trading: [`extract_listings`] scans FrameDown fragments schema-lessly
//!   for [`Listing`]s and [`consolidate`] deduplicates them, optionally
//!   enriched through an [`ItemResolver`] such as [`ItemCatalog`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod blueproto;
mod catalog;
mod combat;
mod consolidate;
mod error;
mod reduce;
mod trade;
mod wiretree;

pub use catalog::{ItemCatalog, ItemRecord};
pub use combat::{
    COMBAT_SERVICE_UID, CombatDecoder, DecodedRecord, METHOD_SYNC_CONTAINER_DATA,
    METHOD_SYNC_CONTAINER_DIRTY_DATA, METHOD_SYNC_NEAR_DELTA_INFO, METHOD_SYNC_NEAR_ENTITIES,
    METHOD_SYNC_SERVER_TIME, METHOD_SYNC_TO_ME_DELTA_INFO,
};
pub use consolidate::{ConsolidatedListing, ItemResolver, ListingMetadata, consolidate};
pub use error::{CatalogError, ReduceError};
pub use reduce::{Bucket, CombatReducer, CombatSummary};
pub use trade::{Listing, extract_listings};
pub use wiretree::{decode_message, read_varint};
