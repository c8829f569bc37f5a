//! Listing deduplication and enrichment.
//!
//! Captures repeat the same market page many times; consolidation keeps the
//! first occurrence of each `(item, price, quantity)` triple in observation
//! order. Item names come from an injected resolver so that callers without
//! a catalog (or tests) simply get id-only output.

use std::collections::HashSet;

use serde_json::Value;

use crate::catalog::ItemRecord;
use crate::trade::Listing;

/// Read-only item metadata lookup injected into consolidation.
pub trait ItemResolver {
    /// Item metadata for `item_id`, when known.
    fn resolve(&self, item_id: u64) -> Option<ItemRecord>;
}

/// One consolidated market entry.
///
/// `item_name` and `metadata.item_icon` are only present when a resolver
/// was supplied and knew the item.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConsolidatedListing {
    /// Asking price in luno.
    pub price_luno: u64,
    /// Listed quantity.
    pub quantity: u64,
    /// Item configuration id, when the listing carried one.
    pub item_id: Option<u64>,
    /// Resolved display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    /// Provenance and audit data.
    pub metadata: ListingMetadata,
}

/// Provenance retained from the first-seen listing of a triple.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ListingMetadata {
    /// Byte offset of the carrier frame in the capture.
    pub frame_offset: u64,
    /// Server sequence of the carrier frame.
    pub server_sequence: u32,
    /// The undigested entry subtree.
    pub raw_entry: Value,
    /// Resolved icon path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_icon: Option<String>,
}

/// Deduplicate listings on `(item_id, price, quantity)`, first wins.
///
/// Output order is the order in which each triple was first observed.
#[must_use]
pub fn consolidate(
    listings: &[Listing],
    resolver: Option<&dyn ItemResolver>,
) -> Vec<ConsolidatedListing> {
    let mut seen: HashSet<(Option<u64>, u64, u64)> = HashSet::new();
    let mut out = Vec::new();

    for listing in listings {
        let key = (listing.item_config_id, listing.price_luno, listing.quantity);
        if !seen.insert(key) {
            continue;
        }

        let resolved = match (resolver, listing.item_config_id) {
            (Some(resolver), Some(item_id)) => resolver.resolve(item_id),
            _ => None,
        };

        out.push(ConsolidatedListing {
            price_luno: listing.price_luno,
            quantity: listing.quantity,
            item_id: listing.item_config_id,
            item_name: resolved.as_ref().map(|record| record.name.clone()),
            metadata: ListingMetadata {
                frame_offset: listing.frame_offset,
                server_sequence: listing.server_sequence,
                raw_entry: listing.raw_entry.clone(),
                item_icon: resolved
                    .and_then(|record| record.icon)
                    .filter(|icon| !icon.is_empty()),
            },
        });
    }
    out
}
