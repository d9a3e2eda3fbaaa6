//! Position extraction from a rendered result list.

use crate::error::AttemptError;
use adrank_browser::RenderPage;
use adrank_core::{AdId, Positions, Rank};
use std::collections::HashSet;

/// Selector matching one listing card.
pub const ITEM_SELECTOR: &str = "[data-item-id]";

/// Attribute carrying the listing's ad ID.
pub const ITEM_ID_ATTRIBUTE: &str = "data-item-id";

/// Rank `targets` within the first `scan_cap` item identifiers.
///
/// Items without a numeric identifier are skipped but still occupy their scan
/// position. The first match for a target wins. Targets not seen get
/// [`Rank::BeyondCap`].
pub fn rank_items<S: AsRef<str>>(
    item_ids: &[Option<S>],
    targets: &[AdId],
    scan_cap: usize,
) -> Positions {
    let wanted: HashSet<AdId> = targets.iter().copied().collect();
    let mut positions = Positions::new();

    for (index, raw) in item_ids.iter().take(scan_cap).enumerate() {
        let Some(id) = raw.as_ref().and_then(|s| s.as_ref().parse::<AdId>().ok()) else {
            continue;
        };
        if wanted.contains(&id) {
            let rank = u32::try_from(index + 1).unwrap_or(u32::MAX);
            positions.entry(id).or_insert(Rank::Position(rank));
        }
    }

    for target in targets {
        positions.entry(*target).or_insert(Rank::BeyondCap);
    }

    positions
}

/// Read listing identifiers from `page` and rank `targets` among them.
///
/// An empty listing is an error: the page rendered, but not a result list.
pub async fn extract(
    page: &dyn RenderPage,
    targets: &[AdId],
    scan_cap: usize,
) -> Result<Positions, AttemptError> {
    let items = page
        .query_all(ITEM_SELECTOR)
        .await
        .map_err(|e| AttemptError::ListingQuery(e.to_string()))?;

    if items.is_empty() {
        return Err(AttemptError::NoListings);
    }

    let mut item_ids = Vec::with_capacity(items.len().min(scan_cap));
    for item in items.iter().take(scan_cap) {
        item_ids.push(item.attribute(ITEM_ID_ATTRIBUTE).await.ok().flatten());
    }

    tracing::debug!(
        found = items.len(),
        scanned = item_ids.len(),
        "Extracted listing identifiers"
    );

    Ok(rank_items(&item_ids, targets, scan_cap))
}
