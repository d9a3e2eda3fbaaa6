use crate::error::{Result, ScanError};
use adrank_core::City;
use url::Url;

/// Build `{base}/{city slug}?q={query}`.
///
/// The query is form-encoded, so spaces become `+`.
pub fn build_search_url(base: &str, city: &City, query: &str) -> Result<String> {
    let mut url = Url::parse(base).map_err(|e| ScanError::InvalidUrl(format!("{base}: {e}")))?;

    url.path_segments_mut()
        .map_err(|()| ScanError::InvalidUrl(format!("{base}: cannot carry a path")))?
        .pop_if_empty()
        .push(&city.slug);

    url.query_pairs_mut().clear().append_pair("q", query);

    Ok(url.into())
}
