use crate::models::{DateWindow, SearchRequest, SortOrder, SITE_TIMESTAMP_FORMAT};
use crate::scrapers::types::{FilterCriteria, SiteConfig};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::{debug, info};

/// Query parameter carrying the encoded search settings
const SETTINGS_PARAM: &str = "searchSettings";

/// Wire shape of the site's search settings. Field order is the JSON key order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchSettings<'a> {
    search_term: &'a str,
    locations: &'a [String],
    conditions: &'a [String],
    sort: SortOrder,
    newer_than: String,
    older_than: String,
    ended: bool,
}

impl<'a> From<&'a SearchRequest> for SearchSettings<'a> {
    fn from(request: &'a SearchRequest) -> Self {
        Self {
            search_term: &request.term,
            locations: &request.locations,
            conditions: &request.conditions,
            sort: request.sort,
            newer_than: request.newer_than.format(SITE_TIMESTAMP_FORMAT).to_string(),
            older_than: request.older_than.format(SITE_TIMESTAMP_FORMAT).to_string(),
            ended: !request.active_only,
        }
    }
}

/// Build the search URL for one term, the way the site's own search page does
pub fn build_search_url(
    term: &str,
    window: &DateWindow,
    criteria: &FilterCriteria,
    site: &SiteConfig,
) -> serde_json::Result<String> {
    let request = SearchRequest::new(term, window, &criteria.locations, &criteria.conditions);
    let url = encode_request(&request, site)?;
    info!("Built search URL for '{}'", term);
    Ok(url)
}

/// Compact JSON, base64-encoded, as a single query parameter on the search path
pub fn encode_request(request: &SearchRequest, site: &SiteConfig) -> serde_json::Result<String> {
    let json = serde_json::to_string(&SearchSettings::from(request))?;
    debug!("Search settings: {}", json);

    Ok(format!(
        "{}{}?{}={}",
        site.origin(),
        site.search_path,
        SETTINGS_PARAM,
        STANDARD.encode(json.as_bytes())
    ))
}
