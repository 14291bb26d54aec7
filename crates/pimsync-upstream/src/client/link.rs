use reqwest::Url;

use crate::error::UpstreamError;

/// Parses a base URL, guaranteeing a trailing slash so relative endpoints
/// join underneath it instead of replacing its last segment.
pub(super) fn parse_base_url(raw: &str) -> Result<Url, UpstreamError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| UpstreamError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UpstreamError::InvalidBaseUrl {
            url: raw.to_owned(),
            reason: format!("unsupported scheme \"{}\"", url.scheme()),
        });
    }
    Ok(url)
}

pub(super) fn resolve(
    base: &Url,
    service: &str,
    endpoint: &str,
    query: &[(&str, String)],
) -> Result<Url, UpstreamError> {
    let malformed = |reason: String| UpstreamError::MalformedResponse {
        context: format!("{service} endpoint \"{endpoint}\""),
        reason,
    };

    let mut url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        let link = Url::parse(endpoint).map_err(|e| malformed(e.to_string()))?;
        // Credentials are attached to every request; never follow links off-origin.
        if link.origin() != base.origin() {
            return Err(malformed(format!(
                "link origin {} does not match {}",
                link.origin().ascii_serialization(),
                base.origin().ascii_serialization()
            )));
        }
        link
    } else {
        base.join(endpoint.trim_start_matches('/'))
            .map_err(|e| malformed(e.to_string()))?
    };

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}
