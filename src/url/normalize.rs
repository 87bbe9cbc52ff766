use crate::UrlError;
use url::Url;

/// Normalizes a URL into the crawl's deduplication key
///
/// # Normalization Steps
///
/// 1. Parse the URL, resolving it against `base` when one is given
/// 2. Require an HTTP(S) scheme and a host
/// 3. Remove the fragment (everything after #)
/// 4. Remove the trailing slash from the path (except for root /)
///
/// Host lowercasing, default-port removal and dot-segment resolution come from
/// URL parsing itself. The query string is kept verbatim: parameter order and
/// presence are significant.
///
/// # Arguments
///
/// * `raw` - The URL string to normalize
/// * `base` - Base URL used to resolve relative references
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse, resolve or validate the URL
///
/// # Examples
///
/// ```
/// use ripple_links::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/docs/#intro", None).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs");
/// ```
pub fn normalize_url(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let raw = raw.trim();

    let mut url = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    }
    .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}
