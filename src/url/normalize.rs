use crate::UrlError;
use url::Url;

/// Normalizes a URL into its queue identity
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace and parse; reject if malformed
/// 2. Require an http or https scheme
/// 3. Drop the query string
/// 4. Drop the fragment
///
/// Host lowercasing and an empty path becoming `/` come from the parser.
/// Applying the function to its own output returns the same string.
///
/// # Examples
///
/// ```
/// use twinset_indexer::url::normalize_url;
///
/// let url = normalize_url("https://twinset.ru/catalog/?sort=price#top").unwrap();
/// assert_eq!(url, "https://twinset.ru/catalog/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    url.set_query(None);
    url.set_fragment(None);

    Ok(url.into())
}
