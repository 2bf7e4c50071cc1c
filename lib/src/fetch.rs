//! Retrieval of RDF documents named by an `http(s)` URL.

use crate::consts::{FETCH_ACCEPT, FETCH_TIMEOUT};
use crate::errors::{DriverError, Result};
use crate::util::format_from_path;
use log::debug;
use oxigraph::io::RdfFormat;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::path::Path;
use url::Url;

/// A response being read, with the serialization the server reported for it.
#[derive(Debug)]
pub struct FetchedDocument {
    pub body: Response,
    pub format: Option<RdfFormat>,
    pub url: String,
}

/// Maps a `Content-Type` value to a serialization. Parameters are ignored and generic types
/// such as `text/plain` give `None`.
pub fn detect_format(content_type: &str) -> Option<RdfFormat> {
    const GENERIC: [&str; 2] = ["text/plain", "application/octet-stream"];
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if GENERIC.iter().any(|g| media_type.eq_ignore_ascii_case(g)) {
        return None;
    }
    RdfFormat::from_media_type(media_type)
}

/// Serialization implied by the extension of the URL's last path segment.
pub fn format_from_url(url: &Url) -> RdfFormat {
    format_from_path(Path::new(url.path()))
}

/// Starts downloading `url`. The body is streamed, not buffered.
pub fn fetch_document(url: &Url) -> Result<FetchedDocument> {
    let failed = |e: reqwest::Error| DriverError::repository(format!("failed to fetch {url}"), e);
    let client = Client::builder().timeout(FETCH_TIMEOUT).build().map_err(failed)?;
    let response = client
        .get(url.as_str())
        .header(ACCEPT, FETCH_ACCEPT)
        .send()
        .and_then(Response::error_for_status)
        .map_err(failed)?;
    let format = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(detect_format);
    debug!("fetched {url} (format: {format:?})");
    Ok(FetchedDocument {
        url: response.url().to_string(),
        format,
        body: response,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(
            detect_format("text/turtle; charset=utf-8"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(
            detect_format("application/n-quads"),
            Some(RdfFormat::NQuads)
        );
        assert_eq!(detect_format("text/plain"), None);
    }

    #[test]
    fn url_extension_picks_the_format() {
        let url = Url::parse("http://example.org/data/people.nt?version=2").unwrap();
        assert_eq!(format_from_url(&url), RdfFormat::NTriples);
        let url = Url::parse("http://example.org/data/").unwrap();
        assert_eq!(format_from_url(&url), RdfFormat::Turtle);
    }
}
