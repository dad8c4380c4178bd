//! Derives the event stream endpoint from the REST API base address.
//!
//! The stream lives beside the REST API: same host, same base path, with the
//! scheme swapped for its WebSocket counterpart and `/ws/events` appended.
//!
//! ```text
//! http://farm.local:8080/api   ->  ws://farm.local:8080/api/ws/events
//! https://farm.example/api/    ->  wss://farm.example/api/ws/events
//! ```

use url::Url;

/// API base used when nothing is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Path suffix of the event stream, relative to the API base.
pub const EVENTS_PATH: &str = "ws/events";

/// Errors from deriving the stream endpoint.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The base address is not a valid absolute URL.
    #[error("invalid API base URL: {0}")]
    Invalid(#[from] url::ParseError),

    /// The base address uses a scheme with no WebSocket counterpart.
    #[error("unsupported API base URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Computes the event stream URL for `api_base`.
///
/// `http` becomes `ws` and `https` becomes `wss`; a base that is already
/// `ws`/`wss` keeps its scheme. Query and fragment are dropped.
///
/// # Errors
///
/// Returns [`EndpointError`] if `api_base` does not parse or its scheme is
/// not one of `http`, `https`, `ws`, `wss`.
pub fn event_stream_url(api_base: &str) -> Result<Url, EndpointError> {
    let mut url = Url::parse(api_base.trim())?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|()| EndpointError::UnsupportedScheme(url.scheme().to_string()))?;

    let path = format!("{}/{EVENTS_PATH}", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
