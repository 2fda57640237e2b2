// ─── HTTP ───
// One reqwest client for every transfer. Bodies are requested uncompressed so
// the bytes written to disk are the bytes the upstream hash was computed over.
// No timeouts are set: a stalled transfer waits.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

use crate::core::error::{LauncherError, LauncherResult};

pub const USER_AGENT: &str = concat!("Pickaxe/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client() -> LauncherResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .map_err(|e| LauncherError::Other(format!("Failed to build HTTP client: {e}")))
}
