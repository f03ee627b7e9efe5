//! Shared JSON-over-HTTP plumbing for collaborator clients
//!
//! Every failure mode (connect error, timeout, non-2xx status, undecodable
//! body) maps to an [`UnavailableError`] naming the collaborator.

use crate::error::UnavailableError;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// User-Agent sent to collaborators
const USER_AGENT: &str = concat!("breedscan/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Build an HTTP client with an explicit request timeout
pub fn build_client(service: &'static str, timeout: Duration) -> Result<Client, UnavailableError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| UnavailableError::Network {
            service,
            message: format!("client construction failed: {}", e),
        })
}

/// Join a base URL and an endpoint path without doubling slashes
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// POST a JSON body and decode a JSON response
pub async fn post_json<Req, Resp>(
    client: &Client,
    service: &'static str,
    timeout: Duration,
    url: &str,
    body: &Req,
) -> Result<Resp, UnavailableError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| map_transport_error(service, timeout, e))?;

    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(UnavailableError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Resp>()
        .await
        .map_err(|e| map_transport_error(service, timeout, e))
}

fn map_transport_error(
    service: &'static str,
    timeout: Duration,
    err: reqwest::Error,
) -> UnavailableError {
    if err.is_timeout() {
        UnavailableError::Timeout {
            service,
            after: timeout,
        }
    } else if err.is_decode() {
        UnavailableError::InvalidResponse {
            service,
            message: err.to_string(),
        }
    } else {
        UnavailableError::Network {
            service,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(endpoint("http://h:1", "safety"), "http://h:1/safety");
        assert_eq!(endpoint("http://h:1/", "/safety"), "http://h:1/safety");
        assert_eq!(endpoint("http://h:1/api/", "breed"), "http://h:1/api/breed");
    }

    #[test]
    fn test_build_client() {
        assert!(build_client("classifier", Duration::from_secs(5)).is_ok());
    }
}
