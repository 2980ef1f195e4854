//! HTTP retry helpers for transient errors.
//!
//! Reference data fetches go through [`send_text`] so every request gets
//! exponential backoff on timeouts, connection resets, rate limiting and
//! server errors.

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s) the total wait before giving up
/// is 14 seconds.
const MAX_RETRIES: u32 = 3;

/// Sends an HTTP request and returns the response body as a `String`.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// Does **not** retry HTTP 4xx (except 429). A 404 maps to
/// [`SourceError::NotFound`].
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body cannot be read.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(build_request: F) -> Result<String, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, MAX_RETRIES).await?;
    Ok(response.text().await?)
}

/// Core retry loop. Returns the successful [`reqwest::Response`].
#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<SourceError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(SourceError::Http(e));
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                match classify(status) {
                    StatusClass::Retry if attempt < max_retries => {
                        log::warn!("  HTTP {status}");
                        last_error = Some(SourceError::Status {
                            message: format!("HTTP {status}"),
                        });
                    }
                    StatusClass::Retry => {
                        return Err(SourceError::Status {
                            message: format!("HTTP {status} after {max_retries} retries"),
                        });
                    }
                    StatusClass::NotFound => {
                        return Err(SourceError::NotFound {
                            url: response.url().to_string(),
                        });
                    }
                    StatusClass::Fail => {
                        return Err(SourceError::Status {
                            message: format!("HTTP {status} for {}", response.url()),
                        });
                    }
                    StatusClass::Ok => return Ok(response),
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| SourceError::Status {
        message: "request failed after all retries".to_string(),
    }))
}

/// What a response status means for the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Ok,
    Retry,
    NotFound,
    Fail,
}

fn classify(status: reqwest::StatusCode) -> StatusClass {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusClass::Retry
    } else if status == reqwest::StatusCode::NOT_FOUND {
        StatusClass::NotFound
    } else if status.is_client_error() {
        StatusClass::Fail
    } else {
        StatusClass::Ok
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn rate_limits_and_server_errors_are_retried() {
        assert_eq!(classify(StatusCode::TOO_MANY_REQUESTS), StatusClass::Retry);
        assert_eq!(classify(StatusCode::INTERNAL_SERVER_ERROR), StatusClass::Retry);
        assert_eq!(classify(StatusCode::BAD_GATEWAY), StatusClass::Retry);
        assert_eq!(classify(StatusCode::SERVICE_UNAVAILABLE), StatusClass::Retry);
    }

    #[test]
    fn client_errors_fail_without_retry() {
        assert_eq!(classify(StatusCode::NOT_FOUND), StatusClass::NotFound);
        assert_eq!(classify(StatusCode::FORBIDDEN), StatusClass::Fail);
        assert_eq!(classify(StatusCode::BAD_REQUEST), StatusClass::Fail);
    }

    #[test]
    fn success_and_redirect_statuses_are_returned() {
        assert_eq!(classify(StatusCode::OK), StatusClass::Ok);
        assert_eq!(classify(StatusCode::PARTIAL_CONTENT), StatusClass::Ok);
        assert_eq!(classify(StatusCode::NOT_MODIFIED), StatusClass::Ok);
    }
}
