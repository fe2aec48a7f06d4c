//! HTTP notification dispatch
//!
//! Delivers each mapped path to the configured endpoint with a single
//! bounded POST. One attempt per event: the cooldown filter already
//! absorbs duplicate triggers, and a failed delivery is surfaced in the
//! record history rather than silently retried.

use std::time::Duration;

use serde_json::json;
use url::Url;

use adbwatch_core::prelude::*;
use adbwatch_core::NotificationOutcome;

/// Sends playback notifications over HTTP.
///
/// Holds one shared `reqwest::Client`; the per-request timeout comes from
/// configuration at call time so changes apply to the next event.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `mapped_path` to `endpoint`, bounded by `timeout`.
    ///
    /// `None` (or empty) endpoint short-circuits to
    /// [`NotificationOutcome::Disabled`] without any network call. All
    /// network and HTTP failures map to `Failed(reason)` with a short
    /// machine-readable cause; nothing here is fatal to the session.
    pub async fn notify(
        &self,
        mapped_path: &str,
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> NotificationOutcome {
        let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) else {
            debug!("No notification endpoint configured");
            return NotificationOutcome::Disabled;
        };

        if Url::parse(endpoint).is_err() {
            warn!("Invalid notification endpoint: {}", endpoint);
            return NotificationOutcome::failed("invalid_endpoint");
        }

        debug!("Sending notification to {}: {}", endpoint, mapped_path);
        let result = self
            .client
            .post(endpoint)
            .json(&json!({ "file_path": mapped_path }))
            .timeout(timeout)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    info!("Notification delivered for {}", mapped_path);
                    NotificationOutcome::Success
                } else if status.is_client_error() {
                    warn!("Notification rejected: HTTP {}", status);
                    NotificationOutcome::failed("http_4xx")
                } else if status.is_server_error() {
                    warn!("Notification failed: HTTP {}", status);
                    NotificationOutcome::failed("http_5xx")
                } else {
                    warn!("Notification got unexpected status: HTTP {}", status);
                    NotificationOutcome::failed("http_error")
                }
            }
            Err(e) if e.is_timeout() => {
                warn!("Notification to {} timed out after {:?}", endpoint, timeout);
                NotificationOutcome::failed("timeout")
            }
            Err(e) if e.is_connect() => {
                warn!("Could not connect to {}: {}", endpoint, e);
                NotificationOutcome::failed("connection_refused")
            }
            Err(e) => {
                warn!("Notification to {} failed: {}", endpoint, e);
                NotificationOutcome::failed("connection_error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_empty_endpoint_is_disabled() {
        let notifier = Notifier::new();

        let outcome = notifier.notify("/a.mkv", None, TIMEOUT).await;
        assert_eq!(outcome, NotificationOutcome::Disabled);

        let outcome = notifier.notify("/a.mkv", Some("   "), TIMEOUT).await;
        assert_eq!(outcome, NotificationOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let notifier = Notifier::new();
        let outcome = notifier.notify("/a.mkv", Some("not a url"), TIMEOUT).await;
        assert_eq!(outcome, NotificationOutcome::failed("invalid_endpoint"));
    }

    #[tokio::test]
    async fn test_success_posts_json_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/play")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(
                serde_json::json!({"file_path": "smb://nas/media/e01.mkv"}),
            ))
            .with_status(200)
            .create_async()
            .await;

        let notifier = Notifier::new();
        let endpoint = format!("{}/play", server.url());
        let outcome = notifier
            .notify("smb://nas/media/e01.mkv", Some(&endpoint), TIMEOUT)
            .await;

        assert_eq!(outcome, NotificationOutcome::Success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_maps_to_http_4xx() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/play")
            .with_status(404)
            .create_async()
            .await;

        let notifier = Notifier::new();
        let endpoint = format!("{}/play", server.url());
        let outcome = notifier.notify("/a.mkv", Some(&endpoint), TIMEOUT).await;

        assert_eq!(outcome, NotificationOutcome::failed("http_4xx"));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_http_5xx() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/play")
            .with_status(503)
            .create_async()
            .await;

        let notifier = Notifier::new();
        let endpoint = format!("{}/play", server.url());
        let outcome = notifier.notify("/a.mkv", Some(&endpoint), TIMEOUT).await;

        assert_eq!(outcome, NotificationOutcome::failed("http_5xx"));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        // Bind a listener to grab a free port, then drop it so nothing is
        // listening when the notifier connects.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let notifier = Notifier::new();
        let endpoint = format!("http://127.0.0.1:{}/play", port);
        let outcome = notifier.notify("/a.mkv", Some(&endpoint), TIMEOUT).await;

        assert_eq!(outcome, NotificationOutcome::failed("connection_refused"));
    }

    #[tokio::test]
    async fn test_unresponsive_endpoint_times_out() {
        // Accept the TCP connection but never answer the HTTP request.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _conn = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let notifier = Notifier::new();
        let endpoint = format!("http://127.0.0.1:{}/play", port);
        let outcome = notifier
            .notify("/a.mkv", Some(&endpoint), Duration::from_millis(200))
            .await;

        assert_eq!(outcome, NotificationOutcome::failed("timeout"));
    }
}
