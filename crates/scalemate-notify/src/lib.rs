//! scalemate-notify — outbound webhook notifications.
//!
//! Best-effort and never on the reconcile path: delivery failures are
//! reported to the caller, who logs and moves on. The receiving
//! endpoint acknowledges with the literal body `ok`; anything else is
//! treated as a failed delivery.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Errors from a webhook delivery attempt.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("webhook acknowledged with {0:?} instead of \"ok\"")]
    BadAck(String),
}

#[derive(Serialize)]
struct Payload<'a> {
    text: &'a str,
}

/// Posts `{"text": ...}` messages to a configured webhook URL.
#[derive(Debug, Clone)]
pub struct Notifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Deliver one message.
    ///
    /// Succeeds only on an HTTP success status whose body is exactly
    /// `ok`. The status check guards against endpoints that return an
    /// error page with a 2xx-shaped body.
    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Payload { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }

        let body = response.text().await?;
        if body != "ok" {
            return Err(NotifyError::BadAck(body));
        }

        debug!(url = %self.webhook_url, "webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// One-shot HTTP server answering every request with `body`.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "{status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/hook")
    }

    #[tokio::test]
    async fn ok_body_is_success() {
        let url = serve_once("HTTP/1.1 200 OK", "ok");
        let notifier = Notifier::new(url);
        notifier.send("autoscaler created").await.unwrap();
    }

    #[tokio::test]
    async fn non_ok_body_is_failure() {
        let url = serve_once("HTTP/1.1 200 OK", "accepted");
        let notifier = Notifier::new(url);
        assert!(matches!(
            notifier.send("hello").await,
            Err(NotifyError::BadAck(body)) if body == "accepted"
        ));
    }

    #[tokio::test]
    async fn error_status_is_failure() {
        let url = serve_once("HTTP/1.1 500 Internal Server Error", "ok");
        let notifier = Notifier::new(url);
        assert!(matches!(
            notifier.send("hello").await,
            Err(NotifyError::Status(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_failure() {
        let notifier = Notifier::new("http://127.0.0.1:1/hook");
        assert!(matches!(
            notifier.send("hello").await,
            Err(NotifyError::Http(_))
        ));
    }
}
