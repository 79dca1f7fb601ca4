//! Firebase Cloud Messaging over the legacy HTTP multicast API.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{PushNotification, PushNotifier};
use crate::error::DispatchError;

/// Registration ids accepted per multicast request.
pub const MAX_TOKENS_PER_REQUEST: usize = 1000;

/// Default legacy multicast endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
    sound: &'static str,
}

fn no_data(data: &&BTreeMap<String, String>) -> bool {
    data.is_empty()
}

#[derive(Debug, Serialize)]
struct FcmMulticast<'a> {
    registration_ids: &'a [String],
    notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "no_data")]
    data: &'a BTreeMap<String, String>,
    priority: &'static str,
}

/// [`PushNotifier`] sending through FCM with a server key.
#[derive(Clone)]
pub struct FcmNotifier {
    client: Client,
    endpoint: String,
    server_key: String,
}

impl fmt::Debug for FcmNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FcmNotifier")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl FcmNotifier {
    /// Creates a notifier posting to `endpoint` with `server_key`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            server_key: server_key.into(),
        }
    }

    async fn send_chunk(
        &self,
        tokens: &[String],
        notification: &PushNotification,
    ) -> Result<(), DispatchError> {
        let message = FcmMulticast {
            registration_ids: tokens,
            notification: FcmNotification {
                title: &notification.title,
                body: &notification.body,
                sound: "default",
            },
            data: &notification.data,
            priority: "high",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&message)
            .send()
            .await
            .map_err(|e| DispatchError::UpstreamUnavailable(format!("push request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "push service rejected notification");
            return Err(DispatchError::UpstreamUnavailable(format!(
                "push service returned {status}"
            )));
        }
        tracing::debug!(%status, recipients = tokens.len(), "push notification sent");
        Ok(())
    }
}

#[async_trait]
impl PushNotifier for FcmNotifier {
    async fn notify(
        &self,
        tokens: &[String],
        notification: &PushNotification,
    ) -> Result<(), DispatchError> {
        let mut first_error = None;
        for chunk in tokens.chunks(MAX_TOKENS_PER_REQUEST) {
            if let Err(e) = self.send_chunk(chunk, notification).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multicast_body_uses_registration_ids() {
        let tokens = vec!["a".to_string(), "b".to_string()];
        let n = PushNotification::new("New ride", "Pickup nearby").with_data("type", "new_ride");
        let message = FcmMulticast {
            registration_ids: &tokens,
            notification: FcmNotification {
                title: &n.title,
                body: &n.body,
                sound: "default",
            },
            data: &n.data,
            priority: "high",
        };
        let json = serde_json::to_value(&message).unwrap_or_default();
        assert_eq!(json["registration_ids"][1], "b");
        assert_eq!(json["notification"]["title"], "New ride");
        assert_eq!(json["data"]["type"], "new_ride");
        assert_eq!(json["priority"], "high");
    }

    #[test]
    fn debug_hides_server_key() {
        let notifier = FcmNotifier::new(DEFAULT_ENDPOINT, "secret-key");
        assert!(!format!("{notifier:?}").contains("secret-key"));
    }
}
