//! Push delivery collaborator.
//!
//! Dispatch and status changes reach drivers and riders whose app is in the
//! background through a [`PushNotifier`]. Delivery is best effort: callers
//! log failures and move on.

pub mod fcm;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

pub use self::fcm::FcmNotifier;
use crate::error::DispatchError;

/// A notification with a visible part and a string data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Key-value payload delivered to the app.
    pub data: BTreeMap<String, String>,
}

impl PushNotification {
    /// Creates a notification with an empty data payload.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    /// Adds one data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.data.insert(key.into(), value.to_string());
        self
    }
}

/// Sends one notification to a set of device tokens.
#[async_trait]
pub trait PushNotifier: Send + Sync + fmt::Debug {
    /// Delivers `notification` to every token in `tokens`.
    ///
    /// An empty token list is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if the push service
    /// rejects the request or cannot be reached.
    async fn notify(
        &self,
        tokens: &[String],
        notification: &PushNotification,
    ) -> Result<(), DispatchError>;
}

/// Notifier used when no push credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl PushNotifier for DisabledNotifier {
    async fn notify(
        &self,
        tokens: &[String],
        notification: &PushNotification,
    ) -> Result<(), DispatchError> {
        if !tokens.is_empty() {
            tracing::warn!(
                recipients = tokens.len(),
                title = %notification.title,
                "push credentials not configured, skipping notification"
            );
        }
        Ok(())
    }
}
