use crate::ports::{self, SendError};
use crate::push::registry::SubscriptionRegistry;
use crate::types::push::NotificationPayload;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

// TTL the push service holds an undelivered message for; matches the
// web-push default of four weeks.
const MESSAGE_TTL: Duration = Duration::from_secs(2_419_200);

// Local bound on one delivery attempt so a hung push service cannot stall
// the dispatch call. A timed-out attempt counts as transient.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolves recipients against the registry, fans deliveries out, and feeds
/// expired endpoints back for removal. Delivery failures never propagate to
/// the caller.
pub struct PushDispatcher<S> {
    registry: Arc<SubscriptionRegistry>,
    sender: S,
}

impl<S> PushDispatcher<S>
where
    S: ports::PushSender,
{
    pub fn new(registry: Arc<SubscriptionRegistry>, sender: S) -> Self {
        Self { registry, sender }
    }

    pub async fn notify_admin(&self, payload: &NotificationPayload) {
        let Some(subscription) = self.registry.admin() else {
            eprintln!("push delivery warning: no admin subscription registered");
            return;
        };
        let Some(message) = serialize_payload(payload) else {
            return;
        };

        let attempt = tokio::time::timeout(
            ATTEMPT_TIMEOUT,
            self.sender.send(&subscription, &message, MESSAGE_TTL),
        );
        match attempt.await {
            Ok(Ok(())) => {}
            Ok(Err(SendError::EndpointExpired)) => {
                eprintln!(
                    "push endpoint expired: {} (admin)",
                    subscription.endpoint
                );
                self.registry.clear_admin_endpoint(&subscription.endpoint);
            }
            Ok(Err(err)) => {
                eprintln!(
                    "push delivery error: {err} (admin, endpoint {})",
                    subscription.endpoint
                );
            }
            Err(_) => {
                eprintln!(
                    "push delivery error: attempt timed out (admin, endpoint {})",
                    subscription.endpoint
                );
            }
        }
    }

    /// Delivers `payload` to every endpoint registered for `driver_id`,
    /// concurrently. Returns once every attempt has a terminal outcome;
    /// expired endpoints are then removed in one batch.
    pub async fn notify_driver(&self, driver_id: &str, payload: &NotificationPayload) {
        let subscriptions = self.registry.driver_endpoints(driver_id);
        if subscriptions.is_empty() {
            eprintln!("push delivery warning: no subscriptions for driver '{driver_id}'");
            return;
        }
        let Some(message) = serialize_payload(payload) else {
            return;
        };

        let mut attempts = JoinSet::new();
        for subscription in subscriptions {
            let sender = self.sender.clone();
            let message = message.clone();
            attempts.spawn(async move {
                let attempt = tokio::time::timeout(
                    ATTEMPT_TIMEOUT,
                    sender.send(&subscription, &message, MESSAGE_TTL),
                );
                let outcome = match attempt.await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(SendError::Transient(
                        "delivery attempt timed out".to_string(),
                    )),
                };
                (subscription.endpoint, outcome)
            });
        }

        let mut expired = Vec::new();
        while let Some(joined) = attempts.join_next().await {
            let (endpoint, outcome) = match joined {
                Ok(attempt) => attempt,
                Err(err) => {
                    eprintln!("push delivery error: attempt task failed ({err})");
                    continue;
                }
            };
            match outcome {
                Ok(()) => {}
                Err(SendError::EndpointExpired) => {
                    eprintln!("push endpoint expired: {endpoint} (driver {driver_id})");
                    expired.push(endpoint);
                }
                Err(err) => {
                    eprintln!(
                        "push delivery error: {err} (driver {driver_id}, endpoint {endpoint})"
                    );
                }
            }
        }

        if !expired.is_empty() {
            self.registry.remove_driver_endpoints(driver_id, &expired);
        }
    }
}

fn serialize_payload(payload: &NotificationPayload) -> Option<String> {
    match serde_json::to_string(payload) {
        Ok(message) => Some(message),
        Err(err) => {
            eprintln!("push delivery error: failed to serialize payload ({err})");
            None
        }
    }
}
