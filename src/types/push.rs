use serde::{Deserialize, Serialize};

/// Credential bundle for one push delivery destination. The endpoint URL is
/// the subscription's identity; registering the same endpoint again replaces
/// the previous record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

/// Notification content as the service worker receives it. Serialized once
/// per dispatch so every endpoint of a fan-out gets identical bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,
}

/// Identifier pair the client uses to route navigation when the
/// notification is clicked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub order_id: String,
    pub ride_id: String,
}
