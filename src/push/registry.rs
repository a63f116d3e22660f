use crate::types::push::Subscription;

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug)]
pub enum RegisterError {
    MissingDriverId,
    MissingEndpoint,
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::MissingDriverId => f.write_str("driver id must not be empty"),
            RegisterError::MissingEndpoint => {
                f.write_str("subscription endpoint must not be empty")
            }
        }
    }
}

/// Recipient → subscription mapping shared by the HTTP intake, the
/// dispatcher, and the change routers. One admin slot, plus a driver
/// multimap keyed by endpoint so re-registration overwrites instead of
/// duplicating. A single lock serializes all mutations.
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    admin: Option<Subscription>,
    drivers: HashMap<String, HashMap<String, Subscription>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub admin: Option<Subscription>,
    pub drivers: HashMap<String, Vec<Subscription>>,
}

impl SubscriptionRegistry {
    pub fn register_admin(&self, subscription: Subscription) {
        let mut inner = self.inner.lock().expect("registry lock");
        inner.admin = Some(subscription);
    }

    pub fn admin(&self) -> Option<Subscription> {
        let inner = self.inner.lock().expect("registry lock");
        inner.admin.clone()
    }

    /// Clears the admin slot only if it still holds `endpoint`, so an expiry
    /// observed by an in-flight delivery never discards a replacement
    /// registered meanwhile.
    pub fn clear_admin_endpoint(&self, endpoint: &str) {
        let mut inner = self.inner.lock().expect("registry lock");
        if inner
            .admin
            .as_ref()
            .is_some_and(|subscription| subscription.endpoint == endpoint)
        {
            inner.admin = None;
        }
    }

    pub fn register_driver(
        &self,
        driver_id: &str,
        subscription: Subscription,
    ) -> Result<(), RegisterError> {
        if driver_id.trim().is_empty() {
            return Err(RegisterError::MissingDriverId);
        }
        if subscription.endpoint.trim().is_empty() {
            return Err(RegisterError::MissingEndpoint);
        }

        let mut inner = self.inner.lock().expect("registry lock");
        inner
            .drivers
            .entry(driver_id.to_string())
            .or_default()
            .insert(subscription.endpoint.clone(), subscription);
        Ok(())
    }

    pub fn driver_endpoints(&self, driver_id: &str) -> Vec<Subscription> {
        let inner = self.inner.lock().expect("registry lock");
        inner
            .drivers
            .get(driver_id)
            .map(|subscriptions| subscriptions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Batch removal after a fan-out. Unknown endpoints are ignored; a
    /// driver whose last endpoint is removed disappears from the mapping.
    pub fn remove_driver_endpoints(&self, driver_id: &str, endpoints: &[String]) {
        let mut inner = self.inner.lock().expect("registry lock");
        let Some(subscriptions) = inner.drivers.get_mut(driver_id) else {
            return;
        };
        for endpoint in endpoints {
            subscriptions.remove(endpoint);
        }
        if subscriptions.is_empty() {
            inner.drivers.remove(driver_id);
        }
    }

    pub fn driver_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("registry lock");
        inner.drivers.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.inner.lock().expect("registry lock");
        RegistrySnapshot {
            admin: inner.admin.clone(),
            drivers: inner
                .drivers
                .iter()
                .map(|(driver_id, subscriptions)| {
                    (
                        driver_id.clone(),
                        subscriptions.values().cloned().collect(),
                    )
                })
                .collect(),
        }
    }
}
