use crate::adapters::WebPushSender;
use crate::config;

mod dispatcher;
mod registry;
pub(crate) mod vapid;

use std::sync::Arc;

pub use dispatcher::PushDispatcher;
pub use registry::{RegisterError, RegistrySnapshot, SubscriptionRegistry};
pub use vapid::{VapidCredentials, generate_vapid_credentials};
pub(crate) use vapid::{VapidConfigStatus, load_vapid_config};

/// Builds the production dispatcher when VAPID material is configured.
/// Returns `None` (push disabled) otherwise; registration intake still works
/// without it.
pub fn maybe_dispatcher(
    config: &config::AppConfig,
    registry: Arc<SubscriptionRegistry>,
) -> Option<PushDispatcher<WebPushSender>> {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            eprintln!("push notifications disabled: incomplete VAPID configuration");
            return None;
        }
        VapidConfigStatus::Missing => {
            return None;
        }
    };

    let sender = match WebPushSender::new(vapid) {
        Ok(sender) => sender,
        Err(err) => {
            eprintln!("push notifications disabled: failed to init web-push ({err})");
            return None;
        }
    };

    Some(PushDispatcher::new(registry, sender))
}
