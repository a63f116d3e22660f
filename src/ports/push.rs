use std::time::Duration;

use crate::types::push::Subscription;

/// Delivery failure as the dispatcher needs to see it: expired endpoints are
/// pruned from the registry, anything else is logged and retained.
#[derive(Debug)]
pub enum SendError {
    /// The push service reports the endpoint is permanently gone.
    EndpointExpired,
    Transient(String),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::EndpointExpired => f.write_str("push endpoint no longer exists"),
            SendError::Transient(message) => f.write_str(message),
        }
    }
}

pub trait PushSender: Clone + Send + Sync + 'static {
    type Fut<'a>: Future<Output = Result<(), SendError>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(
        &'a self,
        subscription: &'a Subscription,
        message: &'a str,
        ttl: Duration,
    ) -> Self::Fut<'a>;
}
