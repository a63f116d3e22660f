use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::ports;
use crate::ports::SendError;
use crate::types::push::{Subscription, VapidConfig};

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }
}

impl ports::PushSender for WebPushSender {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(
        &'a self,
        subscription: &'a Subscription,
        message: &'a str,
        ttl: Duration,
    ) -> Self::Fut<'a> {
        Box::pin(async move {
            let subscription_info = web_push::SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.p256dh.clone(),
                subscription.auth.clone(),
            );
            let mut builder =
                web_push::WebPushMessageBuilder::new(&subscription_info).map_err(classify)?;
            builder.set_payload(web_push::ContentEncoding::Aes128Gcm, message.as_bytes());
            builder.set_ttl(ttl.as_secs() as u32);
            let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
                &self.vapid.private_key,
                web_push::URL_SAFE_NO_PAD,
                &subscription_info,
            )
            .map_err(classify)?;
            signature_builder.add_claim("sub", self.vapid.subject.as_str());
            builder.set_vapid_signature(signature_builder.build().map_err(classify)?);
            self.client
                .send(builder.build().map_err(classify)?)
                .await
                .map_err(classify)?;
            Ok(())
        })
    }
}

// 404/410 from the push service mean the subscription is permanently gone
// and must be pruned; everything else leaves it registered.
fn classify(err: web_push::WebPushError) -> SendError {
    match err {
        web_push::WebPushError::EndpointNotValid | web_push::WebPushError::EndpointNotFound => {
            SendError::EndpointExpired
        }
        other => SendError::Transient(other.to_string()),
    }
}
