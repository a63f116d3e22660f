use crate::ports;
use crate::push::PushDispatcher;
use crate::types::feed::{Change, ChangeKind, Order, RegistrationRequest};
use crate::types::push::{NotificationData, NotificationPayload};

use std::sync::Arc;

const NOTIFICATION_ICON: &str = "./icon.png";

/// Routes "registration request created" changes to the admin slot.
///
/// The first batch a feed delivers after attaching enumerates pre-existing
/// documents; it is swallowed whole so restarts do not replay history.
pub struct RegistrationRequestRouter<S> {
    dispatcher: Arc<PushDispatcher<S>>,
    initial_snapshot: bool,
}

impl<S> RegistrationRequestRouter<S>
where
    S: ports::PushSender,
{
    pub fn new(dispatcher: Arc<PushDispatcher<S>>) -> Self {
        Self {
            dispatcher,
            initial_snapshot: true,
        }
    }

    pub async fn on_batch(&mut self, changes: &[Change<RegistrationRequest>]) {
        if self.initial_snapshot {
            self.initial_snapshot = false;
            return;
        }

        for change in changes {
            if change.kind != ChangeKind::Added {
                continue;
            }
            let payload = registration_payload(&change.doc);
            self.dispatcher.notify_admin(&payload).await;
        }
    }
}

/// Routes "order created" changes to the assigned driver. The order only
/// references its parent ride; the driver identity comes from the injected
/// lookup. Unresolvable orders are dropped with a log line.
pub struct OrderRouter<S, R> {
    dispatcher: Arc<PushDispatcher<S>>,
    rides: R,
    initial_snapshot: bool,
}

impl<S, R> OrderRouter<S, R>
where
    S: ports::PushSender,
    R: ports::RideLookup,
{
    pub fn new(dispatcher: Arc<PushDispatcher<S>>, rides: R) -> Self {
        Self {
            dispatcher,
            rides,
            initial_snapshot: true,
        }
    }

    pub async fn on_batch(&mut self, changes: &[Change<Order>]) {
        if self.initial_snapshot {
            self.initial_snapshot = false;
            return;
        }

        for change in changes {
            if change.kind != ChangeKind::Added {
                continue;
            }
            let order = &change.doc;
            let ride = match self.rides.ride(&order.ride_id).await {
                Ok(Some(ride)) => ride,
                Ok(None) => {
                    eprintln!(
                        "order dropped: ride '{}' not found (order {})",
                        order.ride_id, order.id
                    );
                    continue;
                }
                Err(err) => {
                    eprintln!(
                        "order dropped: ride lookup failed: {err} (order {})",
                        order.id
                    );
                    continue;
                }
            };
            let driver_id = match ride.driver_id {
                Some(driver_id) if !driver_id.trim().is_empty() => driver_id,
                _ => {
                    eprintln!(
                        "order dropped: ride '{}' has no assigned driver (order {})",
                        order.ride_id, order.id
                    );
                    continue;
                }
            };

            let payload = order_payload(order);
            self.dispatcher.notify_driver(&driver_id, &payload).await;
        }
    }
}

fn registration_payload(request: &RegistrationRequest) -> NotificationPayload {
    NotificationPayload {
        title: "New user registration request".to_string(),
        body: format!(
            "From: {}\nCode: {}",
            request.phone, request.verification_code
        ),
        icon: Some(NOTIFICATION_ICON.to_string()),
        badge: None,
        data: None,
    }
}

fn order_payload(order: &Order) -> NotificationPayload {
    NotificationPayload {
        title: "New order".to_string(),
        body: "A new order has been assigned to you".to_string(),
        icon: Some(NOTIFICATION_ICON.to_string()),
        badge: None,
        data: Some(NotificationData {
            order_id: order.id.clone(),
            ride_id: order.ride_id.clone(),
        }),
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::ports::SendError;
    use crate::push::SubscriptionRegistry;
    use crate::types::feed::Ride;
    use crate::types::push::Subscription;

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct TestSender {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl TestSender {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().expect("sent lock").clone()
        }
    }

    impl ports::PushSender for TestSender {
        type Fut<'a>
            = std::future::Ready<Result<(), SendError>>
        where
            Self: 'a;

        fn send<'a>(
            &'a self,
            subscription: &'a Subscription,
            message: &'a str,
            _ttl: Duration,
        ) -> Self::Fut<'a> {
            self.sent
                .lock()
                .expect("sent lock")
                .push((subscription.endpoint.clone(), message.to_string()));
            std::future::ready(Ok(()))
        }
    }

    #[derive(Debug)]
    struct TestLookupError;

    impl std::fmt::Display for TestLookupError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("test lookup error")
        }
    }

    #[derive(Clone, Default)]
    struct TestRides {
        rides: Arc<Mutex<HashMap<String, Ride>>>,
        fail: bool,
    }

    impl TestRides {
        fn with_ride(ride_id: &str, driver_id: Option<&str>) -> Self {
            let rides = TestRides::default();
            rides.rides.lock().expect("rides lock").insert(
                ride_id.to_string(),
                Ride {
                    driver_id: driver_id.map(str::to_string),
                },
            );
            rides
        }

        fn failing() -> Self {
            Self {
                rides: Arc::default(),
                fail: true,
            }
        }
    }

    impl ports::RideLookup for TestRides {
        type Error = TestLookupError;
        type Fut<'a>
            = std::future::Ready<Result<Option<Ride>, TestLookupError>>
        where
            Self: 'a;

        fn ride<'a>(&'a self, ride_id: &'a str) -> Self::Fut<'a> {
            let result = if self.fail {
                Err(TestLookupError)
            } else {
                Ok(self.rides.lock().expect("rides lock").get(ride_id).cloned())
            };
            std::future::ready(result)
        }
    }

    fn subscription(endpoint: &str) -> Subscription {
        Subscription {
            endpoint: endpoint.to_string(),
            p256dh: "p256".to_string(),
            auth: "auth".to_string(),
        }
    }

    fn dispatcher(
        registry: &Arc<SubscriptionRegistry>,
        sender: &TestSender,
    ) -> Arc<PushDispatcher<TestSender>> {
        Arc::new(PushDispatcher::new(Arc::clone(registry), sender.clone()))
    }

    fn added(doc: RegistrationRequest) -> Change<RegistrationRequest> {
        Change {
            kind: ChangeKind::Added,
            doc,
        }
    }

    fn request(phone: &str, code: &str) -> RegistrationRequest {
        RegistrationRequest {
            phone: phone.to_string(),
            verification_code: code.to_string(),
        }
    }

    fn order_added(id: &str, ride_id: &str) -> Change<Order> {
        Change {
            kind: ChangeKind::Added,
            doc: Order {
                id: id.to_string(),
                ride_id: ride_id.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn registration_router__should_suppress_entire_first_batch() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        registry.register_admin(subscription("https://push.example/admin"));
        let sender = TestSender::default();
        let mut router = RegistrationRequestRouter::new(dispatcher(&registry, &sender));

        // When
        router
            .on_batch(&[added(request("+998901112233", "1234"))])
            .await;

        // Then
        assert!(sender.sent().is_empty());

        // When the second batch arrives
        router
            .on_batch(&[added(request("+998901112233", "1234"))])
            .await;

        // Then
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn registration_router__should_notify_admin_with_phone_and_code() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        registry.register_admin(subscription("https://push.example/admin"));
        let sender = TestSender::default();
        let mut router = RegistrationRequestRouter::new(dispatcher(&registry, &sender));
        router.on_batch(&[]).await;

        // When
        router
            .on_batch(&[added(request("+998901112233", "4321"))])
            .await;

        // Then
        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://push.example/admin");
        let message: serde_json::Value =
            serde_json::from_str(&sent[0].1).expect("payload is json");
        assert_eq!(message["title"], "New user registration request");
        assert_eq!(message["body"], "From: +998901112233\nCode: 4321");
        assert_eq!(message["icon"], "./icon.png");
    }

    #[tokio::test]
    async fn registration_router__should_skip_non_added_changes() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        registry.register_admin(subscription("https://push.example/admin"));
        let sender = TestSender::default();
        let mut router = RegistrationRequestRouter::new(dispatcher(&registry, &sender));
        router.on_batch(&[]).await;

        // When
        router
            .on_batch(&[Change {
                kind: ChangeKind::Modified,
                doc: request("+998901112233", "1234"),
            }])
            .await;

        // Then
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn registration_router__should_not_error_without_admin() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        let sender = TestSender::default();
        let mut router = RegistrationRequestRouter::new(dispatcher(&registry, &sender));
        router.on_batch(&[]).await;

        // When
        router
            .on_batch(&[added(request("+998901112233", "1234"))])
            .await;

        // Then
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn order_router__should_fan_out_to_every_driver_endpoint() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        registry
            .register_driver("d1", subscription("https://push.example/ep-a"))
            .expect("register ep-a");
        registry
            .register_driver("d1", subscription("https://push.example/ep-b"))
            .expect("register ep-b");
        let sender = TestSender::default();
        let rides = TestRides::with_ride("ride-7", Some("d1"));
        let mut router = OrderRouter::new(dispatcher(&registry, &sender), rides);
        router.on_batch(&[]).await;

        // When
        router.on_batch(&[order_added("order-1", "ride-7")]).await;

        // Then
        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        let endpoints: HashSet<String> =
            sent.iter().map(|(endpoint, _)| endpoint.clone()).collect();
        assert!(endpoints.contains("https://push.example/ep-a"));
        assert!(endpoints.contains("https://push.example/ep-b"));
        let message: serde_json::Value =
            serde_json::from_str(&sent[0].1).expect("payload is json");
        assert_eq!(message["data"]["orderId"], "order-1");
        assert_eq!(message["data"]["rideId"], "ride-7");
    }

    #[tokio::test]
    async fn order_router__should_suppress_entire_first_batch() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        registry
            .register_driver("d1", subscription("https://push.example/ep-a"))
            .expect("register driver");
        let sender = TestSender::default();
        let rides = TestRides::with_ride("ride-7", Some("d1"));
        let mut router = OrderRouter::new(dispatcher(&registry, &sender), rides);

        // When
        router.on_batch(&[order_added("order-1", "ride-7")]).await;

        // Then
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn order_router__should_drop_order_when_ride_not_found() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        registry
            .register_driver("d1", subscription("https://push.example/ep-a"))
            .expect("register driver");
        let sender = TestSender::default();
        let rides = TestRides::default();
        let mut router = OrderRouter::new(dispatcher(&registry, &sender), rides);
        router.on_batch(&[]).await;

        // When
        router.on_batch(&[order_added("order-1", "ride-7")]).await;

        // Then
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn order_router__should_drop_order_when_ride_has_no_driver() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        registry
            .register_driver("d1", subscription("https://push.example/ep-a"))
            .expect("register driver");
        let sender = TestSender::default();
        let rides = TestRides::with_ride("ride-7", None);
        let mut router = OrderRouter::new(dispatcher(&registry, &sender), rides);
        router.on_batch(&[]).await;

        // When
        router.on_batch(&[order_added("order-1", "ride-7")]).await;

        // Then
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn order_router__should_drop_order_when_driver_id_blank() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        let sender = TestSender::default();
        let rides = TestRides::with_ride("ride-7", Some("  "));
        let mut router = OrderRouter::new(dispatcher(&registry, &sender), rides);
        router.on_batch(&[]).await;

        // When
        router.on_batch(&[order_added("order-1", "ride-7")]).await;

        // Then
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn order_router__should_drop_order_when_lookup_fails() {
        // Given
        let registry = Arc::new(SubscriptionRegistry::default());
        registry
            .register_driver("d1", subscription("https://push.example/ep-a"))
            .expect("register driver");
        let sender = TestSender::default();
        let mut router = OrderRouter::new(dispatcher(&registry, &sender), TestRides::failing());
        router.on_batch(&[]).await;

        // When
        router.on_batch(&[order_added("order-1", "ride-7")]).await;

        // Then
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn registration_payload__should_serialize_without_null_fields() {
        // Given
        let payload = registration_payload(&request("+998901112233", "1234"));

        // When
        let value = serde_json::to_value(&payload).expect("payload serializes");

        // Then
        assert!(value.get("data").is_none());
        assert!(value.get("badge").is_none());
        assert_eq!(value["icon"], "./icon.png");
    }
}
