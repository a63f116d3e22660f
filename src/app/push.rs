use crate::adapters::WebPushSender;
use crate::ports::push::PushSender;
use crate::push as push_service;
use crate::state;
use crate::types::push::Subscription;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

const TEST_MESSAGE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

// Browser-native PushSubscription JSON, keys nested.
#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeRequest {
    pub(crate) endpoint: String,
    pub(crate) keys: SubscriptionKeys,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionKeys {
    pub(crate) p256dh: String,
    pub(crate) auth: String,
}

impl SubscribeRequest {
    fn is_complete(&self) -> bool {
        !self.endpoint.trim().is_empty()
            && !self.keys.p256dh.trim().is_empty()
            && !self.keys.auth.trim().is_empty()
    }

    fn into_subscription(self) -> Subscription {
        Subscription {
            endpoint: self.endpoint,
            p256dh: self.keys.p256dh,
            auth: self.keys.auth,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct SubscribeResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn subscribe_admin(
    State(state): State<state::AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), (StatusCode, Json<ErrorResponse>)> {
    if !request.is_complete() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "endpoint, p256dh, and auth are required.",
            }),
        ));
    }

    state.registry.register_admin(request.into_subscription());
    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            status: "registered",
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriverSubscribeRequest {
    pub(crate) driver_id: String,
    pub(crate) subscription: SubscribeRequest,
}

pub(crate) async fn subscribe_driver(
    State(state): State<state::AppState>,
    Json(request): Json<DriverSubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), (StatusCode, Json<ErrorResponse>)> {
    if !request.subscription.is_complete() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "endpoint, p256dh, and auth are required.",
            }),
        ));
    }

    let subscription = request.subscription.into_subscription();
    state
        .registry
        .register_driver(&request.driver_id, subscription)
        .map_err(|err| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: match err {
                        push_service::RegisterError::MissingDriverId => "driverId is required.",
                        push_service::RegisterError::MissingEndpoint => {
                            "subscription endpoint is required."
                        }
                    },
                }),
            )
        })?;

    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            status: "registered",
        }),
    ))
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, (StatusCode, Json<ErrorResponse>)> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => vapid,
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "Push notifications are not configured.",
                }),
            ));
        }
    };

    Ok(Json(PublicKeyResponse {
        public_key: vapid.public_key,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestPushRequest {
    pub(crate) endpoint: String,
    pub(crate) p256dh: String,
    pub(crate) auth: String,
    pub(crate) message: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct TestPushResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn push_test(
    State(state): State<state::AppState>,
    Json(request): Json<TestPushRequest>,
) -> Result<Json<TestPushResponse>, (StatusCode, Json<ErrorResponse>)> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => vapid,
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "Push notifications are not configured.",
                }),
            ));
        }
    };

    if request.endpoint.trim().is_empty()
        || request.p256dh.trim().is_empty()
        || request.auth.trim().is_empty()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "endpoint, p256dh, and auth are required.",
            }),
        ));
    }

    let message = request
        .message
        .as_deref()
        .unwrap_or("Test notification from Ridepush")
        .trim();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "message must not be empty.",
            }),
        ));
    }

    let sender = WebPushSender::new(vapid).map_err(|err| {
        eprintln!("push test error: failed to init web-push ({err})");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to initialize push sender.",
            }),
        )
    })?;

    let subscription = Subscription {
        endpoint: request.endpoint,
        p256dh: request.p256dh,
        auth: request.auth,
    };

    if let Err(err) = sender.send(&subscription, message, TEST_MESSAGE_TTL).await {
        eprintln!("push test error: {err}");
        return Err((
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: "Failed to send test notification.",
            }),
        ));
    }

    Ok(Json(TestPushResponse { status: "sent" }))
}

pub(crate) async fn registry_debug(
    State(state): State<state::AppState>,
) -> Json<push_service::RegistrySnapshot> {
    Json(state.registry.snapshot())
}
