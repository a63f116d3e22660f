use crate::config::AppConfig;
use crate::push;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<push::SubscriptionRegistry>,
}
