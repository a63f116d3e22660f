pub mod adapters;
mod app;
pub mod config;
pub mod feed;
pub mod ports;
pub mod push;
mod state;
pub mod types;

use std::net::SocketAddr;

pub use app::{app, app_with_registry};
pub use push::{
    PushDispatcher, SubscriptionRegistry, VapidCredentials, generate_vapid_credentials,
    maybe_dispatcher,
};

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app(config)).await.expect("server error");
}
