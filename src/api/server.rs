use crate::api::routes;
use crate::config::SharedConfig;
use crate::store::DynAccountStore;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct AppState {
    pub config: SharedConfig,
    pub store: DynAccountStore,
}

/// The API [`Router`], with tracing, timeout and CORS layers applied.
///
/// Handlers on authenticated routes read the peer address from
/// [`ConnectInfo`][axum::extract::ConnectInfo]; serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(config: SharedConfig, store: DynAccountStore) -> Router {
    routes::new(AppState { config, store })
}

pub fn new(
    config: SharedConfig,
    store: DynAccountStore,
) -> impl Future<Output = hyper::Result<()>> {
    let addr = config.api_bind_addr;
    axum::Server::bind(&addr)
        .serve(router(config, store).into_make_service_with_connect_info::<SocketAddr>())
}
