use crate::api::auth::CredentialStore;
use crate::api::routes;
use crate::config::SharedConfig;
use crate::zone::DynUpdater;
use axum::Router;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: SharedConfig,
    pub updater: DynUpdater,
    pub credentials: Arc<CredentialStore>,
}

/// The API routes, ready to serve or to drive directly in tests.
pub fn router(
    config: SharedConfig,
    updater: DynUpdater,
    credentials: Arc<CredentialStore>,
) -> Router {
    routes::new(AppState {
        config,
        updater,
        credentials,
    })
}

pub fn new(
    config: SharedConfig,
    updater: DynUpdater,
    credentials: Arc<CredentialStore>,
) -> impl Future<Output = hyper::Result<()>> {
    let bind_addr = config.api_bind_addr;
    axum::Server::bind(&bind_addr).serve(router(config, updater, credentials).into_make_service())
}
