use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::services::{LinkService, SessionService};
use crate::config::Config;
use crate::domain::delete_request::DeleteRequest;
use crate::domain::repositories::Store;

/// Shared handles for whatever drives the services.
///
/// Every clone holds a sender of the deletion queue; the delete worker stops
/// only after all of them are dropped.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub links: Arc<LinkService<dyn Store>>,
    pub sessions: Arc<SessionService<dyn Store>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        config: &Config,
        delete_tx: mpsc::Sender<DeleteRequest>,
    ) -> Self {
        let links = Arc::new(LinkService::new(
            Arc::clone(&store),
            config.base_url.clone(),
            delete_tx,
        ));
        let sessions = Arc::new(SessionService::new(
            Arc::clone(&store),
            config.token_secret_key.clone(),
            config.token_ttl(),
        ));

        Self {
            store,
            links,
            sessions,
        }
    }
}
