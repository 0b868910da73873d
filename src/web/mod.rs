pub mod contacts;
pub mod health;

use std::sync::Arc;
use std::time::Instant;

use salvo::conn::TcpListener;
use salvo::cors::{AllowHeaders, AllowMethods, AllowOrigin, Cors};
use salvo::prelude::*;
use tracing::info;

use crate::store::LocalStore;

pub const STATE_KEY: &str = "web_state";

/// Shared state handed to every handler through the depot.
pub struct WebState {
    pub started_at: Instant,
    pub version: String,
    pub store: Arc<LocalStore>,
}

impl WebState {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            started_at: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store,
        }
    }
}

pub fn create_router(store: Arc<LocalStore>) -> Router {
    Router::new()
        .hoop(StateHoop {
            state: Arc::new(WebState::new(store)),
        })
        .get(health::health_check)
        .push(
            Router::with_path("contacts")
                .get(contacts::list_contacts)
                .post(contacts::create_contact),
        )
        .push(
            Router::with_path("contacts/{id}")
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
}

/// The router wrapped with permissive CORS, so a browser front end can call it.
pub fn create_service(store: Arc<LocalStore>) -> Service {
    let cors = Cors::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any())
        .into_handler();
    Service::new(create_router(store)).hoop(cors)
}

/// Serves the contacts API on `addr` until the task is dropped.
pub async fn serve(addr: String, store: Arc<LocalStore>) {
    info!("Contacts API listening on {}", addr);
    let acceptor = TcpListener::new(addr).bind().await;
    Server::new(acceptor).serve(create_service(store)).await;
}

pub(crate) fn state(depot: &Depot) -> Option<Arc<WebState>> {
    depot.get::<Arc<WebState>>(STATE_KEY).ok().cloned()
}

struct StateHoop {
    state: Arc<WebState>,
}

#[async_trait::async_trait]
impl Handler for StateHoop {
    async fn handle(&self, req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
        depot.insert(STATE_KEY, self.state.clone());
        ctrl.call_next(req, depot, res).await;
    }
}
