use std::sync::{Arc, Mutex};
use std::time::Duration;

use contact_book::store::{LocalStore, MemorySlot, RemoteStore};
use contact_book::web;
use salvo::conn::TcpListener;
use salvo::http::Method;
use salvo::prelude::*;
use serde_json::json;

pub fn empty_local() -> LocalStore {
    LocalStore::new(MemorySlot::new("contactos"))
}

/// Starts the contacts API on a free port and waits until it answers.
pub async fn spawn_server() -> (RemoteStore, Arc<LocalStore>) {
    let store = Arc::new(empty_local());
    let remote = serve_on_free_port(web::create_service(store.clone())).await;
    (remote, store)
}

/// Serves a scripted API whose failures are chosen by the test.
pub async fn spawn_stub(stub: StubApi) -> RemoteStore {
    let router = Router::new()
        .get(stub_health)
        .push(Router::with_path("contacts").get(stub.clone()))
        .push(Router::with_path("contacts/{id}").delete(stub));
    serve_on_free_port(Service::new(router)).await
}

async fn serve_on_free_port(service: Service) -> RemoteStore {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    tokio::spawn(async move {
        let acceptor = TcpListener::new(format!("127.0.0.1:{}", port)).bind().await;
        Server::new(acceptor).serve(service).await;
    });

    let remote = RemoteStore::new(format!("http://127.0.0.1:{}/", port));
    for _ in 0..100 {
        if remote.health().await {
            return remote;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("contacts API did not start on port {}", port);
}

#[handler]
async fn stub_health(res: &mut Response) {
    res.render(Json(json!({ "ok": true })));
}

/// Lists and deletes a fixed set of ids, answering 500 where told to.
#[derive(Clone, Default)]
pub struct StubApi {
    ids: Arc<Mutex<Vec<String>>>,
    failing_delete: Option<String>,
    failing_list: bool,
}

impl StubApi {
    pub fn with_ids(ids: &[&str]) -> Self {
        Self {
            ids: Arc::new(Mutex::new(ids.iter().map(|id| id.to_string()).collect())),
            ..Self::default()
        }
    }

    pub fn failing_delete(mut self, id: &str) -> Self {
        self.failing_delete = Some(id.to_string());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.failing_list = true;
        self
    }
}

#[async_trait::async_trait]
impl Handler for StubApi {
    async fn handle(&self, req: &mut Request, _depot: &mut Depot, res: &mut Response, _ctrl: &mut FlowCtrl) {
        if req.method() == Method::DELETE {
            let id = req.param::<String>("id").unwrap_or_default();
            if self.failing_delete.as_deref() == Some(id.as_str()) {
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
            self.ids.lock().unwrap().retain(|stored| *stored != id);
            res.status_code(StatusCode::NO_CONTENT);
            return;
        }

        if self.failing_list {
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            return;
        }
        let records: Vec<_> = self
            .ids
            .lock()
            .unwrap()
            .iter()
            .map(|id| json!({ "id": id, "nombre": format!("Contact {}", id), "telefono": "3312345678" }))
            .collect();
        res.render(Json(records));
    }
}
