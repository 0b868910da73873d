use salvo::prelude::*;
use serde_json::json;

use super::state;

/// `GET /`: the payload the remote store's health check reads.
#[handler]
pub async fn health_check(depot: &mut Depot, res: &mut Response) {
    let Some(state) = state(depot) else {
        res.status_code(StatusCode::SERVICE_UNAVAILABLE);
        res.render(Json(json!({ "ok": false })));
        return;
    };

    res.render(Json(json!({
        "ok": true,
        "version": state.version,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "contacts": state.store.read().len(),
    })));
}
