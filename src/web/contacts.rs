use std::sync::Arc;

use salvo::prelude::*;
use serde_json::json;
use tracing::info;

use super::{WebState, state};
use crate::contact::{ContactDraft, matches};
use crate::error::ContactError;
use crate::store::{WireContact, WirePayload};

fn render_error(res: &mut Response, status: StatusCode, message: &str) {
    res.status_code(status);
    res.render(Json(json!({ "error": message })));
}

fn require_state(depot: &Depot, res: &mut Response) -> Option<Arc<WebState>> {
    let state = state(depot);
    if state.is_none() {
        render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "store not available");
    }
    state
}

async fn parse_draft(req: &mut Request, res: &mut Response) -> Option<crate::contact::ValidDraft> {
    let payload = match req.parse_json::<WirePayload>().await {
        Ok(p) => p,
        Err(e) => {
            render_error(res, StatusCode::BAD_REQUEST, &format!("invalid body: {}", e));
            return None;
        }
    };
    match ContactDraft::from(payload).validate() {
        Ok(valid) => Some(valid),
        Err(e) => {
            render_error(res, StatusCode::BAD_REQUEST, &e.to_string());
            None
        }
    }
}

/// `GET /contacts?q=`
#[handler]
pub async fn list_contacts(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = require_state(depot, res) else {
        return;
    };
    let query = req.query::<String>("q").unwrap_or_default();

    let records: Vec<WireContact> = state
        .store
        .read()
        .iter()
        .filter(|c| matches(c, &query))
        .map(WireContact::from)
        .collect();
    res.render(Json(records));
}

/// `POST /contacts`
#[handler]
pub async fn create_contact(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = require_state(depot, res) else {
        return;
    };
    let Some(draft) = parse_draft(req, res).await else {
        return;
    };

    let contact = state.store.insert(&draft).await;
    res.status_code(StatusCode::CREATED);
    res.render(Json(WireContact::from(&contact)));
}

/// `PUT /contacts/{id}`
#[handler]
pub async fn update_contact(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = require_state(depot, res) else {
        return;
    };
    let id = req.param::<String>("id").unwrap_or_default();
    let Some(draft) = parse_draft(req, res).await else {
        return;
    };

    match state.store.modify(&id, &draft).await {
        Ok(contact) => res.render(Json(WireContact::from(&contact))),
        Err(ContactError::NotFound(id)) => {
            render_error(res, StatusCode::NOT_FOUND, &format!("contact not found: {}", id));
        }
        Err(e) => render_error(res, StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// `DELETE /contacts/{id}`
#[handler]
pub async fn delete_contact(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = require_state(depot, res) else {
        return;
    };
    let id = req.param::<String>("id").unwrap_or_default();

    if state.store.remove(&id).await {
        info!("API deleted contact {}", id);
        res.status_code(StatusCode::NO_CONTENT);
    } else {
        render_error(res, StatusCode::NOT_FOUND, &format!("contact not found: {}", id));
    }
}
