use tracing::debug;

use super::handlers;
use super::types::{AppState, Reply, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> Reply {
    debug!(id = %req.id, method = %req.method, "dispatch");

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return Reply::Ready(resp);
    }
    if let Some(resp) = handlers::setup::try_handle(state, &req) {
        return Reply::Ready(resp);
    }
    if let Some(reply) = handlers::wizard::try_handle(state, &req) {
        return reply;
    }
    if let Some(resp) = handlers::submissions::try_handle(state, &req) {
        return Reply::Ready(resp);
    }

    Reply::Ready(err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    ))
}
