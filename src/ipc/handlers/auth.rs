use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

/// Mocked login: any credentials are accepted unconditionally and a fresh
/// token is minted. The daemon keeps no record of issued tokens and never
/// checks them on other methods.
fn handle_login(req: &Request) -> serde_json::Value {
    let email = req.params.get("email").and_then(|v| v.as_str());
    let password = req.params.get("password").and_then(|v| v.as_str());
    if email.is_none() || password.is_none() {
        return err(&req.id, "bad_params", "missing email or password", None);
    }

    log::debug!("mock login for {}", email.unwrap_or_default());
    ok(
        &req.id,
        json!({
            "accessToken": Uuid::new_v4().to_string(),
            "role": "admin"
        }),
    )
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(req)),
        _ => None,
    }
}
