//! Service info endpoint.

use axum::{extract::Extension, response::Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;

/// Process start time, injected as an extension at bootstrap.
#[derive(Clone, Copy, Debug)]
pub struct ServerStart(pub Instant);

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ServiceInfo {
    name: String,
    version: String,
    status: String,
    uptime: u64,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service name, version, and uptime", body = ServiceInfo)
    ),
    tag = "health"
)]
pub async fn root(started: Extension<ServerStart>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "ok".to_string(),
        uptime: started.0 .0.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::{root, ServerStart};
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::response::IntoResponse;
    use std::time::Instant;

    #[tokio::test]
    async fn root_reports_name_and_status() -> Result<()> {
        let response = root(Extension(ServerStart(Instant::now())))
            .await
            .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;

        assert_eq!(
            body.get("name").and_then(serde_json::Value::as_str),
            Some(env!("CARGO_PKG_NAME"))
        );
        assert_eq!(
            body.get("status").and_then(serde_json::Value::as_str),
            Some("ok")
        );
        assert!(body.get("uptime").and_then(serde_json::Value::as_u64).is_some());
        Ok(())
    }
}
