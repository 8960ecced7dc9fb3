pub mod translate;
pub mod upload;

use axum::Json;
use serde_json::{json, Value};

pub use translate::translate_session;
pub use upload::upload_files;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
