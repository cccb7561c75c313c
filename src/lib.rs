use std::sync::Arc;

use spin_sdk::http::{IntoResponse, Request};

pub mod auth;
pub mod config;
pub mod core;
pub mod feed;
pub mod follow;
pub mod handlers;
pub mod models;
pub mod posts;
pub mod users;

#[cfg(test)]
mod testutil;

use crate::core::db::Db;
use crate::core::store::SpinStore;

// === Component entrypoint ===
#[cfg_attr(target_arch = "wasm32", spin_sdk::http_component)]
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let db = Db::new(Arc::new(SpinStore::new(config::kv_label())));
    Ok(handlers::dispatch(&db, req))
}
