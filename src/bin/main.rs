#[cfg(not(target_arch = "wasm32"))]
mod native {
    extern crate shutter;

    use std::sync::Arc;

    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use shutter::config::ServerConfig;
    use shutter::core::db::{init_test_data, Db};
    use shutter::core::store::MemoryStore;
    use tracing::{error, info};
    use tracing_subscriber::EnvFilter;

    mod adapter {
        use actix_web::HttpRequest;
        use spin_sdk::http::{Method, Request};

        pub fn actix_to_spin_request(
            req: &HttpRequest,
            body: actix_web::web::Bytes,
        ) -> anyhow::Result<Request> {
            let method = match req.method().as_str() {
                "GET" => Method::Get,
                "POST" => Method::Post,
                "PUT" => Method::Put,
                "DELETE" => Method::Delete,
                "HEAD" => Method::Head,
                "OPTIONS" => Method::Options,
                "PATCH" => Method::Patch,
                other => anyhow::bail!("unsupported method {}", other),
            };

            let uri = req.uri().to_string();

            let mut req_builder = Request::builder();
            let method_set = req_builder.method(method);
            let uri_set = method_set.uri(&uri);

            let mut with_headers = uri_set;
            for (name, value) in req.headers() {
                if let Ok(val_str) = value.to_str() {
                    with_headers = with_headers.header(name.as_str(), val_str);
                }
            }

            Ok(with_headers.body(body.to_vec()).build())
        }

        pub fn spin_to_actix_response(spin_resp: spin_sdk::http::Response) -> actix_web::HttpResponse {
            let status = *spin_resp.status();
            let body = spin_resp.body().to_vec();

            let mut response = actix_web::HttpResponse::build(
                actix_web::http::StatusCode::from_u16(status)
                    .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
            );

            response.content_type("application/json").body(body)
        }
    }

    pub async fn run() -> anyhow::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,shutter=debug")),
            )
            .init();

        let config = ServerConfig::from_env();
        info!(?config, "Loaded configuration");

        let db = Db::new(Arc::new(MemoryStore::new()));
        if config.seed_demo_data {
            init_test_data(&db).map_err(|e| anyhow::anyhow!("seeding failed: {}", e))?;
        }
        let db = web::Data::new(db);

        info!(addr = %config.http_addr, "Server listening");

        HttpServer::new(move || {
            App::new()
                .app_data(db.clone())
                .app_data(web::PayloadConfig::new(20 * 1024 * 1024))
                .default_service(web::route().to(handle_all))
        })
        .bind(config.http_addr)?
        .run()
        .await?;

        Ok(())
    }

    async fn handle_all(db: web::Data<Db>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
        let spin_req = match adapter::actix_to_spin_request(&req, body) {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "could not adapt request");
                return HttpResponse::BadRequest()
                    .json(serde_json::json!({"error": "Invalid request"}));
            }
        };

        // Handlers are synchronous; keep argon2 and image work off the reactor.
        let db = db.into_inner();
        match web::block(move || shutter::handlers::dispatch(&db, spin_req)).await {
            Ok(spin_resp) => adapter::spin_to_actix_response(spin_resp),
            Err(e) => {
                error!(error = %e, "handler panicked");
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({"error": "Internal server error"}))
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
