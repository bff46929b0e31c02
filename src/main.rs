use actix_cors::Cors;
use actix_web::{middleware::Compress, App, HttpServer};
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod models;
mod openapi;
mod repo;
mod revalidate;
mod routes;

use openapi::ApiDoc;
#[cfg(feature = "inmem-store")]
use repo::inmem::InMemRepo;
use revalidate::LogRevalidator;
use routes::{config, AppState};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds to reduce manual setup.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping tangle server");

    #[cfg(feature = "inmem-store")]
    let repo = InMemRepo::new();
    #[cfg(feature = "inmem-store")]
    info!("Using in-memory document store backend");

    let openapi = ApiDoc::openapi();
    let bind = std::env::var("TANGLE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let revalidator = Arc::new(LogRevalidator);

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local dev frontends
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "DELETE", "OPTIONS"])
                .supports_credentials()
                .max_age(3600);
            if let Ok(front) = std::env::var("FRONTEND_URL") {
                c = c.allowed_origin(&front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .configure(config)
            .service(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi.clone()))
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                revalidator: revalidator.clone(),
            }))
    })
    .bind(bind.as_str())?;

    info!("Listening on http://{bind}");

    server.run().await
}
