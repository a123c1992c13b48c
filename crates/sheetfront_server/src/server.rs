use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use sheetfront_error::{Result, ResultExt};
use sheetfront_http::client::ReqwestClient;
use sheetfront_http::google::token::TokenSource;
use sheetfront_sheets::client::SheetsClient;
use sheetfront_sheets::memory::MemorySheets;
use sheetfront_sheets::{SheetAccessor, SheetsApi};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{AllowedOrigin, Backend, ServerConfig};
use crate::handlers::{
    CHRISTIAN_SHEET, ENCOURAGEMENT_SHEET, SOCIETY_SHEET, ServerState, christian, create_saying,
    encouragement, healthz, list_sayings, society,
};

/// Build the api router.
pub fn router(state: Arc<ServerState>, allowed_origin: &AllowedOrigin) -> Router {
    let origin = match allowed_origin {
        AllowedOrigin::Any => AllowOrigin::any(),
        AllowedOrigin::Exact(origin) => AllowOrigin::exact(origin.clone()),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(healthz))
        .route("/api/sayings", get(list_sayings).post(create_saying))
        .route("/api/christian", get(christian))
        .route("/api/society", get(society))
        .route("/api/encouragement", get(encouragement))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn sheets_api(backend: Backend) -> Arc<dyn SheetsApi> {
    match backend {
        Backend::Google { key, sheet_id } => {
            let http = ReqwestClient::default();
            let tokens = TokenSource::service_account(http.clone(), key);
            Arc::new(SheetsClient::new(http, tokens, sheet_id))
        }
        Backend::InMemory => {
            warn!("serving from an in-memory spreadsheet, rows are lost on exit");
            let sheets = MemorySheets::new();
            for tab in [CHRISTIAN_SHEET, SOCIETY_SHEET, ENCOURAGEMENT_SHEET] {
                sheets.add_tab(tab, Vec::new());
            }
            Arc::new(sheets)
        }
    }
}

/// Bind to the configured port and serve until ctrl-c.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let ServerConfig {
        port,
        allowed_origin,
        backend,
    } = config;

    let state = Arc::new(ServerState {
        accessor: SheetAccessor::new(sheets_api(backend)),
    });
    let app = router(state, &allowed_origin);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr)
        .await
        .context_fn(|| format!("Failed to bind to {addr}"))?;
    let local_addr = listener.local_addr()?;
    info!("✅ Server listening on {}", local_addr.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(%e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
