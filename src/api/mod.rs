//! Portal HTTP API.
//!
//! Every request goes through [`dispatch`]: the method and path are resolved
//! against the route table, the handler runs on the shared SQLite connection
//! and the result is wrapped in the standard envelope.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, HeaderName, Method, Uri};
use axum::response::Response;
use axum::Router;
use color_eyre::{eyre::eyre, Result};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use url::form_urlencoded;

use crate::config::Config;

pub mod envelope;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::Route;
pub use state::AppState;

use envelope::RequestContext;
use handlers::{RouteRequest, SearchRequest};

/// Create the portal application with CORS and request tracing.
pub fn create_app(state: AppState) -> Router {
  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([
      header::CONTENT_TYPE,
      header::AUTHORIZATION,
      HeaderName::from_static("x-requested-with"),
    ]);

  Router::new()
    .fallback(dispatch)
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .with_state(state)
}

async fn dispatch(
  State(state): State<AppState>,
  method: Method,
  uri: Uri,
  RawQuery(query): RawQuery,
  headers: HeaderMap,
  body: Bytes,
) -> Response {
  let ctx = RequestContext::new(&method, &uri, &headers, state.environment);

  if method == Method::OPTIONS {
    return envelope::preflight();
  }

  let request = match build_request(&method, uri.path(), query.as_deref(), &body, &state, &ctx) {
    Ok(request) => request,
    Err(e) => return envelope::failure(&ctx, &e),
  };

  let route = request.route;
  let db = state.db.clone();
  let outcome = tokio::task::spawn_blocking(move || {
    db.with_conn(|conn| Ok(handlers::handle(conn, &request)))
  })
  .await;

  let result = match outcome {
    Ok(Ok(result)) => result,
    Ok(Err(e)) if route == Route::Health => Err(ApiError::upstream("Health check failed", e)),
    Ok(Err(e)) => Err(ApiError::upstream("Database connection failed", e)),
    Err(e) => Err(ApiError::upstream("Request handler failed", e)),
  };

  match result {
    Ok(reply) => envelope::success(&ctx, reply),
    Err(e) => envelope::failure(&ctx, &e),
  }
}

fn build_request(
  method: &Method,
  path: &str,
  query: Option<&str>,
  body: &[u8],
  state: &AppState,
  ctx: &RequestContext,
) -> Result<RouteRequest, ApiError> {
  let route = Route::resolve(method, path, &state.base_path)?;

  let params: HashMap<String, String> = query
    .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
    .unwrap_or_default();

  let search = match route {
    Route::Search if method == Method::POST => SearchRequest::from_body(body)?,
    Route::Search => SearchRequest::from_params(&params),
    _ => SearchRequest::default(),
  };

  Ok(RouteRequest {
    route,
    params,
    search,
    environment: ctx.environment_name(),
  })
}

/// Bind and serve the API until Ctrl-C.
pub async fn serve(config: &Config, bind: Option<&str>) -> Result<()> {
  let state = AppState::from_config(config)?;
  let app = create_app(state);
  let bind_address = bind.unwrap_or(&config.server.bind).to_string();

  let listener = tokio::net::TcpListener::bind(&bind_address)
    .await
    .map_err(|e| eyre!("Failed to bind to {}: {}", bind_address, e))?;

  info!("Portal API listening on http://{}", bind_address);
  info!("   Health Check: http://{}/health", bind_address);

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
      }
    })
    .await
    .map_err(|e| eyre!("Server error: {}", e))?;

  info!("Portal API stopped");
  Ok(())
}
