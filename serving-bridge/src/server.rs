use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use crate::client::Predictor;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::params::{PredictionParams, RequestValues};
use crate::request::build_predict_request;
use crate::text_format;

pub const PREDICTION_PATH: &str = "/model_prediction";

// ── Shared state ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    predictor: Arc<dyn Predictor>,
    model_name: Arc<str>,
}

impl AppState {
    pub fn new(predictor: Arc<dyn Predictor>, model_name: impl Into<Arc<str>>) -> Self {
        Self {
            predictor,
            model_name: model_name.into(),
        }
    }
}

/// Router exposing `/model_prediction` for GET and POST.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PREDICTION_PATH, get(model_prediction).post(model_prediction))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

// ── Lifecycle ─────────────────────────────────────────────────────────────

/// Bind the configured address and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: BridgeConfig, predictor: Arc<dyn Predictor>) -> Result<(), BridgeError> {
    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        %addr,
        serving = %config.serving_endpoint(),
        model = %config.model_name,
        timeout = ?config.timeout,
        "serving-bridge listening"
    );

    let state = AppState::new(predictor, config.model_name);
    run(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves, then drain
/// in-flight requests.
pub async fn run(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BridgeError> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("serving-bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

// ── Handler ───────────────────────────────────────────────────────────────

async fn model_prediction(
    State(state): State<AppState>,
    request: Request,
) -> Result<String, BridgeError> {
    let values = collect_values(request).await?;

    let params = PredictionParams::from_values(&values)
        .inspect_err(|e| tracing::warn!(code = e.code(), "Rejected parameters: {}", e))?;
    let predict_request = build_predict_request(&params, &state.model_name)
        .inspect_err(|e| tracing::warn!(code = e.code(), "Rejected input values: {}", e))?;

    tracing::debug!(
        input_name = %params.input_name,
        dtype = %params.input_type,
        elements = params.input.len(),
        "Dispatching prediction"
    );
    tracing::trace!(request = %text_format::render(&predict_request), "Predict request");

    let response = state
        .predictor
        .predict(predict_request)
        .await
        .inspect_err(|e| tracing::error!(code = e.code(), "Prediction failed: {}", e))?;

    Ok(text_format::render(&response))
}

/// Gather query-string values followed by form-body values.
///
/// The body is only consulted for non-GET requests carrying a urlencoded or
/// multipart form; any other body is ignored.
async fn collect_values(request: Request) -> Result<RequestValues, BridgeError> {
    let mut values = RequestValues::new();
    if let Some(query) = request.uri().query() {
        values.extend_urlencoded(query.as_bytes());
    }

    if request.method() == Method::GET {
        return Ok(values);
    }

    match form_kind(&request) {
        Some(FormKind::UrlEncoded) => {
            let body = axum::body::to_bytes(request.into_body(), usize::MAX)
                .await
                .map_err(|e| BridgeError::InvalidParams(format!("failed to read form body: {e}")))?;
            values.extend_urlencoded(&body);
        }
        Some(FormKind::Multipart) => read_multipart(request, &mut values).await?,
        None => {}
    }

    Ok(values)
}

enum FormKind {
    UrlEncoded,
    Multipart,
}

fn form_kind(request: &Request<Body>) -> Option<FormKind> {
    let content_type = request.headers().get(header::CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "application/x-www-form-urlencoded" => Some(FormKind::UrlEncoded),
        "multipart/form-data" => Some(FormKind::Multipart),
        _ => None,
    }
}

/// Append the text fields of a multipart body. File parts are skipped.
async fn read_multipart(request: Request, values: &mut RequestValues) -> Result<(), BridgeError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| BridgeError::InvalidParams(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BridgeError::InvalidParams(e.body_text()))?
    {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let text = field
            .text()
            .await
            .map_err(|e| BridgeError::InvalidParams(e.body_text()))?;
        values.push(name, text);
    }

    Ok(())
}
