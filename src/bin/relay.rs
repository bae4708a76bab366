use anyhow::{Context, Result};
use clap::Parser;
use erpview::{
    config::Config,
    fetch::{FetchError, Relay},
    parse::{self, DelimiterMode},
    view::{fields::DOCUMENT, search, status_records, FieldBinding, FieldSpec},
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, net::SocketAddr, path::PathBuf, sync::Arc, time::Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use warp::{
    http::{header, StatusCode},
    reply::Response,
    Filter, Reply,
};

/// Serve the remote export as plain CSV (and as parsed records) over HTTP.
#[derive(Parser, Debug)]
struct Args {
    /// Config file; `./erpview.yaml` is used when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_text: Option<String>,
}

#[derive(Deserialize)]
struct RecordsQuery {
    q: Option<String>,
}

struct AppState {
    relay: Relay,
    mode: DelimiterMode,
    fields: Vec<FieldSpec>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    let args = Args::parse();
    let cfg = Config::load(args.config.as_deref())?;
    let addr: SocketAddr = match args.bind {
        Some(a) => a,
        None => cfg
            .relay
            .bind
            .parse()
            .with_context(|| format!("invalid bind address `{}`", cfg.relay.bind))?,
    };

    let relay = cfg.relay()?;
    match relay.source() {
        Some(source) => info!(url = %source.url(), "relaying export"),
        None => warn!("no source URL configured; requests will fail until ERPVIEW_SOURCE_URL is set"),
    }
    let state = Arc::new(AppState {
        relay,
        mode: cfg.parse.mode,
        fields: cfg.view.fields.clone(),
    });

    info!(%addr, "relay listening");
    warp::serve(routes(state)).run(addr).await;
    Ok(())
}

fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "erpview-relay"
            }))
            .into_response()
        });

    let with_state = warp::any().map(move || Arc::clone(&state));

    let csv = warp::path!("api" / "status-os")
        .and(warp::get())
        .and(with_state.clone())
        .and_then(status_csv);

    let records = warp::path!("api" / "status-os" / "records")
        .and(warp::get())
        .and(warp::query::<RecordsQuery>())
        .and(with_state)
        .and_then(status_records_json);

    health.or(csv).unify().or(records).unify()
}

async fn status_csv(state: Arc<AppState>) -> Result<Response, Infallible> {
    let start = Instant::now();
    match state.relay.fetch_text().await {
        Ok(text) => {
            info!(bytes = text.len(), elapsed = ?start.elapsed(), "served export");
            Ok(csv_reply(text))
        }
        Err(e) => Ok(error_reply(&e)),
    }
}

async fn status_records_json(
    query: RecordsQuery,
    state: Arc<AppState>,
) -> Result<Response, Infallible> {
    let text = match state.relay.fetch_text().await {
        Ok(t) => t,
        Err(e) => return Ok(error_reply(&e)),
    };
    let doc = match parse::parse(&text, state.mode) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "export could not be parsed");
            return Ok(json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: e.to_string(),
                    status: None,
                    status_text: None,
                },
            ));
        }
    };
    let binding = FieldBinding::resolve(doc.header(), &state.fields);
    let rows = search(doc.rows(), binding.binding(DOCUMENT), query.q.as_deref().unwrap_or(""));
    let records = status_records(rows, &binding);
    info!(records = records.len(), "served records");
    Ok(warp::reply::with_header(
        warp::reply::json(&records),
        header::CACHE_CONTROL,
        "no-store",
    )
    .into_response())
}

fn csv_reply(text: String) -> Response {
    let reply = warp::reply::with_header(text, header::CONTENT_TYPE, "text/csv; charset=utf-8");
    warp::reply::with_header(reply, header::CACHE_CONTROL, "no-store").into_response()
}

/// Upstream failures become JSON errors: 504 for timeouts, 500 otherwise.
fn error_reply(err: &FetchError) -> Response {
    error!(error = %err, "upstream fetch failed");
    let (code, body) = match err {
        FetchError::Timeout => (
            StatusCode::GATEWAY_TIMEOUT,
            ErrorResponse {
                error: "timed out downloading the CSV".into(),
                status: None,
                status_text: None,
            },
        ),
        FetchError::Status { status, reason } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                error: "could not download the CSV".into(),
                status: Some(*status),
                status_text: Some(reason.clone()),
            },
        ),
        FetchError::NotConfigured => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                error: "no CSV URL configured".into(),
                status: None,
                status_text: None,
            },
        ),
        FetchError::Auth(_) | FetchError::Network(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                error: "internal error downloading the CSV".into(),
                status: None,
                status_text: None,
            },
        ),
    };
    json_error(code, body)
}

fn json_error(code: StatusCode, body: ErrorResponse) -> Response {
    warp::reply::with_status(warp::reply::json(&body), code).into_response()
}
