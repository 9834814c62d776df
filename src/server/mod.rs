use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::{
    command::{BalanceRequest, RefundRequest, TransactionRequest},
    config::ServerConfig,
    gate::{SignatureGate, skip_requested},
    processor::{ErrorResponse, WalletError, wallet_processor::WalletProcessor},
    signature::{Message, SignatureError, signed},
    store::{AccountStore, StoreError, in_memory_store::InMemoryAccountStore},
};

const SKIP_SIG_PARAM: &str = "skipSig";

type Processor = WalletProcessor<Arc<dyn AccountStore>>;

#[derive(Clone)]
pub struct AppState {
    processor: Arc<Processor>,
    gate: Arc<SignatureGate>,
    sign_errors: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn AccountStore>, gate: SignatureGate, sign_errors: bool) -> Self {
        Self {
            processor: Arc::new(WalletProcessor::new(store)),
            gate: Arc::new(gate),
            sign_errors,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, StoreError> {
        let store = InMemoryAccountStore::with_accounts(config.accounts.iter().cloned())?;
        Ok(Self::new(
            Arc::new(store),
            SignatureGate::new(config.secret.clone(), config.allow_skip_sig),
            config.sign_errors,
        ))
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        self.processor.store()
    }

    fn dispatch<T, F>(
        &self,
        query: &HashMap<String, String>,
        headers: &HeaderMap,
        body: &[u8],
        operation: F,
    ) -> Response
    where
        T: Serialize,
        F: FnOnce(&Processor, &Message) -> Result<T, WalletError>,
    {
        let message = parse_body(headers, body);
        let skip = skip_requested(query.get(SKIP_SIG_PARAM).map(String::as_str));
        let outcome = self
            .gate
            .admit(&message, skip)
            .and_then(|()| operation(&self.processor, &message));
        match outcome {
            Ok(resp) => self.reply(&resp, true),
            Err(err) => {
                tracing::debug!(code = err.code(), %err, "request refused");
                self.reply(&ErrorResponse::from(&err), self.sign_errors)
            }
        }
    }

    fn reply<T: Serialize>(&self, body: &T, sign: bool) -> Response {
        let encoded = if sign {
            signed(body, self.gate.secret()).map(Value::Object)
        } else {
            serde_json::to_value(body).map_err(SignatureError::from)
        };
        match encoded {
            Ok(value) => Json(value).into_response(),
            Err(err) => {
                tracing::error!(%err, "failed to encode response body");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Only `application/json` bodies are read. Anything else, or anything that
/// is not a JSON object, is treated as an empty body.
fn parse_body(headers: &HeaderMap, body: &[u8]) -> Message {
    if !is_json(headers) {
        return Message::new();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => Message::new(),
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/balance", post(handle_balance))
        .route("/credit", post(handle_credit))
        .route("/debit", post(handle_debit))
        .route("/refund", post(handle_refund))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Binds `config.listen` and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::from_config(&config).context("seeding accounts")?;
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding wallet listener on {}", config.listen))?;
    tracing::info!(
        listen = %config.listen,
        accounts = config.accounts.len(),
        skip_sig = config.allow_skip_sig,
        "wallet mock listening"
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving wallet API")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn handle_balance(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.dispatch(&query, &headers, &body, |processor, message| {
        processor.balance(&BalanceRequest::from_message(message))
    })
}

async fn handle_credit(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.dispatch(&query, &headers, &body, |processor, message| {
        processor.credit(&TransactionRequest::from_message(message))
    })
}

async fn handle_debit(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.dispatch(&query, &headers, &body, |processor, message| {
        processor.debit(&TransactionRequest::from_message(message))
    })
}

async fn handle_refund(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.dispatch(&query, &headers, &body, |processor, message| {
        processor.refund(&RefundRequest::from_message(message))
    })
}
