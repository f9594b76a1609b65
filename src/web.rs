//! HTTP routes: static pages, completion forms, prediction and the Telegram
//! webhook.

use std::sync::Arc;

use askama::Template;
use axum::{
    body::Bytes,
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::bot::{self, TelegramUpdate, INVALID_PAYLOAD};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::llm::CompletionClient;
use crate::platform::Messenger;
use crate::prediction::{self, Regressor};

pub const WEBHOOK_INFO: &str = "Telegram webhook endpoint. Use POST to send updates.";
pub const WEBHOOK_CONNECTED: &str = "✅ Telegram bot is connected. Try messaging the bot.";

/// Process-wide state shared by every handler.
pub struct AppState {
    pub config: Config,
    pub completion: Arc<dyn CompletionClient>,
    pub messenger: Arc<dyn Messenger>,
    pub regressor: Arc<dyn Regressor>,
}

pub type SharedState = Arc<AppState>;

// ── Pages ──────────────────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage;

#[derive(Template)]
#[template(path = "main.html")]
struct MainPage;

#[derive(Template)]
#[template(path = "llama.html")]
struct LlamaPage;

#[derive(Template)]
#[template(path = "llama_reply.html")]
struct LlamaReplyPage {
    r: String,
}

#[derive(Template)]
#[template(path = "deepseek.html")]
struct DeepseekPage;

#[derive(Template)]
#[template(path = "deepseek_reply.html")]
struct DeepseekReplyPage {
    result: String,
}

#[derive(Template)]
#[template(path = "dbs.html")]
struct DbsPage;

#[derive(Template)]
#[template(path = "prediction.html")]
struct PredictionPage {
    r: f64,
}

#[derive(Template)]
#[template(path = "telegram.html")]
struct TelegramPage {
    bot_link: Option<String>,
    status: Option<String>,
}

fn render<T: Template>(page: T) -> Result<Html<String>> {
    Ok(Html(page.render()?))
}

// ── Forms ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PromptForm {
    prompt: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| AppError::Validation(format!("missing form field `{field}`")))
}

// ── Router ─────────────────────────────────────────────────────────────────────

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index).post(index))
        .route("/main", get(main_menu).post(main_menu))
        .route("/llama", get(llama).post(llama))
        .route("/llama_reply", post(llama_reply))
        .route("/deepseek", get(deepseek).post(deepseek))
        .route("/deepseek_reply", post(deepseek_reply))
        .route("/dbs", get(dbs).post(dbs))
        .route("/prediction", post(predict))
        .route("/telegram", get(telegram_info).post(telegram_info))
        .route("/setup_webhook", get(setup_webhook))
        .route("/webhook", get(webhook_info).post(webhook))
        .with_state(state)
}

// ── Handlers ───────────────────────────────────────────────────────────────────

async fn index() -> Result<Html<String>> {
    render(IndexPage)
}

async fn main_menu(
    form: std::result::Result<Form<QueryForm>, FormRejection>,
) -> Result<Html<String>> {
    if let Ok(Form(QueryForm { q: Some(q) })) = form {
        debug!("Main page visited with q={}", q);
    }
    render(MainPage)
}

async fn llama() -> Result<Html<String>> {
    render(LlamaPage)
}

async fn llama_reply(
    State(state): State<SharedState>,
    Form(form): Form<QueryForm>,
) -> Result<Html<String>> {
    let q = required(form.q, "q")?;
    let r = state
        .completion
        .complete(&state.config.llm.llama_model, &q)
        .await
        .map_err(AppError::ExternalService)?;
    render(LlamaReplyPage { r })
}

async fn deepseek() -> Result<Html<String>> {
    render(DeepseekPage)
}

async fn deepseek_reply(
    State(state): State<SharedState>,
    Form(form): Form<PromptForm>,
) -> Result<Html<String>> {
    let prompt = required(form.prompt, "prompt")?;
    let result = state
        .completion
        .complete(&state.config.llm.deepseek_model, &prompt)
        .await
        .map_err(AppError::ExternalService)?;
    render(DeepseekReplyPage { result })
}

async fn dbs() -> Result<Html<String>> {
    render(DbsPage)
}

async fn predict(
    State(state): State<SharedState>,
    Form(form): Form<QueryForm>,
) -> Result<Html<String>> {
    let input = prediction::parse_input(&required(form.q, "q")?)?;
    let r = state.regressor.predict(input).await?;
    info!("Prediction for {}: {}", input, r);
    render(PredictionPage { r })
}

async fn telegram_info(State(state): State<SharedState>) -> Result<Html<String>> {
    render(TelegramPage {
        bot_link: Some(state.config.telegram.bot_link()),
        status: None,
    })
}

async fn setup_webhook(State(state): State<SharedState>) -> Result<Html<String>> {
    // Outcome ignored; setWebhook below reports whether the bot is connected.
    if let Err(e) = state.messenger.delete_webhook().await {
        warn!("deleteWebhook failed: {:#}", e);
    }

    let url = state.config.telegram.webhook_url();
    let status = match state.messenger.set_webhook(&url).await {
        Ok(()) => {
            info!("Telegram webhook registered at {}", url);
            WEBHOOK_CONNECTED.to_string()
        }
        Err(e) => {
            error!("setWebhook failed: {:#}", e);
            format!("❌ Failed to connect the Telegram bot. Response: {e:#}")
        }
    };

    render(TelegramPage {
        bot_link: Some(state.config.telegram.bot_link()),
        status: Some(status),
    })
}

async fn webhook_info() -> &'static str {
    WEBHOOK_INFO
}

async fn webhook(State(state): State<SharedState>, body: Bytes) -> Response {
    debug!("Webhook data received: {}", String::from_utf8_lossy(&body));

    let update = match TelegramUpdate::from_json(&body) {
        Ok(update) => update,
        Err(e) => {
            error!("Invalid data received in webhook: {}", e);
            return (StatusCode::BAD_REQUEST, INVALID_PAYLOAD).into_response();
        }
    };

    bot::relay(
        &update,
        state.completion.as_ref(),
        state.messenger.as_ref(),
        &state.config.llm.deepseek_model,
    )
    .await;

    (StatusCode::OK, "OK").into_response()
}
