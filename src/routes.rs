use actix_web::http::header::ContentType;
use actix_web::{get, post, web, HttpResponse};
use serde::Serialize;
use serde_json::Value;
use tera::Tera;

use crate::error::{Result, ValidationError};
use crate::message_database::{
    Message, MessageDatabase, Messages, NewMessage, SinceFilter, DEFAULT_USERNAME,
};

pub struct AppState {
    pub tera: Tera,
    pub db: MessageDatabase,
    pub poll_interval_ms: u64,
}

// Serialization objects
#[derive(Serialize)]
struct MessagesDso {
    messages: Messages,
}

#[derive(Serialize)]
struct SentDso {
    status: &'static str,
    message: Message,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_index)
        .service(post_send)
        .service(get_messages);
}

#[get("/")]
async fn get_index(data: web::Data<AppState>) -> Result<HttpResponse> {
    let mut context = tera::Context::new();
    context.insert("poll_interval_ms", &data.poll_interval_ms);
    context.insert("default_username", DEFAULT_USERNAME);
    let output = data.tera.render("index.html", &context)?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(output))
}

/// Anything that is not a non-empty JSON object with string fields is invalid.
fn parse_new_message(body: &[u8]) -> std::result::Result<NewMessage, ValidationError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;
    match &value {
        Value::Object(fields) if !fields.is_empty() => {}
        _ => return Err(ValidationError::InvalidJson),
    }
    serde_json::from_value(value).map_err(|_| ValidationError::InvalidJson)
}

#[post("/send")]
async fn post_send(body: web::Bytes, data: web::Data<AppState>) -> Result<HttpResponse> {
    let candidate = parse_new_message(&body)?;
    let message = web::block(move || data.db.append(candidate)).await??;
    tracing::info!(id = message.id, username = %message.username, "message posted");
    Ok(HttpResponse::Created().json(SentDso {
        status: "ok",
        message,
    }))
}

#[get("/messages")]
async fn get_messages(
    query: web::Query<Vec<(String, String)>>,
    data: web::Data<AppState>,
) -> Result<HttpResponse> {
    let since = query
        .iter()
        .find(|(key, _)| key == "since")
        .map(|(_, value)| value.as_str());
    let since = SinceFilter::parse(since);
    tracing::debug!(?since, "listing messages");

    let messages = web::block(move || data.db.query(&since)).await??;
    Ok(HttpResponse::Ok().json(MessagesDso { messages }))
}
