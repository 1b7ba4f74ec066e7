use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::time::Duration;
use thiserror::Error;

use crate::sniff::Format;

/// Why a single status candidate was rejected.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream answered HTTP {0}")]
    Status(u16),
    #[error("empty body")]
    EmptyBody,
    #[error("unrecognized body format")]
    Unrecognized,
    #[error("no usable fields in {0} body")]
    NoUsableFields(Format),
}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Network(err)
        }
    }
}

/// Every candidate failed.
#[derive(Debug, Error)]
#[error("all {} status candidates failed", .tried.len())]
pub struct Unavailable {
    pub tried: Vec<String>,
    pub last_error: Option<FetchError>,
}

impl Unavailable {
    pub fn detail(&self) -> String {
        match &self.last_error {
            Some(err) => err.to_string(),
            None => "no status candidates configured".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Unavailable(#[from] Unavailable),
    #[error("{0}")]
    BadRequest(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unavailable(err) => {
                let body = serde_json::json!({
                    "ok": false,
                    "error": "Falha ao obter o status da rádio",
                    "detail": err.detail(),
                    "tried": err.tried,
                });
                (
                    StatusCode::BAD_GATEWAY,
                    [(header::CACHE_CONTROL, "no-store")],
                    Json(body),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
        }
    }
}
