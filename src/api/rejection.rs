use std::convert::Infallible;

use log::error;
use serde_json::json;
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType},
    reply::{json, with_status},
    Rejection, Reply,
};

use crate::error::ApiError;

/// Renders every rejection as `{"detail": ...}`.
///
/// Body and query errors are checked before `MethodNotAllowed`: warp merges
/// them with the 405 of a sibling route on the same path.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if let Some(e) = err.find::<ApiError>() {
        (e.status(), e.to_string())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"))
    } else if err.find::<InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, String::from("Invalid query string"))
    } else if err.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            String::from("Request body is too large"),
        )
    } else if err.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            String::from("Content-Length header is required"),
        )
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            String::from("Expected a JSON body"),
        )
    } else if err.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            String::from("Method not allowed"),
        )
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found"))
    } else {
        error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error"),
        )
    };

    Ok(with_status(json(&json!({ "detail": detail })), status))
}
