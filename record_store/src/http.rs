use lambda_http::{Body, Response};
use serde::Serialize;

use crate::error::ApiError;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";
pub const ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";

pub fn json_response<T: Serialize>(status: u16, body: &T) -> Result<Response<Body>, ApiError> {
    let json = serde_json::to_string(body).map_err(ApiError::internal)?;
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("Access-Control-Allow-Origin", ALLOW_ORIGIN)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .body(json.into())
        .map_err(ApiError::internal)
}

pub fn error_response(status: u16, message: &str) -> Result<Response<Body>, ApiError> {
    json_response(status, &serde_json::json!({ "error": message }))
}

pub fn no_content_response() -> Result<Response<Body>, ApiError> {
    Response::builder()
        .status(204)
        .header("Access-Control-Allow-Origin", ALLOW_ORIGIN)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .body(Body::Empty)
        .map_err(ApiError::internal)
}

/// OPTIONS always short-circuits to 200 with the CORS headers and no body.
pub fn preflight_response() -> Result<Response<Body>, ApiError> {
    Response::builder()
        .status(200)
        .header("Access-Control-Allow-Origin", ALLOW_ORIGIN)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .body(Body::Empty)
        .map_err(ApiError::internal)
}
