use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::Msg;

/// RouteError
///
/// Raised while the route tree is being assembled. Every variant describes a
/// conflict in the tree itself; none of them can occur once the tree has been
/// frozen into a router.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: String, path: String },

    #[error("group {0} is already registered")]
    DuplicateGroup(String),

    #[error("path {0:?} must start with '/'")]
    InvalidPath(String),

    #[error("group {0} was not created by the scope it is mounted on")]
    ForeignGroup(String),

    #[error("path {0} is already owned by another group")]
    PathConflict(String),
}

/// RenderError
///
/// A template could not be turned into a response body. The error is logged
/// and answered with a 500; it is never replaced by an empty page.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to render template {template}")]
    Template {
        template: String,
        #[source]
        source: tera::Error,
    },
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self, "Template rendering failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

/// AppError
///
/// Internal failures of JSON handlers. Expected failures (bad input, missing
/// records) are reported through a `Msg` with `success: false` instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to issue session token")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Render(err) => err.into_response(),
            AppError::Token(err) => {
                tracing::error!(error = ?err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(Msg::fail("Internal server error")),
                )
                    .into_response()
            }
        }
    }
}
