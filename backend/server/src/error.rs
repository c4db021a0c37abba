use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::{
    database::StorageError,
    models::{Ack, EMPTY_FORM, FETCH_FAILED, SAVE_FAILED, SUBMIT_FAILED},
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Empty form payload")]
    EmptyForm,

    #[error("Failed to save consultation: {0}")]
    SaveFailed(#[source] StorageError),

    #[error("Failed to fetch consultations: {0}")]
    FetchFailed(#[source] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::EmptyForm => (StatusCode::BAD_REQUEST, EMPTY_FORM),
            AppError::SaveFailed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, SAVE_FAILED),
            AppError::FetchFailed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, SUBMIT_FAILED),
        };

        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        (status, Json(Ack::failure(message))).into_response()
    }
}
