use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{config::ConfigError, database::StoreError, language::LanguageError, models::ModelError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Scavenger hunt {0} not found")]
    HuntNotFound(u64),

    #[error("Destination with place id {0} already exists")]
    DuplicateDestination(String),

    #[error("Not enough destinations: requested {requested}, found {available}")]
    NotEnoughDestinations { requested: usize, available: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Language error: {0}")]
    Language(#[from] LanguageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload { .. } | AppError::Model { .. } => StatusCode::BAD_REQUEST,
            AppError::HuntNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::DuplicateDestination { .. } => StatusCode::CONFLICT,
            AppError::NotEnoughDestinations { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config { .. }
            | AppError::Store { .. }
            | AppError::Language { .. }
            | AppError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("{self}");
        }

        (status, self.to_string()).into_response()
    }
}
