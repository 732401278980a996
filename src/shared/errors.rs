use serde::Serialize;
use std::{convert::Infallible, fmt};
use warp::{http::StatusCode, reject::Reject, Rejection, Reply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Network unreachable, timeout or non-2xx status from the readings endpoint.
    Transport,
    /// Payload does not match the expected reading schema.
    Decode,
    /// Reserved, aggregation is total over well-formed input.
    #[allow(dead_code)]
    Aggregation,
    BadRequest,
    NotFound,
    Config,
    Internal,
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub err_type: ErrorType,
    pub message: String,
}

impl AppError {
    pub fn new(message: &str, err_type: ErrorType) -> AppError {
        AppError {
            message: message.to_string(),
            err_type,
        }
    }

    pub fn to_http_status(&self) -> StatusCode {
        match self.err_type {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Transport => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} error: {}", self.err_type, self.message)
    }
}

impl std::error::Error for AppError {}

impl Reject for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError {
            err_type: ErrorType::Transport,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError {
            err_type: ErrorType::Decode,
            message: format!("invalid JSON payload: {}", err),
        }
    }
}

impl From<rmp_serde::decode::Error> for AppError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        AppError {
            err_type: ErrorType::Decode,
            message: format!("invalid msgpack payload: {}", err),
        }
    }
}

impl From<serde_qs::Error> for AppError {
    fn from(err: serde_qs::Error) -> Self {
        AppError {
            err_type: ErrorType::Internal,
            message: format!("could not encode query: {}", err),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError {
            err_type: ErrorType::Config,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError {
            err_type: ErrorType::Config,
            message: err.to_string(),
        }
    }
}

// Body returned by the routes when a request fails
#[derive(Serialize, Debug)]
pub struct ErrorMessage {
    pub message: String,
    pub code: u16,
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(app_err) = err.find::<AppError>() {
        (app_err.to_http_status(), app_err.message.clone())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed".to_string(),
        )
    } else {
        log::error!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };

    let json = warp::reply::json(&ErrorMessage {
        message,
        code: code.as_u16(),
    });

    Ok(warp::reply::with_status(json, code))
}
