//! Pitaka is a web app for tracking day-to-day expenses and income, on your
//! own or combined with a partner's ledger.
//!
//! This library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod ledger;
mod logging;
mod money;
mod navigation;
mod not_found;
mod pairing;
mod preferences;
mod routing;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{PasswordHash, User, UserID, ValidatedPassword, create_user};
pub use db::initialize as initialize_db;
pub use ledger::{
    ACCOUNTS, Account, Category, DayBucket, Ledger, MonthTotals, Ownership,
    SQLiteTransactionStore, Transaction, TransactionFields, TransactionId, TransactionKind,
    TransactionStore, ViewMonth, fetch_kind, fetch_ledger, month_totals, summarize_days,
};
pub use logging::logging_middleware;
pub use money::Amount;
pub use pairing::{Pairing, PairingStore, SQLitePairingStore, add_partner};
pub use routing::build_router;
pub use timezone::LocalTimezone;

use crate::{
    alert::Alert,
    internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of email and password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The email address entered by the user is not a plausible email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// A user with the email address already exists.
    #[error("an account with that email already exists")]
    DuplicateEmail,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The amount entered for an expense or income was empty, not a number or
    /// not greater than zero.
    ///
    /// This error is raised before anything is written to the database.
    #[error("Amount must be a positive number.")]
    InvalidAmount(String),

    /// The category does not belong to the list of categories for the kind of
    /// transaction, e.g. "salary" used for an expense.
    #[error("\"{0}\" is not a valid category for this entry")]
    InvalidCategory(String),

    /// The caller tried to read or change a record owned by another user.
    ///
    /// Partners can see each other's entries, but only the owner may edit
    /// or delete them.
    #[error("you do not have permission to change this record")]
    Unauthorized,

    /// The user tried to add their own email address as their partner.
    #[error("you cannot add yourself as your partner")]
    SelfPairing,

    /// The user tried to add a partner while already having one.
    #[error("you have already added a partner")]
    DuplicatePairing,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The auth token could not be serialized to or deserialized from JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// The auth token cookie is missing from the cookie jar.
    #[error("no auth token in the cookie jar")]
    CookieMissing,

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067
                    && desc.ends_with("spouse_connection.user_id") =>
            {
                Error::DuplicatePairing
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::Unauthorized => (
                StatusCode::FORBIDDEN,
                html::error_view(
                    "Forbidden",
                    "403",
                    "This record belongs to someone else.",
                    "Only the owner of an entry can edit or delete it.",
                ),
            )
                .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub(crate) fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                        ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            error @ (Error::InvalidAmount(_) | Error::InvalidCategory(_)) => (
                StatusCode::BAD_REQUEST,
                Alert {
                    message: "Invalid entry".to_owned(),
                    details: error.to_string(),
                },
            ),
            Error::Unauthorized => (
                StatusCode::FORBIDDEN,
                Alert {
                    message: "Not allowed".to_owned(),
                    details: "Only the owner of an entry can edit or delete it.".to_owned(),
                },
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert {
                    message: "Could not find the entry".to_owned(),
                    details: "The entry could not be found. \
                    Try refreshing the page to see if it has already been deleted."
                        .to_owned(),
                },
            ),
            error @ (Error::InvalidEmail(_) | Error::SelfPairing | Error::DuplicatePairing) => (
                StatusCode::BAD_REQUEST,
                Alert {
                    message: "Could not add partner".to_owned(),
                    details: error.to_string(),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert {
                    message: "Something went wrong".to_owned(),
                    details:
                        "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}
