//! The endpoint for deleting an entry.

use axum::{
    Extension,
    extract::{Path, Query, State, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;

use crate::{
    Error,
    auth::UserID,
    ledger::{
        models::{TransactionId, TransactionKind},
        month::ViewMonth,
        page::{LedgerState, MonthQuery},
        store::{SQLiteTransactionStore, TransactionStore},
        view::ledger_url,
    },
};

/// Delete one of the logged in user's entries and reload the month it was
/// deleted from.
///
/// Errors are returned as an alert, leaving the page as it was.
pub async fn delete_transaction_endpoint(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<(TransactionKind, TransactionId)>, PathRejection>,
    Query(query): Query<MonthQuery>,
) -> Response {
    let Ok(Path((kind, id))) = path else {
        return Error::NotFound.into_alert_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = SQLiteTransactionStore::new(&connection).delete(kind, user_id, id) {
        tracing::error!("Could not delete {} {id} for user {user_id}: {error}", kind.noun());
        return error.into_alert_response();
    }

    tracing::info!("User {user_id} deleted {} {id}", kind.noun());

    let month = ViewMonth::from_query(query.month.as_deref(), &state.local_timezone);

    (HxRedirect(ledger_url(kind, month)), StatusCode::OK).into_response()
}
