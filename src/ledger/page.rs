//! The month page: a viewer's expenses or income for one month, combined with
//! their partner's entries.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, Query, State, rejection::PathRejection},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    ledger::{
        aggregation::{month_totals, summarize_days},
        fetch::fetch_ledger,
        models::TransactionKind,
        month::{MonthNavigation, ViewMonth},
        store::SQLiteTransactionStore,
        view::{LedgerContent, LedgerPageView, ledger_page_view},
    },
    not_found::get_404_not_found_response,
    pairing::{PairingStore, SQLitePairingStore},
    preferences::is_net_hidden,
    timezone::LocalTimezone,
};

/// The state needed by the ledger pages and endpoints.
#[derive(Debug, Clone)]
pub struct LedgerState {
    /// The timezone that decides which day and month an entry falls on.
    pub local_timezone: LocalTimezone,
    /// The database connection for reading entries and pairings.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LedgerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The month to show, as `YYYY-MM`. Defaults to the current month.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    /// The month in `YYYY-MM` format.
    pub month: Option<String>,
}

/// Render the month page for the expenses or income of the logged in user.
///
/// If the entries cannot be loaded, the page is still rendered with the
/// list replaced by an error message.
pub async fn get_ledger_page(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
    kind: Result<Path<TransactionKind>, PathRejection>,
    Query(query): Query<MonthQuery>,
    jar: CookieJar,
) -> Result<Response, Error> {
    let Ok(Path(kind)) = kind else {
        return Ok(get_404_not_found_response());
    };

    let local_timezone = &state.local_timezone;
    let month = ViewMonth::from_query(query.month.as_deref(), local_timezone);
    let navigation = MonthNavigation::new(month, ViewMonth::current(local_timezone));
    let net_hidden = is_net_hidden(&jar, user_id);

    let (pairing, ledger) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        match SQLitePairingStore::new(&connection).get(user_id) {
            Ok(pairing) => {
                let ledger = fetch_ledger(
                    &SQLiteTransactionStore::new(&connection),
                    user_id,
                    pairing.as_ref(),
                    month,
                    local_timezone,
                );
                (pairing, ledger)
            }
            Err(error) => (None, Err(error)),
        }
    };

    let content = match &ledger {
        Ok(ledger) => LedgerContent::Loaded {
            totals: month_totals(&ledger.expenses, &ledger.incomes),
            days: summarize_days(kind, &ledger.expenses, &ledger.incomes, local_timezone),
        },
        Err(error) => {
            tracing::error!("Could not load the ledger of user {user_id} for {month}: {error}");
            LedgerContent::Failed
        }
    };

    Ok(ledger_page_view(LedgerPageView {
        kind,
        navigation,
        pairing: pairing.as_ref(),
        net_hidden,
        local_timezone,
        content,
    })
    .into_response())
}
