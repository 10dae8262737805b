//! The page and endpoint for adding an expense or income entry.

use axum::{
    Extension,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;

use crate::{
    Error,
    auth::UserID,
    ledger::{
        form::{FieldErrors, FormMode, TransactionForm, transaction_form, transaction_form_page},
        models::TransactionKind,
        month::ViewMonth,
        page::LedgerState,
        store::{SQLiteTransactionStore, TransactionStore},
        view::ledger_url,
    },
    not_found::get_404_not_found_response,
};

/// Render the page for adding an entry of `kind`.
pub async fn get_new_transaction_page(
    State(state): State<LedgerState>,
    kind: Result<Path<TransactionKind>, PathRejection>,
) -> Response {
    let Ok(Path(kind)) = kind else {
        return get_404_not_found_response();
    };

    let values = TransactionForm::defaults(kind, &state.local_timezone);
    let form = transaction_form(kind, FormMode::Create, &values, &FieldErrors::default());
    let heading = format!("New {}", kind.noun());

    transaction_form_page(kind, &heading, &form).into_response()
}

/// Create an entry of `kind` for the logged in user.
///
/// Redirects to the month the entry falls in. Invalid input is returned as
/// the form with error messages, and nothing is written.
pub async fn create_transaction_endpoint(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
    kind: Result<Path<TransactionKind>, PathRejection>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let Ok(Path(kind)) = kind else {
        return Error::NotFound.into_alert_response();
    };

    let fields = match form.parse(kind, &state.local_timezone) {
        Ok(fields) => fields,
        Err(errors) => {
            tracing::debug!("Rejected new {} with invalid fields: {errors:?}", kind.noun());
            return transaction_form(kind, FormMode::Create, &form, &errors).into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let transaction = match SQLiteTransactionStore::new(&connection).create(kind, user_id, &fields)
    {
        Ok(transaction) => transaction,
        Err(error) => {
            tracing::error!("Could not create {} for user {user_id}: {error}", kind.noun());
            return error.into_alert_response();
        }
    };

    let month = ViewMonth::containing(state.local_timezone.local_date(transaction.timestamp));

    (
        HxRedirect(ledger_url(kind, month)),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::{
        ops::Range,
        sync::{Arc, Mutex},
    };

    use axum::{
        Extension, Router,
        http::StatusCode,
        routing::{get, post},
    };
    use axum_htmx::HX_REDIRECT;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use scraper::{Html, Selector};
    use time::macros::datetime;

    use crate::{
        PasswordHash,
        auth::{UserID, create_user},
        db::initialize,
        endpoints,
        ledger::{
            models::{Account, Category, TransactionKind},
            page::LedgerState,
            store::{SQLiteTransactionStore, TransactionStore},
        },
        money::Amount,
        test_utils::{
            assert_form_input, assert_form_submit_button_with_text, assert_hx_endpoint,
            assert_valid_html, must_get_form,
        },
        timezone::LocalTimezone,
    };

    use super::{create_transaction_endpoint, get_new_transaction_page};

    fn get_test_server() -> (TestServer, Arc<Mutex<Connection>>, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user_id = create_user(
            "alice@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap()
        .id;
        let connection = Arc::new(Mutex::new(connection));

        let state = LedgerState {
            local_timezone: LocalTimezone::from_name("Asia/Manila").unwrap(),
            db_connection: connection.clone(),
        };
        let app = Router::new()
            .route(endpoints::NEW_TRANSACTION_VIEW, get(get_new_transaction_page))
            .route(endpoints::TRANSACTIONS_API, post(create_transaction_endpoint))
            .layer(Extension(user_id))
            .with_state(state);

        (
            TestServer::new(app).expect("Could not create test server."),
            connection,
            user_id,
        )
    }

    fn all_time() -> Range<time::OffsetDateTime> {
        datetime!(2000-01-01 00:00 UTC)..datetime!(2100-01-01 00:00 UTC)
    }

    #[tokio::test]
    async fn new_page_has_form() {
        let (server, _, _) = get_test_server();

        let response = server.get("/ledger/income/new").await;

        response.assert_status_ok();
        let html = Html::parse_document(&response.text());
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, "/api/ledger/income", "hx-post");
        assert_form_input(&form, "amount", "text");
        assert_form_input(&form, "timestamp", "datetime-local");
        assert_form_submit_button_with_text(&form, "Add income");
    }

    #[tokio::test]
    async fn new_page_for_unknown_kind_is_not_found() {
        let (server, _, _) = get_test_server();

        let response = server.get("/ledger/savings/new").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn creates_entry_and_redirects_to_its_month() {
        let (server, connection, user_id) = get_test_server();

        let response = server
            .post("/api/ledger/expenses")
            .form(&[
                ("amount", "₱1,250.50"),
                ("account", "debit card"),
                ("category", "grocery"),
                ("timestamp", "2025-07-01T07:15"),
                ("note", "weekly shop"),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(HX_REDIRECT), "/ledger/expenses?month=2025-07");

        let stored = SQLiteTransactionStore::new(&connection.lock().unwrap())
            .query(TransactionKind::Expense, user_id, &all_time())
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].amount, Amount::from_minor_units(125_050));
        assert_eq!(stored[0].account, Account::DebitCard);
        assert_eq!(stored[0].category, Category::Grocery);
        assert_eq!(stored[0].note.as_deref(), Some("weekly shop"));
        assert_eq!(stored[0].timestamp, datetime!(2025-06-30 23:15 UTC));
    }

    #[tokio::test]
    async fn invalid_amount_is_shown_inline_and_nothing_is_written() {
        let (server, connection, user_id) = get_test_server();

        let response = server
            .post("/api/ledger/expenses")
            .form(&[
                ("amount", "-20"),
                ("account", "cash"),
                ("category", "food"),
                ("timestamp", "2025-07-01T07:15"),
                ("note", ""),
            ])
            .await;

        response.assert_status_ok();
        let html = Html::parse_fragment(&response.text());
        let messages = html
            .select(&Selector::parse("p.text-red-500").unwrap())
            .map(|p| p.text().collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(messages, ["Amount must be a positive number."]);

        let stored = SQLiteTransactionStore::new(&connection.lock().unwrap())
            .query(TransactionKind::Expense, user_id, &all_time())
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn category_of_other_kind_is_rejected() {
        let (server, connection, user_id) = get_test_server();

        let response = server
            .post("/api/ledger/income")
            .form(&[
                ("amount", "500"),
                ("account", "cash"),
                ("category", "food"),
                ("timestamp", "2025-07-01T07:15"),
            ])
            .await;

        response.assert_status_ok();
        assert!(
            response
                .text()
                .contains("Choose a category for this income.")
        );
        let stored = SQLiteTransactionStore::new(&connection.lock().unwrap())
            .query(TransactionKind::Income, user_id, &all_time())
            .unwrap();
        assert!(stored.is_empty());
    }
}
