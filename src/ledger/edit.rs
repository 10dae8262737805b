//! The page and endpoint for changing an existing entry.

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
        models::{TransactionId, TransactionKind},
        month::ViewMonth,
        page::LedgerState,
        store::{SQLiteTransactionStore, TransactionStore},
        view::ledger_url,
    },
    not_found::get_404_not_found_response,
};

/// Render the form for editing one of the logged in user's entries.
///
/// A partner's entry cannot be edited and is rejected as forbidden.
pub async fn get_edit_transaction_page(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<(TransactionKind, TransactionId)>, PathRejection>,
) -> Result<Response, Error> {
    let Ok(Path((kind, id))) = path else {
        return Ok(get_404_not_found_response());
    };

    let transaction = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        SQLiteTransactionStore::new(&connection)
            .get(kind, user_id, id)
            .inspect_err(|error| {
                tracing::warn!(
                    "User {user_id} could not open {} {id} for editing: {error}",
                    kind.noun()
                )
            })?
    };

    let values = TransactionForm::from_transaction(&transaction, &state.local_timezone);
    let form = transaction_form(kind, FormMode::Edit(id), &values, &FieldErrors::default());
    let heading = format!("Edit {}", kind.noun());

    Ok(transaction_form_page(kind, &heading, &form).into_response())
}

/// Replace the fields of one of the logged in user's entries.
///
/// Redirects to the month the entry now falls in. Invalid input is returned
/// as the form with error messages, and the entry is left unchanged.
pub async fn update_transaction_endpoint(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<(TransactionKind, TransactionId)>, PathRejection>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let Ok(Path((kind, id))) = path else {
        return Error::NotFound.into_alert_response();
    };

    let fields = match form.parse(kind, &state.local_timezone) {
        Ok(fields) => fields,
        Err(errors) => {
            tracing::debug!(
                "Rejected update to {} {id} with invalid fields: {errors:?}",
                kind.noun()
            );
            return transaction_form(kind, FormMode::Edit(id), &form, &errors).into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let transaction =
        match SQLiteTransactionStore::new(&connection).update(kind, user_id, id, &fields) {
            Ok(transaction) => transaction,
            Err(error) => {
                tracing::error!(
                    "Could not update {} {id} for user {user_id}: {error}",
                    kind.noun()
                );
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
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Router,
        http::StatusCode,
        routing::{get, put},
    };
    use axum_htmx::HX_REDIRECT;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use scraper::Html;
    use time::macros::datetime;

    use crate::{
        PasswordHash,
        auth::{UserID, create_user},
        db::initialize,
        endpoints,
        ledger::{
            models::{Account, Category, Transaction, TransactionFields, TransactionKind},
            page::LedgerState,
            store::{SQLiteTransactionStore, TransactionStore},
        },
        money::Amount,
        test_utils::{
            assert_form_input_with_value, assert_hx_endpoint, assert_valid_html, must_get_form,
        },
        timezone::LocalTimezone,
    };

    use super::{get_edit_transaction_page, update_transaction_endpoint};

    struct TestApp {
        server: TestServer,
        connection: Arc<Mutex<Connection>>,
        alice: UserID,
        bob: UserID,
    }

    fn get_test_app() -> TestApp {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let alice = create_user(
            "alice@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap()
        .id;
        let bob = create_user(
            "bob@example.com",
            PasswordHash::new_unchecked("hunter3"),
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
            .route(endpoints::EDIT_TRANSACTION_VIEW, get(get_edit_transaction_page))
            .route(endpoints::TRANSACTION_API, put(update_transaction_endpoint))
            .layer(Extension(alice))
            .with_state(state);

        TestApp {
            server: TestServer::new(app).expect("Could not create test server."),
            connection,
            alice,
            bob,
        }
    }

    fn add_expense(app: &TestApp, owner_id: UserID) -> Transaction {
        SQLiteTransactionStore::new(&app.connection.lock().unwrap())
            .create(
                TransactionKind::Expense,
                owner_id,
                &TransactionFields {
                    amount: Amount::from_major_units(120),
                    account: Account::GCash,
                    category: Category::Food,
                    note: Some("lunch".to_owned()),
                    timestamp: datetime!(2025-08-14 04:30 UTC),
                },
            )
            .unwrap()
    }

    fn update_form(amount: &str) -> [(&'static str, String); 5] {
        [
            ("amount", amount.to_owned()),
            ("account", "cash".to_owned()),
            ("category", "transpo".to_owned()),
            ("timestamp", "2025-09-02T18:00".to_owned()),
            ("note", "jeep".to_owned()),
        ]
    }

    #[tokio::test]
    async fn edit_page_is_prefilled() {
        let app = get_test_app();
        let expense = add_expense(&app, app.alice);

        let response = app
            .server
            .get(&format!("/ledger/expenses/{}/edit", expense.id))
            .await;

        response.assert_status_ok();
        let html = Html::parse_document(&response.text());
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &format!("/api/ledger/expenses/{}", expense.id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "amount", "text", "120.00");
        assert_form_input_with_value(&form, "timestamp", "datetime-local", "2025-08-14T12:30");
    }

    #[tokio::test]
    async fn edit_page_for_partner_entry_is_forbidden() {
        let app = get_test_app();
        let expense = add_expense(&app, app.bob);

        let response = app
            .server
            .get(&format!("/ledger/expenses/{}/edit", expense.id))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn edit_page_for_missing_entry_is_not_found() {
        let app = get_test_app();

        let response = app.server.get("/ledger/expenses/999/edit").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_replaces_fields_and_redirects_to_new_month() {
        let app = get_test_app();
        let expense = add_expense(&app, app.alice);

        let response = app
            .server
            .put(&format!("/api/ledger/expenses/{}", expense.id))
            .form(&update_form("45.50"))
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(HX_REDIRECT), "/ledger/expenses?month=2025-09");

        let updated = SQLiteTransactionStore::new(&app.connection.lock().unwrap())
            .get(TransactionKind::Expense, app.alice, expense.id)
            .unwrap();
        assert_eq!(updated.amount, Amount::from_minor_units(4_550));
        assert_eq!(updated.account, Account::Cash);
        assert_eq!(updated.category, Category::Transpo);
        assert_eq!(updated.note.as_deref(), Some("jeep"));
        assert_eq!(updated.timestamp, datetime!(2025-09-02 10:00 UTC));
    }

    #[tokio::test]
    async fn invalid_update_leaves_entry_unchanged() {
        let app = get_test_app();
        let expense = add_expense(&app, app.alice);

        let response = app
            .server
            .put(&format!("/api/ledger/expenses/{}", expense.id))
            .form(&update_form("abc"))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Amount must be a positive number."));

        let unchanged = SQLiteTransactionStore::new(&app.connection.lock().unwrap())
            .get(TransactionKind::Expense, app.alice, expense.id)
            .unwrap();
        assert_eq!(unchanged, expense);
    }

    #[tokio::test]
    async fn update_of_partner_entry_is_forbidden() {
        let app = get_test_app();
        let expense = add_expense(&app, app.bob);

        let response = app
            .server
            .put(&format!("/api/ledger/expenses/{}", expense.id))
            .form(&update_form("45.50"))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert!(response.text().contains("Only the owner of an entry can edit or delete it."));
    }
}
