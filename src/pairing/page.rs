//! The partner page and the endpoints for adding and removing a partner.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{UserID, get_user_by_id},
    endpoints,
    html::{BUTTON_DELETE_STYLE, CARD_STYLE, FORM_CONTAINER_STYLE, base, email_input, submit_button},
    internal_server_error::get_internal_server_error_redirect,
    navigation::NavBar,
    pairing::core::{Pairing, PairingStore, SQLitePairingStore, add_partner},
};

/// The state needed for the partner page and endpoints.
#[derive(Debug, Clone)]
pub struct PartnerState {
    /// The database connection for reading and writing pairings.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PartnerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn add_partner_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::PARTNER_API)
            hx-target="this"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #submit-button"
            class="w-full space-y-4 md:space-y-6"
        {
            p class="text-sm text-gray-600 dark:text-gray-400"
            {
                "Add your partner's email to see their expenses and income next to yours. "
                "They will need to add you too to see yours."
            }

            (email_input(email, error_message))
            (submit_button("Add partner"))
        }
    }
}

fn partner_status(pairing: &Pairing) -> Markup {
    html! {
        section id="partner-status" class=(CARD_STYLE)
        {
            p class="font-semibold" { (pairing.partner_email) }

            @if pairing.is_pending() {
                p class="text-sm text-gray-600 dark:text-gray-400"
                {
                    "No account uses this email yet. "
                    "Their entries will appear once they sign up."
                }
            } @else {
                p class="text-sm text-green-700 dark:text-green-400"
                {
                    "Account found. Your ledgers are combined."
                }
            }

            button
                type="button"
                hx-delete=(endpoints::PARTNER_API)
                hx-confirm="Stop combining your ledger with this partner?"
                hx-swap="none"
                hx-target-error="#alert-container"
                class={ "mt-4 " (BUTTON_DELETE_STYLE) }
            {
                "Remove partner"
            }
        }
    }
}

fn partner_view(pairing: Option<&Pairing>) -> Markup {
    let nav_bar = NavBar::new(endpoints::PARTNER_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "Partner" }

                @match pairing {
                    Some(pairing) => (partner_status(pairing)),
                    None => (add_partner_form("", None)),
                }
            }
        }
    };

    base("Partner", &content)
}

/// Render the partner page, showing whether the partner has an account.
pub async fn get_partner_page(
    State(state): State<PartnerState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let pairing = SQLitePairingStore::new(&connection)
        .get(user_id)
        .inspect_err(|error| tracing::error!("Could not get pairing of user {user_id}: {error}"))?;

    Ok(partner_view(pairing.as_ref()).into_response())
}

/// The email entered in the add partner form.
#[derive(Debug, Deserialize)]
pub struct PartnerForm {
    /// The partner's email address.
    pub email: String,
}

/// Add a partner for the logged in user.
///
/// Invalid emails, the user's own email, and adding a second partner are
/// shown as errors in the form.
pub async fn add_partner_endpoint(
    State(state): State<PartnerState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<PartnerForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(error) => {
            tracing::error!("Could not get user {user_id} to add a partner: {error}");
            return get_internal_server_error_redirect();
        }
    };

    match add_partner(
        &SQLitePairingStore::new(&connection),
        user_id,
        &user.email,
        &form.email,
    ) {
        Ok(pairing) => {
            tracing::info!(
                "User {user_id} added a partner, pending: {}",
                pairing.is_pending()
            );
            (
                HxRedirect(endpoints::PARTNER_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ (Error::InvalidEmail(_) | Error::SelfPairing | Error::DuplicatePairing)) => {
            add_partner_form(&form.email, Some(&error.to_string())).into_response()
        }
        Err(error) => {
            tracing::error!("Could not add partner for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Stop combining the logged in user's ledger with their partner's.
pub async fn remove_partner_endpoint(
    State(state): State<PartnerState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match SQLitePairingStore::new(&connection).clear(user_id) {
        Ok(()) => {
            tracing::info!("User {user_id} removed their partner");
            (HxRedirect(endpoints::PARTNER_VIEW.to_owned()), StatusCode::OK).into_response()
        }
        Err(error) => {
            tracing::error!("Could not remove partner of user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}
