//! The registration page and the endpoint that creates accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{PasswordHash, ValidatedPassword, create_user, normalize_email, set_auth_cookie},
    endpoints,
    html::{
        FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, email_input,
        log_in_register, password_input, submit_button,
    },
    internal_server_error::get_internal_server_error_redirect,
    timezone::LocalTimezone,
};

/// The minimum number of characters the password should have to be considered
/// valid on the client side. The server checks the password's strength as well.
const PASSWORD_INPUT_MIN_LENGTH: u8 = 14;

fn confirm_password_input(error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label for="confirm-password" class=(FORM_LABEL_STYLE) { "Confirm Password" }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(PASSWORD_INPUT_MIN_LENGTH)
                autofocus[error_message.is_some()];

            @if let Some(error_message) = error_message
            {
                p class=(FORM_ERROR_STYLE) { (error_message) }
            }
        }
    }
}

/// Error messages for the fields of the registration form.
#[derive(Debug, Default)]
struct FormErrors<'a> {
    email: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn registration_form(email: &str, password: &str, errors: FormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #confirm-password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (email_input(email, errors.email))
            (password_input(password, PASSWORD_INPUT_MIN_LENGTH, errors.password))
            (confirm_password_input(errors.confirm_password))
            (submit_button("Create Account"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let form = registration_form("", "", FormErrors::default());
    let content = log_in_register("Create an account", &form);

    base("Register", &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The timezone cookie expiry times are written in.
    pub local_timezone: LocalTimezone,
    /// The database connection for storing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the registration form.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Create an account and log the new user in.
///
/// The form is returned with error messages if the email is invalid or taken,
/// the password is too weak, or the passwords do not match.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let email = normalize_email(&user_data.email);

    if !email_address::EmailAddress::is_valid(&email) {
        return registration_form(
            &user_data.email,
            &user_data.password,
            FormErrors {
                email: Some("Enter a valid email address."),
                ..Default::default()
            },
        )
        .into_response();
    }

    let validated_password = match ValidatedPassword::new(&user_data.password, &[&email]) {
        Ok(password) => password,
        Err(error) => {
            return registration_form(
                &user_data.email,
                &user_data.password,
                FormErrors {
                    password: Some(&error.to_string()),
                    ..Default::default()
                },
            )
            .into_response();
        }
    };

    if user_data.password != user_data.confirm_password {
        return registration_form(
            &user_data.email,
            &user_data.password,
            FormErrors {
                confirm_password: Some("Passwords do not match"),
                ..Default::default()
            },
        )
        .into_response();
    }

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return get_internal_server_error_redirect();
        }
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return get_internal_server_error_redirect();
            }
        };

        create_user(&email, password_hash, &connection)
    };

    let user = match user {
        Ok(user) => user,
        Err(Error::DuplicateEmail) => {
            return registration_form(
                &user_data.email,
                &user_data.password,
                FormErrors {
                    email: Some("An account with that email already exists, try logging in."),
                    ..Default::default()
                },
            )
            .into_response();
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            return get_internal_server_error_redirect();
        }
    };

    tracing::info!("Registered user {}", user.id);

    match set_auth_cookie(
        jar,
        user.id,
        state.cookie_duration,
        state.local_timezone.current_offset(),
    ) {
        Ok(jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
            jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An error occurred while setting the auth cookie: {error}");
            get_internal_server_error_redirect()
        }
    }
}


#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::post};
    use axum_htmx::HX_REDIRECT;
    use axum_test::{TestResponse, TestServer};
    use rusqlite::Connection;
    use scraper::{Html, Selector};

    use crate::{
        PasswordHash,
        app_state::create_cookie_key,
        auth::{COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, create_user, get_user_by_email},
        db::initialize,
        endpoints,
        timezone::LocalTimezone,
    };

    use super::{RegistrationState, register_user};

    const STRONG_PASSWORD: &str = "iamtestingwhethericancreateanewuser";

    fn get_test_server() -> (TestServer, Arc<Mutex<Connection>>) {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        let connection = Arc::new(Mutex::new(connection));

        let state = RegistrationState {
            cookie_key: create_cookie_key("42"),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: LocalTimezone::from_name("Asia/Manila").unwrap(),
            db_connection: connection.clone(),
        };
        let app = Router::new()
            .route(endpoints::USERS, post(register_user))
            .with_state(state);

        (
            TestServer::new(app).expect("Could not create test server."),
            connection,
        )
    }

    #[track_caller]
    fn error_messages(response: &TestResponse) -> Vec<String> {
        Html::parse_fragment(&response.text())
            .select(&Selector::parse("p.text-red-500").unwrap())
            .map(|p| p.text().collect::<String>().trim().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn create_user_logs_in_and_redirects() {
        let (server, connection) = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .form(&[
                ("email", "Maria@Example.com"),
                ("password", STRONG_PASSWORD),
                ("confirm_password", STRONG_PASSWORD),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(HX_REDIRECT), endpoints::EXPENSES_VIEW);
        assert!(response.maybe_cookie(COOKIE_TOKEN).is_some());

        let user = get_user_by_email("maria@example.com", &connection.lock().unwrap()).unwrap();
        assert_eq!(user.password_hash.verify(STRONG_PASSWORD), Ok(true));
    }

    #[tokio::test]
    async fn rejects_invalid_email() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .form(&[
                ("email", "maria"),
                ("password", STRONG_PASSWORD),
                ("confirm_password", STRONG_PASSWORD),
            ])
            .await;

        response.assert_status_ok();
        assert_eq!(error_messages(&response), ["Enter a valid email address."]);
    }

    #[tokio::test]
    async fn rejects_weak_password() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .form(&[
                ("email", "maria@example.com"),
                ("password", "password1234"),
                ("confirm_password", "password1234"),
            ])
            .await;

        response.assert_status_ok();
        let messages = error_messages(&response);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("password is too weak"));
    }

    #[tokio::test]
    async fn rejects_mismatched_passwords() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .form(&[
                ("email", "maria@example.com"),
                ("password", STRONG_PASSWORD),
                ("confirm_password", "thisisadifferentpassword"),
            ])
            .await;

        response.assert_status_ok();
        assert_eq!(error_messages(&response), ["Passwords do not match"]);
    }

    #[tokio::test]
    async fn rejects_taken_email() {
        let (server, connection) = get_test_server();
        create_user(
            "maria@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &connection.lock().unwrap(),
        )
        .unwrap();

        let response = server
            .post(endpoints::USERS)
            .form(&[
                ("email", "MARIA@example.com"),
                ("password", STRONG_PASSWORD),
                ("confirm_password", STRONG_PASSWORD),
            ])
            .await;

        response.assert_status_ok();
        assert_eq!(
            error_messages(&response),
            ["An account with that email already exists, try logging in."]
        );
        assert!(response.maybe_cookie(COOKIE_TOKEN).is_none());
    }
}
