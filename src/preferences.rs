//! Display preferences kept in the browser.
//!
//! The only preference is whether the month's net amount is masked. It is
//! stored per user in a plain cookie, so it survives logging out and back in
//! on the same device.

use axum::{
    Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use axum_htmx::HxRefresh;
use time::Duration;

use crate::auth::UserID;

/// How long the browser keeps the preference after it was last changed.
const PREFERENCE_COOKIE_DURATION: Duration = Duration::days(365);

fn net_hidden_cookie_name(user_id: UserID) -> String {
    format!("net_hidden_{user_id}")
}

/// Whether `user_id` has chosen to hide the month's net amount.
///
/// Defaults to shown when the cookie is missing.
pub(crate) fn is_net_hidden(jar: &CookieJar, user_id: UserID) -> bool {
    jar.get(&net_hidden_cookie_name(user_id))
        .is_some_and(|cookie| cookie.value() == "true")
}

/// Flip the net-hidden preference of `user_id` in `jar`.
pub(crate) fn toggle_net_hidden_cookie(jar: CookieJar, user_id: UserID) -> CookieJar {
    let name = net_hidden_cookie_name(user_id);

    if is_net_hidden(&jar, user_id) {
        jar.remove(Cookie::build(name).path("/"))
    } else {
        jar.add(
            Cookie::build((name, "true"))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Strict)
                .max_age(PREFERENCE_COOKIE_DURATION),
        )
    }
}

/// Toggle whether the month's net amount is masked and refresh the page.
pub async fn toggle_net_hidden(
    Extension(user_id): Extension<UserID>,
    jar: CookieJar,
) -> Response {
    let jar = toggle_net_hidden_cookie(jar, user_id);

    tracing::debug!(
        "User {user_id} set net hidden to {}",
        is_net_hidden(&jar, user_id)
    );

    (StatusCode::OK, HxRefresh(true), jar).into_response()
}
