//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/ledger/{kind}/{id}', use [format_endpoint].

use std::fmt::Display;

/// The root route which redirects to the expenses page.
pub const ROOT: &str = "/";
/// The month page for expenses or income, `kind` is "expenses" or "income".
pub const LEDGER_VIEW: &str = "/ledger/{kind}";
/// The month page for expenses.
pub const EXPENSES_VIEW: &str = "/ledger/expenses";
/// The month page for income.
pub const INCOME_VIEW: &str = "/ledger/income";
/// The page for adding an expense or income entry.
pub const NEW_TRANSACTION_VIEW: &str = "/ledger/{kind}/new";
/// The page for editing an expense or income entry.
pub const EDIT_TRANSACTION_VIEW: &str = "/ledger/{kind}/{id}/edit";
/// The page for adding or removing a partner.
pub const PARTNER_VIEW: &str = "/partner";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to create users.
pub const USERS: &str = "/api/users";
/// The route to create expense or income entries.
pub const TRANSACTIONS_API: &str = "/api/ledger/{kind}";
/// The route to update or delete a single expense or income entry.
pub const TRANSACTION_API: &str = "/api/ledger/{kind}/{id}";
/// The route to add or remove the current user's partner.
pub const PARTNER_API: &str = "/api/partner";
/// The route to show or hide the net amount on the month page.
pub const NET_HIDDEN_API: &str = "/api/preferences/net-hidden";

/// Replace the first parameter in `endpoint_path` with `value`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/ledger/{kind}', '{kind}' is the parameter.
///
/// Call this function once per parameter, in order, for paths with more than
/// one parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, value: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        value,
        &endpoint_path[param_end..]
    )
}
