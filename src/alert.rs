//! Error messages swapped into the page's alert container.
//!
//! Forms target `#alert-container` with `hx-target-error`, so an alert
//! returned with an error status replaces the container's contents.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

/// A dismissable error message shown at the bottom of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// What failed.
    pub message: String,
    /// What to do about it. Not shown when empty.
    pub details: String,
}

impl Alert {
    pub fn into_markup(self) -> Markup {
        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div
                    role="alert"
                    class="flex items-start gap-3 p-4 mb-4 text-sm border rounded-lg \
                        text-red-800 bg-red-50 border-red-300 dark:bg-gray-800 \
                        dark:text-red-400 dark:border-red-800"
                {
                    div class="flex-1"
                    {
                        p class="font-semibold" { (self.message) }

                        @if !self.details.is_empty() {
                            p class="mt-1" { (self.details) }
                        }
                    }

                    button
                        type="button"
                        aria-label="Close"
                        class="ms-auto font-bold"
                        onclick="this.closest('#alert-container').classList.add('hidden')"
                    {
                        "×"
                    }
                }
            }
        }
    }

    pub fn into_html(self) -> Html<String> {
        Html(self.into_markup().into_string())
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use crate::test_utils::select_texts;

    use super::Alert;

    fn paragraphs(alert: Alert) -> Vec<String> {
        let html = Html::parse_fragment(&alert.into_markup().into_string());

        select_texts(&html, "div[role=alert] p")
    }

    #[test]
    fn alert_shows_message_and_details() {
        let alert = Alert {
            message: "Could not save".to_owned(),
            details: "Amount must be a positive number.".to_owned(),
        };

        assert_eq!(
            paragraphs(alert),
            ["Could not save", "Amount must be a positive number."]
        );
    }

    #[test]
    fn empty_details_are_not_shown() {
        let alert = Alert {
            message: "Something went wrong".to_owned(),
            details: String::new(),
        };

        assert_eq!(paragraphs(alert), ["Something went wrong"]);
    }
}
