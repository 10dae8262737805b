//! The form used to create and edit expenses and income.

use maud::{Markup, html};
use serde::Deserialize;
use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{
    endpoints::{self, format_endpoint},
    html::{
        FORM_CONTAINER_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, base, submit_button,
    },
    ledger::{
        models::{
            ACCOUNTS, Account, Transaction, TransactionFields, TransactionId, TransactionKind,
        },
        view::kind_view,
    },
    money::Amount,
    navigation::NavBar,
    timezone::LocalTimezone,
};

/// The value format of `<input type="datetime-local">`.
const DATETIME_LOCAL_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");

/// Browsers may add seconds to a `datetime-local` value.
const DATETIME_LOCAL_WITH_SECONDS_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Format `instant` in local time for a `datetime-local` input.
pub(crate) fn format_datetime_local(
    instant: OffsetDateTime,
    local_timezone: &LocalTimezone,
) -> String {
    let local = local_timezone.to_local(instant);

    local.format(DATETIME_LOCAL_FORMAT).unwrap_or_else(|error| {
        tracing::error!("could not format {local} for a datetime-local input: {error}");
        String::new()
    })
}

fn parse_datetime_local(text: &str) -> Option<PrimitiveDateTime> {
    let text = text.trim();

    PrimitiveDateTime::parse(text, DATETIME_LOCAL_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(text, DATETIME_LOCAL_WITH_SECONDS_FORMAT))
        .ok()
}

/// The raw values submitted by the transaction form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionForm {
    /// The amount as typed by the user, e.g. "1,250.50".
    pub amount: String,
    /// The stored value of an [Account].
    pub account: String,
    /// The stored value of a [Category](crate::ledger::Category).
    pub category: String,
    /// A `datetime-local` value in the viewer's timezone.
    pub timestamp: String,
    /// An optional label. Browsers leave out empty fields of some forms.
    #[serde(default)]
    pub note: String,
}

/// Error messages for the fields of the transaction form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FieldErrors {
    pub amount: Option<String>,
    pub account: Option<String>,
    pub category: Option<String>,
    pub timestamp: Option<String>,
}

impl FieldErrors {
    fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.account.is_none()
            && self.category.is_none()
            && self.timestamp.is_none()
    }
}

impl TransactionForm {
    /// The form prefilled for a new entry of `kind`: GCash, the first
    /// category of the kind and the current local time.
    pub(crate) fn defaults(kind: TransactionKind, local_timezone: &LocalTimezone) -> Self {
        Self {
            amount: String::new(),
            account: Account::GCash.as_str().to_owned(),
            category: kind
                .categories()
                .first()
                .map(|category| category.as_str().to_owned())
                .unwrap_or_default(),
            timestamp: format_datetime_local(OffsetDateTime::now_utc(), local_timezone),
            note: String::new(),
        }
    }

    /// The form prefilled with an existing entry.
    pub(crate) fn from_transaction(
        transaction: &Transaction,
        local_timezone: &LocalTimezone,
    ) -> Self {
        Self {
            amount: transaction.amount.to_string(),
            account: transaction.account.as_str().to_owned(),
            category: transaction.category.as_str().to_owned(),
            timestamp: format_datetime_local(transaction.timestamp, local_timezone),
            note: transaction.note.clone().unwrap_or_default(),
        }
    }

    /// Read the submitted values as the fields of an entry of `kind`.
    ///
    /// # Errors
    /// Returns a message for every field that is invalid.
    pub(crate) fn parse(
        &self,
        kind: TransactionKind,
        local_timezone: &LocalTimezone,
    ) -> Result<TransactionFields, FieldErrors> {
        let mut errors = FieldErrors::default();

        let amount = Amount::parse_positive(&self.amount)
            .inspect_err(|error| errors.amount = Some(error.to_string()))
            .ok();

        let account = self
            .account
            .parse::<Account>()
            .inspect_err(|_| errors.account = Some("Choose an account.".to_owned()))
            .ok();

        let category = kind
            .categories()
            .iter()
            .copied()
            .find(|category| category.as_str() == self.category);
        if category.is_none() {
            errors.category = Some(format!("Choose a category for this {}.", kind.noun()));
        }

        let timestamp = parse_datetime_local(&self.timestamp)
            .map(|local| local_timezone.from_local(local));
        if timestamp.is_none() {
            errors.timestamp = Some("Enter a valid date and time.".to_owned());
        }

        match (amount, account, category, timestamp) {
            (Some(amount), Some(account), Some(category), Some(timestamp)) if errors.is_empty() => {
                Ok(TransactionFields {
                    amount,
                    account,
                    category,
                    note: Some(self.note.trim().to_owned()).filter(|note| !note.is_empty()),
                    timestamp,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Whether the form creates a new entry or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormMode {
    Create,
    Edit(TransactionId),
}

fn field_error(error: Option<&str>) -> Markup {
    html! {
        @if let Some(error) = error {
            p class=(FORM_ERROR_STYLE) { (error) }
        }
    }
}

/// The transaction form. Submitting it replaces the form, so a response with
/// inline errors is shown in place.
pub(crate) fn transaction_form(
    kind: TransactionKind,
    mode: FormMode,
    values: &TransactionForm,
    errors: &FieldErrors,
) -> Markup {
    let kind_endpoint = format_endpoint(endpoints::TRANSACTIONS_API, kind.path_segment());
    let (hx_post, hx_put, button_text) = match mode {
        FormMode::Create => (Some(kind_endpoint), None, format!("Add {}", kind.noun())),
        FormMode::Edit(id) => (
            None,
            Some(format_endpoint(
                &format_endpoint(endpoints::TRANSACTION_API, kind.path_segment()),
                id,
            )),
            "Save changes".to_owned(),
        ),
    };

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-target="this"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    name="amount"
                    id="amount"
                    type="text"
                    inputmode="decimal"
                    placeholder="0.00"
                    required
                    autofocus
                    value=(values.amount)
                    class=(FORM_TEXT_INPUT_STYLE);

                (field_error(errors.amount.as_deref()))
            }

            div
            {
                label for="account" class=(FORM_LABEL_STYLE) { "Account" }

                select name="account" id="account" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for account in ACCOUNTS {
                        option
                            value=(account.as_str())
                            selected[account.as_str() == values.account]
                        {
                            (account.label())
                        }
                    }
                }

                (field_error(errors.account.as_deref()))
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for category in kind.categories() {
                        option
                            value=(category.as_str())
                            selected[category.as_str() == values.category]
                        {
                            (category.label())
                        }
                    }
                }

                (field_error(errors.category.as_deref()))
            }

            div
            {
                label for="timestamp" class=(FORM_LABEL_STYLE) { "Date and time" }

                input
                    name="timestamp"
                    id="timestamp"
                    type="datetime-local"
                    required
                    value=(values.timestamp)
                    class=(FORM_TEXT_INPUT_STYLE);

                (field_error(errors.timestamp.as_deref()))
            }

            div
            {
                label for="note" class=(FORM_LABEL_STYLE) { "Note" }

                input
                    name="note"
                    id="note"
                    type="text"
                    placeholder="Optional"
                    value=(values.note)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (submit_button(&button_text))
        }
    }
}

/// The page that holds the transaction form.
pub(crate) fn transaction_form_page(kind: TransactionKind, heading: &str, form: &Markup) -> Markup {
    let back_url = kind_view(kind);
    let nav_bar = NavBar::new(back_url).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { (heading) }

                (form)

                a href=(back_url) class=(LINK_STYLE) { "Back to " (kind.title().to_lowercase()) }
            }
        }
    };

    base(heading, &content)
}
