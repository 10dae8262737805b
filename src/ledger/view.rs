//! HTML rendering for the month page.

use maud::{Markup, html};
use time::{
    Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, BUTTON_DELETE_STYLE, CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base,
        format_currency, mask_currency,
    },
    ledger::{
        aggregation::{DayBucket, MonthTotals},
        models::{Transaction, TransactionKind},
        month::{MonthNavigation, ViewMonth},
    },
    navigation::NavBar,
    pairing::Pairing,
    timezone::LocalTimezone,
};

/// The max number of graphemes of a note to show in a row before truncating
/// it and showing the full note as a tooltip.
const MAX_NOTE_GRAPHEMES: usize = 32;

const DAY_LABEL_FORMAT: &[BorrowedFormatItem] =
    format_description!("[weekday repr:short], [day padding:none] [month repr:short]");

const DATE_ATTRIBUTE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month repr:numerical padding:zero]-[day padding:zero]");

const TIME_LABEL_FORMAT: &[BorrowedFormatItem] =
    format_description!("[hour repr:12 padding:none]:[minute] [period]");

/// The month page of `kind` for the current month.
pub(crate) fn kind_view(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Expense => endpoints::EXPENSES_VIEW,
        TransactionKind::Income => endpoints::INCOME_VIEW,
    }
}

/// The URL of the month page for `kind` showing `month`.
pub(crate) fn ledger_url(kind: TransactionKind, month: ViewMonth) -> String {
    format!(
        "{}?month={}",
        format_endpoint(endpoints::LEDGER_VIEW, kind.path_segment()),
        month.query_value()
    )
}

/// The URL used to edit, update or delete the entry `id` of `kind`.
pub(crate) fn transaction_api_url(kind: TransactionKind, id: i64) -> String {
    format_endpoint(
        &format_endpoint(endpoints::TRANSACTION_API, kind.path_segment()),
        id,
    )
}

fn edit_url(kind: TransactionKind, id: i64) -> String {
    format_endpoint(
        &format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, kind.path_segment()),
        id,
    )
}

/// The entries of the month page, or a note that they could not be loaded.
#[derive(Debug)]
pub(crate) enum LedgerContent<'a> {
    Loaded {
        totals: MonthTotals,
        days: Vec<DayBucket<'a>>,
    },
    Failed,
}

/// Everything needed to render the month page.
#[derive(Debug)]
pub(crate) struct LedgerPageView<'a> {
    pub kind: TransactionKind,
    pub navigation: MonthNavigation,
    pub pairing: Option<&'a Pairing>,
    pub net_hidden: bool,
    pub local_timezone: &'a LocalTimezone,
    pub content: LedgerContent<'a>,
}

pub(crate) fn ledger_page_view(view: LedgerPageView) -> Markup {
    let nav_bar = NavBar::new(kind_view(view.kind)).into_html();
    let new_transaction_url =
        format_endpoint(endpoints::NEW_TRANSACTION_VIEW, view.kind.path_segment());

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div id="ledger-container" class="w-full max-w-3xl"
            {
                section id="ledger" class="space-y-4"
                {
                    (month_header(view.kind, &view.navigation))

                    (kind_tabs(view.kind, view.navigation.month))

                    (pairing_status(view.pairing))

                    @match &view.content {
                        LedgerContent::Loaded { totals, days } => {
                            (totals_card(totals, view.net_hidden))

                            div class="flex justify-end"
                            {
                                a href=(new_transaction_url) class=(LINK_STYLE)
                                {
                                    "Add " (view.kind.noun())
                                }
                            }

                            @if days.is_empty() {
                                (empty_state(view.kind, &new_transaction_url))
                            } @else {
                                @for day in days {
                                    (day_section(day, view.navigation.month, view.local_timezone))
                                }
                            }
                        },
                        LedgerContent::Failed => {
                            (error_state(view.kind, view.navigation.month))
                        },
                    }
                }
            }
        }
    };

    base(view.kind.title(), &content)
}

/// A link that swaps in the month page for another month.
///
/// An in-flight month request is replaced by a newer one, so the last month
/// clicked is the one shown.
fn month_link(href: &str, text: &str) -> Markup {
    html! {
        a
            href=(href)
            hx-get=(href)
            hx-target="#ledger"
            hx-select="#ledger"
            hx-swap="outerHTML"
            hx-push-url="true"
            hx-sync="#ledger-container:replace"
            role="button"
            class="inline-flex items-center rounded px-2 py-1 text-sm text-blue-600 hover:underline"
        {
            (text)
        }
    }
}

fn month_header(kind: TransactionKind, navigation: &MonthNavigation) -> Markup {
    let previous_url = navigation.previous.map(|month| ledger_url(kind, month));
    let next_url = navigation.next.map(|month| ledger_url(kind, month));
    let current_url = ledger_url(kind, navigation.current);

    html! {
        nav class="flex items-center justify-between w-full" aria-label="Months"
        {
            div
            {
                @if let Some(previous_url) = previous_url {
                    (month_link(&previous_url, "Prev"))
                } @else {
                    span class="inline-flex items-center rounded px-2 py-1 text-sm text-gray-400 dark:text-gray-500"
                    { "Prev" }
                }
            }

            div class="flex flex-col items-center"
            {
                h1 class="text-xl font-bold" aria-current="page"
                {
                    time datetime=(navigation.month.query_value()) { (navigation.month.label()) }
                }

                @if !navigation.is_current() {
                    (month_link(&current_url, "This month"))
                }
            }

            div
            {
                @if let Some(next_url) = next_url {
                    (month_link(&next_url, "Next"))
                } @else {
                    span
                        aria-disabled="true"
                        class="inline-flex items-center rounded px-2 py-1 text-sm text-gray-400 dark:text-gray-500"
                    { "Next" }
                }
            }
        }
    }
}

fn kind_tabs(active: TransactionKind, month: ViewMonth) -> Markup {
    let tab_class = |kind: TransactionKind| {
        if kind == active {
            "flex-1 text-center px-4 py-2 rounded-lg bg-blue-50 text-blue-700 \
            font-semibold dark:bg-blue-900/30 dark:text-blue-200"
        } else {
            "flex-1 text-center px-4 py-2 rounded-lg text-gray-600 \
            hover:bg-blue-50/70 hover:text-blue-700 dark:text-gray-300 \
            dark:hover:bg-blue-900/20 dark:hover:text-blue-200"
        }
    };

    html! {
        div class="flex gap-2 w-full" role="tablist"
        {
            @for kind in [TransactionKind::Expense, TransactionKind::Income] {
                a
                    href=(ledger_url(kind, month))
                    role="tab"
                    aria-selected=(kind == active)
                    class=(tab_class(kind))
                {
                    (kind.title())
                }
            }
        }
    }
}

fn pairing_status(pairing: Option<&Pairing>) -> Markup {
    html! {
        @if let Some(pairing) = pairing {
            p id="pairing-status" class="text-sm text-gray-600 dark:text-gray-400"
            {
                @if pairing.is_pending() {
                    "Waiting for " (pairing.partner_email) " to sign up"
                } @else {
                    "Combined with " (pairing.partner_email)
                }
            }
        }
    }
}

fn totals_card(totals: &MonthTotals, net_hidden: bool) -> Markup {
    let net = if net_hidden {
        mask_currency(totals.net)
    } else {
        format_currency(totals.net)
    };
    let toggle_label = if net_hidden { "Show net" } else { "Hide net" };

    html! {
        section id="month-totals" class=(CARD_STYLE)
        {
            dl class="grid grid-cols-3 gap-4 text-center"
            {
                div
                {
                    dt class="text-xs uppercase text-gray-500 dark:text-gray-400" { "Income" }
                    dd class="text-lg font-semibold tabular-nums text-green-700 dark:text-green-300"
                    { (format_currency(totals.income)) }
                }

                div
                {
                    dt class="text-xs uppercase text-gray-500 dark:text-gray-400" { "Expenses" }
                    dd class="text-lg font-semibold tabular-nums text-red-700 dark:text-red-300"
                    { (format_currency(totals.expenses)) }
                }

                div
                {
                    dt class="text-xs uppercase text-gray-500 dark:text-gray-400" { "Net" }
                    dd id="month-net" class="text-lg font-semibold tabular-nums" { (net) }
                }
            }

            div class="flex justify-end mt-2"
            {
                button
                    type="button"
                    hx-post=(endpoints::NET_HIDDEN_API)
                    hx-swap="none"
                    hx-target-error="#alert-container"
                    class=(LINK_STYLE)
                {
                    (toggle_label)
                }
            }
        }
    }
}

fn empty_state(kind: TransactionKind, new_transaction_url: &str) -> Markup {
    html! {
        div id="empty-state" class="text-center py-8 text-gray-600 dark:text-gray-400"
        {
            p { "No " (kind.title().to_lowercase()) " this month." }

            a href=(new_transaction_url) class=(LINK_STYLE) { "Add your first " (kind.noun()) }
        }
    }
}

fn error_state(kind: TransactionKind, month: ViewMonth) -> Markup {
    html! {
        div id="ledger-error" role="alert" class="text-center py-8"
        {
            p class="text-lg font-semibold text-red-700 dark:text-red-400"
            {
                "Could not load your " (kind.title().to_lowercase())
            }

            p class="text-gray-600 dark:text-gray-400"
            {
                "Try again in a moment, or check the server logs if this keeps happening."
            }

            a href=(ledger_url(kind, month)) class=(LINK_STYLE) { "Try again" }
        }
    }
}

fn day_label(date: Date) -> Markup {
    let datetime = date
        .format(DATE_ATTRIBUTE_FORMAT)
        .unwrap_or_else(|_| date.to_string());
    let label = date
        .format(DAY_LABEL_FORMAT)
        .unwrap_or_else(|_| date.to_string());

    html! {
        time datetime=(datetime) { (label) }
    }
}

fn time_label(timestamp: OffsetDateTime, local_timezone: &LocalTimezone) -> String {
    let local = local_timezone.to_local(timestamp);

    local
        .format(TIME_LABEL_FORMAT)
        .unwrap_or_else(|_| local.time().to_string())
}

fn day_section(day: &DayBucket, month: ViewMonth, local_timezone: &LocalTimezone) -> Markup {
    html! {
        section class=(CARD_STYLE) data-day-section="true"
        {
            header class="flex flex-wrap items-baseline justify-between gap-2 pb-2 border-b border-gray-200 dark:border-gray-700"
            {
                h2 class="text-sm font-semibold uppercase text-gray-600 dark:text-gray-300"
                {
                    (day_label(day.date))
                }

                dl class="flex gap-3 text-xs tabular-nums text-gray-600 dark:text-gray-400"
                {
                    div { dt class="inline" { "In " } dd class="inline" data-summary="in" { (format_currency(day.income_today)) } }
                    div { dt class="inline" { "Spent " } dd class="inline" data-summary="spent" { (format_currency(day.spent_today)) } }
                    div { dt class="inline" { "Start " } dd class="inline" data-summary="start" { (format_currency(day.start_balance)) } }
                    div { dt class="inline" { "Net " } dd class="inline" data-summary="net" { (format_currency(day.end_balance)) } }
                }
            }

            ul class="divide-y divide-gray-200 dark:divide-gray-700"
            {
                @for transaction in &day.items {
                    (transaction_row(transaction, month, local_timezone))
                }
            }
        }
    }
}

fn truncate_note(note: &str) -> (String, Option<&str>) {
    if note.graphemes(true).count() <= MAX_NOTE_GRAPHEMES {
        (note.to_owned(), None)
    } else {
        let truncated: String = note.graphemes(true).take(MAX_NOTE_GRAPHEMES - 3).collect();
        (truncated + "...", Some(note))
    }
}

fn transaction_row(
    transaction: &Transaction,
    month: ViewMonth,
    local_timezone: &LocalTimezone,
) -> Markup {
    let amount_class = match transaction.kind {
        TransactionKind::Expense => "text-red-700 dark:text-red-300",
        TransactionKind::Income => "text-green-700 dark:text-green-300",
    };
    let note = transaction.note.as_deref().map(truncate_note);

    html! {
        li class="py-3" data-transaction-row="true"
        {
            div class="flex items-start justify-between gap-3"
            {
                div class="min-w-0 flex-1"
                {
                    p class="text-sm font-medium text-gray-900 dark:text-white"
                    {
                        (transaction.category.label())
                        " · "
                        (transaction.account.label())
                    }

                    @if let Some((note, full_note)) = note {
                        p class="text-sm text-gray-600 dark:text-gray-400 truncate" title=[full_note]
                        { (note) }
                    }

                    p class="text-xs text-gray-500 dark:text-gray-400"
                    {
                        (time_label(transaction.timestamp, local_timezone))
                    }
                }

                div class="flex flex-col items-end gap-1"
                {
                    span class={ "text-sm tabular-nums whitespace-nowrap " (amount_class) }
                    {
                        (format_currency(transaction.amount))
                    }

                    @if let Some(partner_email) = transaction.spouse_label() {
                        span class=(BADGE_STYLE) data-spouse-badge="true" { (partner_email) }
                    } @else {
                        div class="flex gap-4 text-sm"
                        {
                            a href=(edit_url(transaction.kind, transaction.id)) class=(LINK_STYLE)
                            {
                                "Edit"
                            }

                            button
                                type="button"
                                hx-delete={
                                    (transaction_api_url(transaction.kind, transaction.id))
                                    "?month=" (month.query_value())
                                }
                                hx-confirm={
                                    "Are you sure you want to delete this "
                                    (transaction.kind.noun()) "? This cannot be undone."
                                }
                                hx-swap="none"
                                hx-target-error="#alert-container"
                                class=(BUTTON_DELETE_STYLE)
                            {
                                "Delete"
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};
    use time::macros::{date, datetime};

    use crate::{
        auth::UserID,
        ledger::{
            aggregation::{MonthTotals, summarize_days},
            models::{Account, Category, Ownership, Transaction, TransactionKind},
            month::{MonthNavigation, ViewMonth},
        },
        money::Amount,
        pairing::Pairing,
        test_utils::{assert_valid_html, select_texts},
        timezone::LocalTimezone,
    };

    use super::{LedgerContent, LedgerPageView, ledger_page_view, ledger_url, truncate_note};

    fn manila() -> LocalTimezone {
        LocalTimezone::from_name("Asia/Manila").unwrap()
    }

    fn august() -> ViewMonth {
        "2025-08".parse().unwrap()
    }

    fn expense(id: i64, pesos: i64, ownership: Ownership) -> Transaction {
        Transaction {
            id,
            kind: TransactionKind::Expense,
            owner_id: UserID::new(1),
            amount: Amount::from_major_units(pesos),
            account: Account::GCash,
            category: Category::Food,
            note: Some("lunch".to_owned()),
            timestamp: datetime!(2025-08-14 04:30 UTC),
            ownership,
        }
    }

    fn render(view: LedgerPageView) -> Html {
        let html = Html::parse_document(&ledger_page_view(view).into_string());
        assert_valid_html(&html);
        html
    }

    #[test]
    fn spouse_rows_have_badge_and_no_controls() {
        let tz = manila();
        let expenses = vec![
            expense(1, 100, Ownership::Own),
            expense(2, 50, Ownership::Spouse {
                email: "bob@example.com".to_owned(),
            }),
        ];
        let days = summarize_days(TransactionKind::Expense, &expenses, &[], &tz);

        let html = render(LedgerPageView {
            kind: TransactionKind::Expense,
            navigation: MonthNavigation::new(august(), august()),
            pairing: None,
            net_hidden: false,
            local_timezone: &tz,
            content: LedgerContent::Loaded {
                totals: MonthTotals::default(),
                days,
            },
        });

        let rows = Selector::parse("li[data-transaction-row]").unwrap();
        let delete = Selector::parse("button[hx-delete]").unwrap();
        let badge = Selector::parse("[data-spouse-badge]").unwrap();
        let rows = html.select(&rows).collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);

        let own_row = rows
            .iter()
            .find(|row| row.select(&badge).next().is_none())
            .unwrap();
        let delete_url = own_row
            .select(&delete)
            .next()
            .unwrap()
            .value()
            .attr("hx-delete")
            .unwrap();
        assert_eq!(delete_url, "/api/ledger/expenses/1?month=2025-08");

        let spouse_row = rows
            .iter()
            .find(|row| row.select(&badge).next().is_some())
            .unwrap();
        assert!(spouse_row.select(&delete).next().is_none());
        assert_eq!(
            spouse_row
                .select(&badge)
                .next()
                .unwrap()
                .text()
                .collect::<String>(),
            "bob@example.com"
        );
    }

    #[test]
    fn day_header_shows_running_balance() {
        let tz = manila();
        let expenses = vec![expense(1, 100, Ownership::Own)];
        let mut salary = expense(2, 1_000, Ownership::Own);
        salary.kind = TransactionKind::Income;
        salary.category = Category::Salary;
        let incomes = vec![salary];
        let days = summarize_days(TransactionKind::Expense, &expenses, &incomes, &tz);

        let html = render(LedgerPageView {
            kind: TransactionKind::Expense,
            navigation: MonthNavigation::new(august(), august()),
            pairing: None,
            net_hidden: false,
            local_timezone: &tz,
            content: LedgerContent::Loaded {
                totals: MonthTotals::default(),
                days,
            },
        });

        assert_eq!(select_texts(&html, "dd[data-summary=in]"), ["₱1,000.00"]);
        assert_eq!(select_texts(&html, "dd[data-summary=spent]"), ["₱100.00"]);
        assert_eq!(select_texts(&html, "dd[data-summary=start]"), ["₱1,000.00"]);
        assert_eq!(select_texts(&html, "dd[data-summary=net]"), ["₱900.00"]);
        assert_eq!(select_texts(&html, "section[data-day-section] h2"), ["Thu, 14 Aug"]);
    }

    #[test]
    fn net_is_masked_when_hidden() {
        let tz = manila();
        let totals = MonthTotals {
            income: Amount::from_major_units(2_000),
            expenses: Amount::from_minor_units(75_050),
            net: Amount::from_minor_units(124_950),
        };

        let html = render(LedgerPageView {
            kind: TransactionKind::Income,
            navigation: MonthNavigation::new(august(), august()),
            pairing: None,
            net_hidden: true,
            local_timezone: &tz,
            content: LedgerContent::Loaded {
                totals,
                days: Vec::new(),
            },
        });

        assert_eq!(select_texts(&html, "#month-net"), ["₱*,***"]);
        assert_eq!(select_texts(&html, "#month-totals button"), ["Show net"]);
        assert_eq!(select_texts(&html, "#empty-state p"), ["No income this month."]);
    }

    #[test]
    fn next_month_is_disabled_for_current_month() {
        let tz = manila();

        let html = render(LedgerPageView {
            kind: TransactionKind::Expense,
            navigation: MonthNavigation::new(august(), august()),
            pairing: None,
            net_hidden: false,
            local_timezone: &tz,
            content: LedgerContent::Loaded {
                totals: MonthTotals::default(),
                days: Vec::new(),
            },
        });

        let links = html
            .select(&Selector::parse("nav[aria-label=Months] a").unwrap())
            .map(|link| {
                (
                    link.text().collect::<String>().trim().to_owned(),
                    link.value().attr("hx-sync").unwrap_or_default().to_owned(),
                )
            })
            .collect::<Vec<_>>();

        assert_eq!(
            links,
            [("Prev".to_owned(), "#ledger-container:replace".to_owned())]
        );
        assert_eq!(
            select_texts(&html, "nav[aria-label=Months] span[aria-disabled]"),
            ["Next"]
        );
    }

    #[test]
    fn failed_fetch_replaces_the_list_with_an_error() {
        let tz = manila();
        let pairing = Pairing {
            owner_id: UserID::new(1),
            partner_email: "bob@example.com".to_owned(),
            resolved_partner_id: None,
        };

        let html = render(LedgerPageView {
            kind: TransactionKind::Expense,
            navigation: MonthNavigation::new(august(), "2025-10".parse().unwrap()),
            pairing: Some(&pairing),
            net_hidden: false,
            local_timezone: &tz,
            content: LedgerContent::Failed,
        });

        assert_eq!(
            select_texts(&html, "#ledger-error p")[0],
            "Could not load your expenses"
        );
        assert!(select_texts(&html, "#month-totals").is_empty());
        assert_eq!(
            select_texts(&html, "#pairing-status"),
            ["Waiting for bob@example.com to sign up"]
        );
    }

    #[test]
    fn ledger_url_includes_month() {
        assert_eq!(
            ledger_url(
                TransactionKind::Income,
                ViewMonth::containing(date!(2025 - 01 - 20))
            ),
            "/ledger/income?month=2025-01"
        );
    }

    #[test]
    fn long_notes_are_truncated() {
        let note = "a".repeat(40);

        let (truncated, full) = truncate_note(&note);

        assert_eq!(truncated, format!("{}...", "a".repeat(29)));
        assert_eq!(full, Some(note.as_str()));
        assert_eq!(truncate_note("lunch"), ("lunch".to_owned(), None));
    }
}
