//! Groups a month of entries into days and works out the running balance for each day.
//!
//! Balances are accumulated over every day that has income or expenses, oldest
//! first, so that the expense and income tabs agree on the balance of any day.
//! Only days with entries of the displayed kind are returned.

use std::collections::{BTreeMap, BTreeSet};

use time::Date;

use crate::{
    ledger::models::{Transaction, TransactionKind},
    money::Amount,
    timezone::LocalTimezone,
};

/// The entries of one kind on one local calendar day, with the day's totals
/// and running balance.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket<'a> {
    /// The local calendar day.
    pub date: Date,
    /// The entries of the displayed kind on this day, newest first.
    pub items: Vec<&'a Transaction>,
    /// The sum of income on this day.
    pub income_today: Amount,
    /// The sum of expenses on this day.
    pub spent_today: Amount,
    /// Income up to and including today minus expenses before today.
    pub start_balance: Amount,
    /// The start balance minus today's expenses.
    pub end_balance: Amount,
}

/// Sum the amounts of `transactions` per local calendar day.
fn sum_by_day(
    transactions: &[Transaction],
    local_timezone: &LocalTimezone,
) -> BTreeMap<Date, Amount> {
    let mut sums = BTreeMap::new();

    for transaction in transactions {
        let date = local_timezone.local_date(transaction.timestamp);
        *sums.entry(date).or_insert(Amount::ZERO) += transaction.amount;
    }

    sums
}

/// Group `transactions` by local calendar day, newest first within each day.
fn group_by_day<'a>(
    transactions: &'a [Transaction],
    local_timezone: &LocalTimezone,
) -> BTreeMap<Date, Vec<&'a Transaction>> {
    let mut groups: BTreeMap<Date, Vec<&Transaction>> = BTreeMap::new();

    for transaction in transactions {
        let date = local_timezone.local_date(transaction.timestamp);
        groups.entry(date).or_default().push(transaction);
    }

    for items in groups.values_mut() {
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    groups
}

/// Build the day sections for the `displayed` kind, newest day first.
///
/// `expenses` and `incomes` are all the entries visible for the period,
/// including a partner's. The result is the same for the same inputs.
pub fn summarize_days<'a>(
    displayed: TransactionKind,
    expenses: &'a [Transaction],
    incomes: &'a [Transaction],
    local_timezone: &LocalTimezone,
) -> Vec<DayBucket<'a>> {
    let income_by_day = sum_by_day(incomes, local_timezone);
    let expense_by_day = sum_by_day(expenses, local_timezone);
    let displayed_transactions = match displayed {
        TransactionKind::Expense => expenses,
        TransactionKind::Income => incomes,
    };
    let mut items_by_day = group_by_day(displayed_transactions, local_timezone);

    let active_days: BTreeSet<Date> = income_by_day
        .keys()
        .chain(expense_by_day.keys())
        .copied()
        .collect();

    let mut cumulative_income = Amount::ZERO;
    let mut cumulative_expenses = Amount::ZERO;
    let mut buckets = Vec::new();

    for date in active_days {
        let income_today = income_by_day.get(&date).copied().unwrap_or_default();
        let spent_today = expense_by_day.get(&date).copied().unwrap_or_default();

        cumulative_income += income_today;
        let start_balance = cumulative_income - cumulative_expenses;
        let end_balance = start_balance - spent_today;
        // Today's spending must only count towards tomorrow's start balance.
        cumulative_expenses += spent_today;

        if let Some(items) = items_by_day.remove(&date) {
            buckets.push(DayBucket {
                date,
                items,
                income_today,
                spent_today,
                start_balance,
                end_balance,
            });
        }
    }

    buckets.reverse();
    buckets
}

/// The totals for the whole month shown in the header card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonthTotals {
    /// Total income.
    pub income: Amount,
    /// Total expenses.
    pub expenses: Amount,
    /// Income minus expenses.
    pub net: Amount,
}

/// Sum the month's expenses and income, including a partner's.
pub fn month_totals(expenses: &[Transaction], incomes: &[Transaction]) -> MonthTotals {
    let income: Amount = incomes.iter().map(|transaction| transaction.amount).sum();
    let expenses: Amount = expenses.iter().map(|transaction| transaction.amount).sum();

    MonthTotals {
        income,
        expenses,
        net: income - expenses,
    }
}
