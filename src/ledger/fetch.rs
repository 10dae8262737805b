//! Loads the entries shown on a month page, merging in a paired partner's entries.

use std::ops::Range;

use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    ledger::{
        month::ViewMonth,
        models::{Transaction, TransactionKind},
        store::TransactionStore,
    },
    pairing::Pairing,
    timezone::LocalTimezone,
};

/// The expenses and income visible to a viewer for one month, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    /// Expenses of the viewer and their resolved partner.
    pub expenses: Vec<Transaction>,
    /// Income of the viewer and their resolved partner.
    pub incomes: Vec<Transaction>,
}

impl Ledger {
    /// The entries of `kind`.
    pub fn of_kind(&self, kind: TransactionKind) -> &[Transaction] {
        match kind {
            TransactionKind::Expense => &self.expenses,
            TransactionKind::Income => &self.incomes,
        }
    }
}

/// Get the entries of `kind` in `range` for `owner_id`, plus the entries of
/// their partner if `pairing` has been resolved to a registered user.
///
/// Partner entries are tagged with the partner's email. The combined list is
/// sorted by timestamp, newest first.
///
/// # Errors
/// Returns the first error from the store. No partial list is returned if
/// only one of the queries fails.
pub fn fetch_kind(
    store: &impl TransactionStore,
    kind: TransactionKind,
    owner_id: UserID,
    pairing: Option<&Pairing>,
    range: &Range<OffsetDateTime>,
) -> Result<Vec<Transaction>, Error> {
    let mut transactions = store.query(kind, owner_id, range)?;

    if let Some((partner_id, partner_email)) = pairing.and_then(Pairing::resolved_partner) {
        let partner_transactions = store
            .query(kind, partner_id, range)?
            .into_iter()
            .map(|transaction| transaction.into_spouse_owned(partner_email));

        transactions.extend(partner_transactions);
    }

    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(transactions)
}

/// Get the expenses and income for `month` as seen by `owner_id`.
///
/// # Errors
/// Returns an error if any of the queries fail.
pub fn fetch_ledger(
    store: &impl TransactionStore,
    owner_id: UserID,
    pairing: Option<&Pairing>,
    month: ViewMonth,
    local_timezone: &LocalTimezone,
) -> Result<Ledger, Error> {
    let range = month.utc_range(local_timezone);

    let expenses = fetch_kind(store, TransactionKind::Expense, owner_id, pairing, &range)?;
    let incomes = fetch_kind(store, TransactionKind::Income, owner_id, pairing, &range)?;

    Ok(Ledger { expenses, incomes })
}
