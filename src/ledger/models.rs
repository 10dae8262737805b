//! The expense and income models shared by the store, the fetch layer and the views.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, auth::UserID, money::Amount};

/// The database ID of an expense or income entry.
pub type TransactionId = i64;

// ============================================================================
// KINDS, ACCOUNTS AND CATEGORIES
// ============================================================================

/// Whether an entry records money spent or money earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Money spent.
    #[serde(rename = "expenses")]
    Expense,
    /// Money earned.
    #[serde(rename = "income")]
    Income,
}

impl TransactionKind {
    /// The name of the table entries of this kind are stored in.
    pub(crate) fn table_name(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }

    /// The URL path segment for this kind, matching its serde representation.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Expense => "expenses",
            Self::Income => "income",
        }
    }

    /// The plural, title case name, e.g. for tabs and page titles.
    pub fn title(self) -> &'static str {
        match self {
            Self::Expense => "Expenses",
            Self::Income => "Income",
        }
    }

    /// The singular, lower case name, e.g. for buttons and messages.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }

    /// The categories an entry of this kind may use, in display order.
    pub fn categories(self) -> &'static [Category] {
        match self {
            Self::Expense => &EXPENSE_CATEGORIES,
            Self::Income => &INCOME_CATEGORIES,
        }
    }
}

/// Where money was paid from or received into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Account {
    /// The GCash mobile wallet.
    #[serde(rename = "gcash")]
    GCash,
    /// A debit card.
    #[serde(rename = "debit card")]
    DebitCard,
    /// Cash on hand.
    #[serde(rename = "cash")]
    Cash,
    /// A credit card.
    #[serde(rename = "credit card")]
    CreditCard,
}

/// All accounts, in display order.
pub const ACCOUNTS: [Account; 4] = [
    Account::GCash,
    Account::DebitCard,
    Account::Cash,
    Account::CreditCard,
];

impl Account {
    /// The value stored in the database and submitted by forms.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GCash => "gcash",
            Self::DebitCard => "debit card",
            Self::Cash => "cash",
            Self::CreditCard => "credit card",
        }
    }

    /// The human readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::GCash => "GCash",
            Self::DebitCard => "Debit card",
            Self::Cash => "Cash",
            Self::CreditCard => "Credit card",
        }
    }
}

impl FromStr for Account {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ACCOUNTS
            .into_iter()
            .find(|account| account.as_str() == s)
            .ok_or(Error::NotFound)
    }
}

/// What money was spent on or where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Meals and snacks.
    Food,
    /// Fares, fuel and other transport.
    Transpo,
    /// Groceries.
    Grocery,
    /// Electricity, water, internet and phone bills.
    Utilities,
    /// Rent.
    Rent,
    /// Medicine and health care.
    Health,
    /// Shopping.
    Shopping,
    /// Entertainment.
    Entertainment,
    /// Salary.
    Salary,
    /// Bonuses.
    Bonus,
    /// Freelance work.
    Freelance,
    /// Returns on investments.
    Investment,
    /// Gifts received.
    Gift,
    /// Anything else, valid for both kinds.
    Other,
}

/// Categories for expenses, in display order.
pub const EXPENSE_CATEGORIES: [Category; 9] = [
    Category::Food,
    Category::Transpo,
    Category::Grocery,
    Category::Utilities,
    Category::Rent,
    Category::Health,
    Category::Shopping,
    Category::Entertainment,
    Category::Other,
];

/// Categories for income, in display order.
pub const INCOME_CATEGORIES: [Category; 6] = [
    Category::Salary,
    Category::Bonus,
    Category::Freelance,
    Category::Investment,
    Category::Gift,
    Category::Other,
];

impl Category {
    /// The value stored in the database and submitted by forms.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transpo => "transpo",
            Self::Grocery => "grocery",
            Self::Utilities => "utilities",
            Self::Rent => "rent",
            Self::Health => "health",
            Self::Shopping => "shopping",
            Self::Entertainment => "entertainment",
            Self::Salary => "salary",
            Self::Bonus => "bonus",
            Self::Freelance => "freelance",
            Self::Investment => "investment",
            Self::Gift => "gift",
            Self::Other => "other",
        }
    }

    /// The human readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transpo => "Transport",
            Self::Grocery => "Grocery",
            Self::Utilities => "Utilities",
            Self::Rent => "Rent",
            Self::Health => "Health",
            Self::Shopping => "Shopping",
            Self::Entertainment => "Entertainment",
            Self::Salary => "Salary",
            Self::Bonus => "Bonus",
            Self::Freelance => "Freelance",
            Self::Investment => "Investment",
            Self::Gift => "Gift",
            Self::Other => "Other",
        }
    }

    /// Whether the category may be used for entries of `kind`.
    pub fn is_valid_for(self, kind: TransactionKind) -> bool {
        kind.categories().contains(&self)
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EXPENSE_CATEGORIES
            .into_iter()
            .chain(INCOME_CATEGORIES)
            .find(|category| category.as_str() == s)
            .ok_or_else(|| Error::InvalidCategory(s.to_owned()))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl ToSql for Account {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Account {
    /// Unknown accounts are shown as cash rather than failing the whole month.
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        Ok(text.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown account {text:?} in database, showing it as cash");
            Account::Cash
        }))
    }
}

impl FromSql for Category {
    /// Unknown categories are shown as "other" rather than failing the whole month.
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        Ok(text.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown category {text:?} in database, showing it as other");
            Category::Other
        }))
    }
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// Who an entry in a viewer's ledger belongs to.
///
/// Entries fetched for a paired partner always carry the partner's email, so
/// a partner's entry can never be shown without a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// The entry belongs to the viewer.
    Own,
    /// The entry belongs to the viewer's partner.
    Spouse {
        /// The partner's email address, shown next to the entry.
        email: String,
    },
}

/// An expense or income entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the entry, unique within its kind.
    pub id: TransactionId,
    /// Whether the entry is an expense or income.
    pub kind: TransactionKind,
    /// The user who created the entry. Never changes.
    pub owner_id: UserID,
    /// How much was spent or earned, always greater than zero when written.
    pub amount: Amount,
    /// Where the money was paid from or received into.
    pub account: Account,
    /// What the money was spent on or where it came from.
    pub category: Category,
    /// An optional free-text label.
    pub note: Option<String>,
    /// When the entry happened. Set by the user, not the time it was recorded.
    pub timestamp: OffsetDateTime,
    /// Whether the entry belongs to the viewer or their partner.
    ///
    /// This is derived when the entry is fetched and is never stored.
    pub ownership: Ownership,
}

impl Transaction {
    /// Whether the entry was fetched from the viewer's partner's ledger.
    pub fn is_spouse_owned(&self) -> bool {
        matches!(self.ownership, Ownership::Spouse { .. })
    }

    /// The partner's email for partner entries, `None` for the viewer's own.
    pub fn spouse_label(&self) -> Option<&str> {
        match &self.ownership {
            Ownership::Own => None,
            Ownership::Spouse { email } => Some(email),
        }
    }

    /// Mark the entry as belonging to the viewer's partner.
    pub fn into_spouse_owned(self, partner_email: &str) -> Self {
        Self {
            ownership: Ownership::Spouse {
                email: partner_email.to_owned(),
            },
            ..self
        }
    }
}

/// The user-editable fields of an entry, used to create or update it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFields {
    /// How much was spent or earned.
    pub amount: Amount,
    /// Where the money was paid from or received into.
    pub account: Account,
    /// What the money was spent on or where it came from.
    pub category: Category,
    /// An optional free-text label. Blank notes are stored as `None`.
    pub note: Option<String>,
    /// When the entry happened.
    pub timestamp: OffsetDateTime,
}

impl TransactionFields {
    /// Check the fields before they are written.
    ///
    /// # Errors
    /// Returns:
    /// - [Error::InvalidAmount] if the amount is not greater than zero,
    /// - [Error::InvalidCategory] if the category does not belong to `kind`.
    pub fn validate(&self, kind: TransactionKind) -> Result<(), Error> {
        if !self.amount.is_positive() {
            return Err(Error::InvalidAmount(self.amount.to_string()));
        }

        if !self.category.is_valid_for(kind) {
            return Err(Error::InvalidCategory(self.category.as_str().to_owned()));
        }

        Ok(())
    }

    /// The note with surrounding whitespace removed, or `None` if it is blank.
    pub(crate) fn trimmed_note(&self) -> Option<&str> {
        self.note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
    }
}
