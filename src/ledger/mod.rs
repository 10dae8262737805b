//! Expenses and income: storage, the combined month view with running
//! balances, and the pages and endpoints for managing entries.

mod aggregation;
mod create;
mod delete;
mod edit;
mod fetch;
mod form;
mod models;
mod month;
mod page;
mod store;
mod view;

pub use aggregation::{DayBucket, MonthTotals, month_totals, summarize_days};
pub use create::{create_transaction_endpoint, get_new_transaction_page};
pub use delete::delete_transaction_endpoint;
pub use edit::{get_edit_transaction_page, update_transaction_endpoint};
pub use fetch::{Ledger, fetch_kind, fetch_ledger};
pub use models::{
    ACCOUNTS, Account, Category, Ownership, Transaction, TransactionFields, TransactionId,
    TransactionKind,
};
pub use month::ViewMonth;
pub use page::get_ledger_page;
pub use store::{SQLiteTransactionStore, TransactionStore, create_transaction_tables};
