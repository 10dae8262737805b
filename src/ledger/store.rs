//! Persistence of expense and income entries.

use std::ops::Range;

use rusqlite::{Connection, OptionalExtension, Row, params};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    ledger::models::{Ownership, Transaction, TransactionFields, TransactionId, TransactionKind},
    money::Amount,
};

/// Reads and writes expense and income entries.
///
/// Implementations must only let the owner of an entry change it.
pub trait TransactionStore {
    /// Get the entries of `kind` owned by `owner_id` with a timestamp in `range`,
    /// newest first.
    ///
    /// The entries are tagged as [Ownership::Own]; the caller tags entries
    /// fetched for someone else.
    ///
    /// # Errors
    /// Returns an error if the entries could not be read.
    fn query(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        range: &Range<OffsetDateTime>,
    ) -> Result<Vec<Transaction>, Error>;

    /// Get a single entry owned by `owner_id`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no such entry, or
    /// [Error::Unauthorized] if it belongs to someone else.
    fn get(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        id: TransactionId,
    ) -> Result<Transaction, Error>;

    /// Create an entry owned by `owner_id`.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] or [Error::InvalidCategory] if the fields
    /// are not valid for `kind`, otherwise an error if the entry could not be written.
    fn create(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        fields: &TransactionFields,
    ) -> Result<Transaction, Error>;

    /// Replace the fields of an entry owned by `owner_id`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no such entry, [Error::Unauthorized]
    /// if it belongs to someone else, or a validation error if the fields are invalid.
    fn update(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        id: TransactionId,
        fields: &TransactionFields,
    ) -> Result<Transaction, Error>;

    /// Delete an entry owned by `owner_id`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no such entry, or
    /// [Error::Unauthorized] if it belongs to someone else.
    fn delete(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        id: TransactionId,
    ) -> Result<(), Error>;
}

/// A [TransactionStore] backed by the application's SQLite database.
#[derive(Debug, Clone, Copy)]
pub struct SQLiteTransactionStore<'c> {
    connection: &'c Connection,
}

impl<'c> SQLiteTransactionStore<'c> {
    /// Create a store that reads and writes through `connection`.
    pub fn new(connection: &'c Connection) -> Self {
        Self { connection }
    }

    /// Find out why a write to `id` did not touch any rows.
    fn missing_or_forbidden(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        id: TransactionId,
    ) -> Error {
        let table = kind.table_name();
        let actual_owner: Result<Option<i64>, rusqlite::Error> = self
            .connection
            .query_row(
                &format!("SELECT user_id FROM {table} WHERE id = ?1"),
                [id],
                |row| row.get(0),
            )
            .optional();

        match actual_owner {
            Ok(None) => Error::NotFound,
            Ok(Some(actual_owner)) => {
                tracing::warn!(
                    "User {owner_id} tried to change {} {id} owned by user {actual_owner}",
                    kind.noun()
                );
                Error::Unauthorized
            }
            Err(error) => error.into(),
        }
    }
}

const COLUMNS: &str = "id, user_id, amount, account, category, note, occurred_at";

impl TransactionStore for SQLiteTransactionStore<'_> {
    fn query(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        range: &Range<OffsetDateTime>,
    ) -> Result<Vec<Transaction>, Error> {
        let table = kind.table_name();

        self.connection
            .prepare(&format!(
                "SELECT {COLUMNS} FROM {table}
                WHERE user_id = ?1 AND occurred_at >= ?2 AND occurred_at < ?3
                ORDER BY occurred_at DESC, id DESC"
            ))?
            .query_map(
                params![
                    owner_id.as_i64(),
                    range.start.unix_timestamp(),
                    range.end.unix_timestamp()
                ],
                |row| map_transaction_row(kind, row),
            )?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
            .collect()
    }

    fn get(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        id: TransactionId,
    ) -> Result<Transaction, Error> {
        let table = kind.table_name();
        let transaction = self
            .connection
            .prepare(&format!("SELECT {COLUMNS} FROM {table} WHERE id = ?1"))?
            .query_row([id], |row| map_transaction_row(kind, row))?;

        if transaction.owner_id != owner_id {
            return Err(Error::Unauthorized);
        }

        Ok(transaction)
    }

    fn create(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        fields: &TransactionFields,
    ) -> Result<Transaction, Error> {
        fields.validate(kind)?;
        let table = kind.table_name();

        let transaction = self
            .connection
            .prepare(&format!(
                "INSERT INTO {table} (user_id, amount, account, category, note, occurred_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                RETURNING {COLUMNS}"
            ))?
            .query_row(
                params![
                    owner_id.as_i64(),
                    fields.amount,
                    fields.account,
                    fields.category,
                    fields.trimmed_note(),
                    fields.timestamp.unix_timestamp(),
                ],
                |row| map_transaction_row(kind, row),
            )?;

        Ok(transaction)
    }

    fn update(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        id: TransactionId,
        fields: &TransactionFields,
    ) -> Result<Transaction, Error> {
        fields.validate(kind)?;
        let table = kind.table_name();

        let updated = self
            .connection
            .prepare(&format!(
                "UPDATE {table}
                SET amount = ?1, account = ?2, category = ?3, note = ?4, occurred_at = ?5
                WHERE id = ?6 AND user_id = ?7
                RETURNING {COLUMNS}"
            ))?
            .query_row(
                params![
                    fields.amount,
                    fields.account,
                    fields.category,
                    fields.trimmed_note(),
                    fields.timestamp.unix_timestamp(),
                    id,
                    owner_id.as_i64(),
                ],
                |row| map_transaction_row(kind, row),
            )
            .optional()?;

        updated.ok_or_else(|| self.missing_or_forbidden(kind, owner_id, id))
    }

    fn delete(
        &self,
        kind: TransactionKind,
        owner_id: UserID,
        id: TransactionId,
    ) -> Result<(), Error> {
        let table = kind.table_name();
        let rows_affected = self.connection.execute(
            &format!("DELETE FROM {table} WHERE id = ?1 AND user_id = ?2"),
            params![id, owner_id.as_i64()],
        )?;

        match rows_affected {
            0 => Err(self.missing_or_forbidden(kind, owner_id, id)),
            _ => Ok(()),
        }
    }
}

/// Create the expense and income tables in the database.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_transaction_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    for kind in [TransactionKind::Expense, TransactionKind::Income] {
        let table = kind.table_name();

        // `amount` is nullable so that rows written by other tools can still be read.
        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    amount INTEGER,
                    account TEXT NOT NULL,
                    category TEXT NOT NULL,
                    note TEXT,
                    occurred_at INTEGER NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )"
            ),
            (),
        )?;

        // Month views query by owner and time range.
        connection.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_user_occurred_at
                ON {table}(user_id, occurred_at)"
            ),
            (),
        )?;
    }

    Ok(())
}

/// Map a database row to a [Transaction] of `kind` owned by the viewer.
fn map_transaction_row(kind: TransactionKind, row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let owner_id = UserID::new(row.get(1)?);
    let amount = Amount::coerce_from_sql(row.get_ref(2)?).unwrap_or_else(|| {
        tracing::warn!("{} {id} has a missing or non-numeric amount, using zero", kind.noun());
        Amount::ZERO
    });
    let account = row.get(3)?;
    let category = row.get(4)?;
    let note = row.get(5)?;
    let raw_timestamp: i64 = row.get(6)?;
    let timestamp = OffsetDateTime::from_unix_timestamp(raw_timestamp).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Integer,
            Box::new(error),
        )
    })?;

    Ok(Transaction {
        id,
        kind,
        owner_id,
        amount,
        account,
        category,
        note,
        timestamp,
        ownership: Ownership::Own,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{
        Error, PasswordHash,
        auth::{UserID, create_user},
        db::initialize,
        ledger::models::{Account, Category, TransactionFields, TransactionKind},
        money::Amount,
    };

    use super::{SQLiteTransactionStore, TransactionStore};

    fn get_test_connection() -> (Connection, UserID, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let alice = create_user("alice@example.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();
        let bob =
            create_user("bob@example.com", PasswordHash::new_unchecked("hunter3"), &conn).unwrap();

        (conn, alice.id, bob.id)
    }

    fn fields(pesos: i64, category: Category, timestamp: OffsetDateTime) -> TransactionFields {
        TransactionFields {
            amount: Amount::from_major_units(pesos),
            account: Account::GCash,
            category,
            note: Some("  lunch  ".to_owned()),
            timestamp,
        }
    }

    #[test]
    fn create_returns_stored_entry() {
        let (conn, alice, _) = get_test_connection();
        let store = SQLiteTransactionStore::new(&conn);
        let timestamp = datetime!(2025-08-01 04:30 UTC);

        let created = store
            .create(
                TransactionKind::Expense,
                alice,
                &fields(120, Category::Food, timestamp),
            )
            .unwrap();

        assert_eq!(created.owner_id, alice);
        assert_eq!(created.amount, Amount::from_major_units(120));
        assert_eq!(created.category, Category::Food);
        assert_eq!(created.note.as_deref(), Some("lunch"));
        assert_eq!(created.timestamp, timestamp);
        assert!(!created.is_spouse_owned());
    }

    #[test]
    fn create_rejects_invalid_fields_before_writing() {
        let (conn, alice, _) = get_test_connection();
        let store = SQLiteTransactionStore::new(&conn);
        let mut invalid = fields(0, Category::Food, datetime!(2025-08-01 04:30 UTC));

        let result = store.create(TransactionKind::Expense, alice, &invalid);
        assert_eq!(result, Err(Error::InvalidAmount("0.00".to_owned())));

        invalid.amount = Amount::from_major_units(5);
        invalid.category = Category::Food;
        let result = store.create(TransactionKind::Income, alice, &invalid);
        assert_eq!(result, Err(Error::InvalidCategory("food".to_owned())));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM expense", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn query_returns_owner_entries_in_range_newest_first() {
        let (conn, alice, bob) = get_test_connection();
        let store = SQLiteTransactionStore::new(&conn);
        let start = datetime!(2025-08-01 00:00 UTC);
        let end = datetime!(2025-09-01 00:00 UTC);
        let kind = TransactionKind::Expense;

        store
            .create(kind, alice, &fields(1, Category::Food, start - Duration::seconds(1)))
            .unwrap();
        let first = store
            .create(kind, alice, &fields(2, Category::Food, start))
            .unwrap();
        let last = store
            .create(kind, alice, &fields(3, Category::Rent, end - Duration::seconds(1)))
            .unwrap();
        store
            .create(kind, alice, &fields(4, Category::Food, end))
            .unwrap();
        store
            .create(kind, bob, &fields(5, Category::Food, start + Duration::days(1)))
            .unwrap();

        let got = store.query(kind, alice, &(start..end)).unwrap();

        assert_eq!(got, vec![last, first]);
    }

    #[test]
    fn kinds_are_stored_separately() {
        let (conn, alice, _) = get_test_connection();
        let store = SQLiteTransactionStore::new(&conn);
        let timestamp = datetime!(2025-08-10 00:00 UTC);
        let range = datetime!(2025-08-01 00:00 UTC)..datetime!(2025-09-01 00:00 UTC);

        store
            .create(TransactionKind::Income, alice, &fields(500, Category::Salary, timestamp))
            .unwrap();

        assert!(store.query(TransactionKind::Expense, alice, &range).unwrap().is_empty());
        assert_eq!(store.query(TransactionKind::Income, alice, &range).unwrap().len(), 1);
    }

    #[test]
    fn missing_amounts_are_read_as_zero() {
        let (conn, alice, _) = get_test_connection();
        let timestamp = datetime!(2025-08-10 00:00 UTC);
        conn.execute(
            "INSERT INTO expense (user_id, amount, account, category, note, occurred_at)
            VALUES (?1, NULL, 'cash', 'food', NULL, ?2), (?1, 'abc', 'wallet', 'snacks', NULL, ?2)",
            (alice.as_i64(), timestamp.unix_timestamp()),
        )
        .unwrap();
        let store = SQLiteTransactionStore::new(&conn);
        let range = datetime!(2025-08-01 00:00 UTC)..datetime!(2025-09-01 00:00 UTC);

        let got = store.query(TransactionKind::Expense, alice, &range).unwrap();

        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|transaction| transaction.amount == Amount::ZERO));
        assert_eq!(got[0].account, Account::Cash);
        assert_eq!(got[0].category, Category::Other);
    }

    #[test]
    fn update_replaces_fields() {
        let (conn, alice, _) = get_test_connection();
        let store = SQLiteTransactionStore::new(&conn);
        let kind = TransactionKind::Expense;
        let created = store
            .create(kind, alice, &fields(10, Category::Food, datetime!(2025-08-01 00:00 UTC)))
            .unwrap();
        let new_fields = TransactionFields {
            amount: Amount::from_minor_units(2_550),
            account: Account::CreditCard,
            category: Category::Shopping,
            note: None,
            timestamp: datetime!(2025-08-02 09:00 UTC),
        };

        let updated = store.update(kind, alice, created.id, &new_fields).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.amount, new_fields.amount);
        assert_eq!(updated.account, Account::CreditCard);
        assert_eq!(updated.category, Category::Shopping);
        assert_eq!(updated.note, None);
        assert_eq!(store.get(kind, alice, created.id), Ok(updated));
    }

    #[test]
    fn update_fails_on_missing_entry() {
        let (conn, alice, _) = get_test_connection();
        let store = SQLiteTransactionStore::new(&conn);

        let result = store.update(
            TransactionKind::Expense,
            alice,
            42,
            &fields(10, Category::Food, datetime!(2025-08-01 00:00 UTC)),
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn writes_to_another_users_entry_are_rejected() {
        let (conn, alice, bob) = get_test_connection();
        let store = SQLiteTransactionStore::new(&conn);
        let kind = TransactionKind::Income;
        let original = fields(10, Category::Gift, datetime!(2025-08-01 00:00 UTC));
        let created = store.create(kind, alice, &original).unwrap();

        let update = store.update(
            kind,
            bob,
            created.id,
            &fields(99, Category::Gift, datetime!(2025-08-01 00:00 UTC)),
        );
        let delete = store.delete(kind, bob, created.id);
        let get = store.get(kind, bob, created.id);

        assert_eq!(update, Err(Error::Unauthorized));
        assert_eq!(delete, Err(Error::Unauthorized));
        assert_eq!(get, Err(Error::Unauthorized));
        assert_eq!(store.get(kind, alice, created.id), Ok(created));
    }

    #[test]
    fn delete_removes_entry() {
        let (conn, alice, _) = get_test_connection();
        let store = SQLiteTransactionStore::new(&conn);
        let kind = TransactionKind::Expense;
        let created = store
            .create(kind, alice, &fields(10, Category::Food, datetime!(2025-08-01 00:00 UTC)))
            .unwrap();

        assert_eq!(store.delete(kind, alice, created.id), Ok(()));
        assert_eq!(store.get(kind, alice, created.id), Err(Error::NotFound));
        assert_eq!(store.delete(kind, alice, created.id), Err(Error::NotFound));
    }
}
