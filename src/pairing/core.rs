//! The partner a user has chosen to combine their ledger with.

use rusqlite::{Connection, OptionalExtension, params};

use crate::{
    Error,
    auth::{UserID, normalize_email},
};

/// A user's choice of partner.
///
/// Pairings point one way: the partner sees nothing of the owner's entries
/// unless they add the owner as their partner too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    /// The user who added the partner.
    pub owner_id: UserID,
    /// The partner's email, trimmed and lower case.
    pub partner_email: String,
    /// The partner's user ID, or `None` while no account uses the email.
    pub resolved_partner_id: Option<UserID>,
}

impl Pairing {
    /// The partner's ID and email if the partner has an account.
    pub fn resolved_partner(&self) -> Option<(UserID, &str)> {
        self.resolved_partner_id
            .map(|partner_id| (partner_id, self.partner_email.as_str()))
    }

    /// Whether the partner has not signed up yet.
    pub fn is_pending(&self) -> bool {
        self.resolved_partner_id.is_none()
    }
}

/// Reads and writes pairings.
pub trait PairingStore {
    /// Get the pairing `owner_id` has made, if any.
    ///
    /// # Errors
    /// Returns an error if the pairing could not be read.
    fn get(&self, owner_id: UserID) -> Result<Option<Pairing>, Error>;

    /// Record `partner_email` as the partner of `owner_id`.
    ///
    /// # Errors
    /// Returns [Error::DuplicatePairing] if `owner_id` already has a partner.
    fn set(&self, owner_id: UserID, partner_email: &str) -> Result<Pairing, Error>;

    /// Remove the pairing of `owner_id`. Succeeds if there is none.
    ///
    /// # Errors
    /// Returns an error if the pairing could not be deleted.
    fn clear(&self, owner_id: UserID) -> Result<(), Error>;
}

/// A [PairingStore] backed by the application's SQLite database.
#[derive(Debug, Clone, Copy)]
pub struct SQLitePairingStore<'c> {
    connection: &'c Connection,
}

impl<'c> SQLitePairingStore<'c> {
    /// Create a store that reads and writes through `connection`.
    pub fn new(connection: &'c Connection) -> Self {
        Self { connection }
    }
}

impl PairingStore for SQLitePairingStore<'_> {
    fn get(&self, owner_id: UserID) -> Result<Option<Pairing>, Error> {
        self.connection
            .prepare(
                "SELECT spouse_connection.partner_email, user.id
                FROM spouse_connection
                LEFT JOIN user ON user.email = spouse_connection.partner_email COLLATE NOCASE
                WHERE spouse_connection.user_id = ?1",
            )?
            .query_row([owner_id.as_i64()], |row| {
                let partner_email = row.get(0)?;
                let resolved_partner_id: Option<i64> = row.get(1)?;

                Ok(Pairing {
                    owner_id,
                    partner_email,
                    resolved_partner_id: resolved_partner_id.map(UserID::new),
                })
            })
            .optional()
            .map_err(Error::from)
    }

    fn set(&self, owner_id: UserID, partner_email: &str) -> Result<Pairing, Error> {
        self.connection.execute(
            "INSERT INTO spouse_connection (user_id, partner_email) VALUES (?1, ?2)",
            params![owner_id.as_i64(), partner_email],
        )?;

        self.get(owner_id)?.ok_or(Error::NotFound)
    }

    fn clear(&self, owner_id: UserID) -> Result<(), Error> {
        self.connection.execute(
            "DELETE FROM spouse_connection WHERE user_id = ?1",
            [owner_id.as_i64()],
        )?;

        Ok(())
    }
}

/// Create the table pairings are stored in.
///
/// # Errors
/// Returns an error if the table cannot be created.
pub fn create_pairing_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS spouse_connection (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL UNIQUE,
            partner_email TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
            )",
        (),
    )?;

    Ok(())
}

/// Add `partner_email` as the partner of the user `owner_id` with the email `owner_email`.
///
/// # Errors
/// Returns, without writing anything:
/// - [Error::InvalidEmail] if `partner_email` is blank or not an email address,
/// - [Error::SelfPairing] if `partner_email` is the owner's own email, ignoring case.
///
/// Returns [Error::DuplicatePairing] if the owner already has a partner.
pub fn add_partner(
    store: &impl PairingStore,
    owner_id: UserID,
    owner_email: &str,
    partner_email: &str,
) -> Result<Pairing, Error> {
    let partner_email = normalize_email(partner_email);

    if !email_address::EmailAddress::is_valid(&partner_email) {
        return Err(Error::InvalidEmail(partner_email));
    }

    if partner_email == normalize_email(owner_email) {
        return Err(Error::SelfPairing);
    }

    store.set(owner_id, &partner_email)
}
