//! Combining a user's ledger with a partner's.

mod core;
mod page;

pub use core::{Pairing, PairingStore, SQLitePairingStore, add_partner, create_pairing_table};
pub use page::{add_partner_endpoint, get_partner_page, remove_partner_endpoint};
