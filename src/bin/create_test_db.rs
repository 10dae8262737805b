use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;
use time::Duration;

use pitaka::{
    Account, Amount, Category, LocalTimezone, PasswordHash, SQLitePairingStore,
    SQLiteTransactionStore, TransactionFields, TransactionKind, TransactionStore, UserID,
    ValidatedPassword, add_partner, create_user, initialize_db,
};

/// A utility for creating a test database for pitaka.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The canonical name of the timezone the sample entries are spread over.
    #[arg(long, default_value = "Asia/Manila")]
    timezone: String,
}

/// Sample expenses as (days ago, hour of day, amount in pesos, category, account, note).
const SAMPLE_EXPENSES: [(i64, i64, i64, Category, Account, &str); 8] = [
    (0, 8, 65, Category::Food, Account::GCash, "Coffee"),
    (1, 12, 180, Category::Food, Account::Cash, "Lunch"),
    (1, 18, 45, Category::Transpo, Account::Cash, "Jeep"),
    (3, 10, 2_350, Category::Grocery, Account::DebitCard, "Weekly groceries"),
    (6, 20, 1_200, Category::Utilities, Account::GCash, "Electricity"),
    (12, 9, 15_000, Category::Rent, Account::DebitCard, ""),
    (20, 15, 899, Category::Shopping, Account::CreditCard, "Shoes on sale"),
    (35, 19, 450, Category::Entertainment, Account::CreditCard, "Movie night"),
];

/// Sample income as (days ago, hour of day, amount in pesos, category, account, note).
const SAMPLE_INCOME: [(i64, i64, i64, Category, Account, &str); 4] = [
    (2, 9, 25_000, Category::Salary, Account::DebitCard, ""),
    (9, 14, 3_500, Category::Freelance, Account::GCash, "Logo design"),
    (17, 9, 25_000, Category::Salary, Account::DebitCard, ""),
    (33, 11, 1_000, Category::Gift, Account::Cash, "Birthday"),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    let local_timezone = LocalTimezone::from_name(&args.timezone)?;

    println!("Creating database at {output_path:#?}");
    let connection = Connection::open(output_path)?;

    initialize_db(&connection)?;

    println!("Creating test users...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let alice = create_user("alice@example.com", password_hash.clone(), &connection)?;
    let bob = create_user("bob@example.com", password_hash, &connection)?;

    println!("Pairing {} and {}...", alice.email, bob.email);

    let pairings = SQLitePairingStore::new(&connection);
    add_partner(&pairings, alice.id, &alice.email, &bob.email)?;
    add_partner(&pairings, bob.id, &bob.email, &alice.email)?;

    println!("Adding sample expenses and income...");

    let store = SQLiteTransactionStore::new(&connection);
    let today = local_timezone.start_of_day(local_timezone.local_date(local_timezone.now()));

    for (index, entry) in SAMPLE_EXPENSES.iter().enumerate() {
        let owner = if index % 2 == 0 { alice.id } else { bob.id };
        add_sample(&store, TransactionKind::Expense, owner, today, *entry)?;
    }

    for (index, entry) in SAMPLE_INCOME.iter().enumerate() {
        let owner = if index % 2 == 0 { alice.id } else { bob.id };
        add_sample(&store, TransactionKind::Income, owner, today, *entry)?;
    }

    println!("Success! Log in as alice@example.com or bob@example.com with the password 'test'.");

    Ok(())
}

fn add_sample(
    store: &impl TransactionStore,
    kind: TransactionKind,
    owner_id: UserID,
    start_of_today: time::OffsetDateTime,
    (days_ago, hour, pesos, category, account, note): (i64, i64, i64, Category, Account, &str),
) -> Result<(), pitaka::Error> {
    let fields = TransactionFields {
        amount: Amount::from_major_units(pesos),
        account,
        category,
        note: (!note.is_empty()).then(|| note.to_owned()),
        timestamp: start_of_today - Duration::days(days_ago) + Duration::hours(hour),
    };

    store.create(kind, owner_id, &fields)?;

    Ok(())
}
