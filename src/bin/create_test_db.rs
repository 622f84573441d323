use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use budget_cycle::{
    account::create_account,
    category::{CategoryName, create_category},
    initialize_db,
    timezone::local_offset,
    transaction::{PaymentMethod, PurchaseRequest, TransactionType, create_purchase},
    user::create_user,
};

/// A utility for creating a test database for budget_cycle.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The canonical timezone of the test user.
    #[arg(long, default_value = "America/Sao_Paulo")]
    timezone: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");
    let user = create_user("Test", &args.timezone, &conn)?;
    let config = user.billing_config()?;
    let offset = local_offset(&user.timezone)?;

    let account = create_account(user.id, "Checking", 2500.0, &conn)?;
    let groceries = create_category(user.id, CategoryName::new("Groceries")?, &conn)?;
    let housing = create_category(user.id, CategoryName::new("Housing")?, &conn)?;

    println!("Creating test transactions...");
    let purchases = [
        PurchaseRequest {
            amount: 4200.0,
            description: "Salary".to_owned(),
            kind: TransactionType::Income,
            payment_method: PaymentMethod::Pix,
            category_id: None,
            bank_account_id: Some(account.id),
            date: "2024-01-05".to_owned(),
            installments: None,
            is_recurring: true,
        },
        PurchaseRequest {
            amount: 1500.0,
            description: "Rent".to_owned(),
            kind: TransactionType::Expense,
            payment_method: PaymentMethod::Boleto,
            category_id: Some(housing.id),
            bank_account_id: Some(account.id),
            date: "2024-01-10".to_owned(),
            installments: None,
            is_recurring: true,
        },
        PurchaseRequest {
            amount: 320.45,
            description: "Supermarket".to_owned(),
            kind: TransactionType::Expense,
            payment_method: PaymentMethod::CreditCard,
            category_id: Some(groceries.id),
            bank_account_id: None,
            date: "2024-02-03".to_owned(),
            installments: None,
            is_recurring: false,
        },
        PurchaseRequest {
            amount: 2999.9,
            description: "Laptop".to_owned(),
            kind: TransactionType::Expense,
            payment_method: PaymentMethod::CreditCard,
            category_id: None,
            bank_account_id: None,
            date: "2024-02-20".to_owned(),
            installments: Some(10),
            is_recurring: false,
        },
    ];

    for purchase in purchases {
        create_purchase(user.id, purchase.validate(offset)?, &config, &conn)?;
    }

    println!("Success!");

    Ok(())
}
