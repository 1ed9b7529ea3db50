//! # Seed Data Generator
//!
//! Populates a development database with users and a book catalog.
//!
//! ## Usage
//! ```bash
//! cargo run -p bookshop-db --bin seed
//! cargo run -p bookshop-db --bin seed -- --db ./data/bookshop.db --count 200
//! ```

use chrono::Utc;
use std::env;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use bookshop_core::Book;
use bookshop_db::{Database, DbConfig};

/// (title, author, genre) triples used to generate the catalog.
const BOOKS: &[(&str, &str, &str)] = &[
    ("The Hobbit", "J.R.R. Tolkien", "Fantasy"),
    ("Dune", "Frank Herbert", "Science Fiction"),
    ("Pride and Prejudice", "Jane Austen", "Classic"),
    ("The Name of the Wind", "Patrick Rothfuss", "Fantasy"),
    ("Neuromancer", "William Gibson", "Science Fiction"),
    ("Jane Eyre", "Charlotte Bronte", "Classic"),
    ("The Left Hand of Darkness", "Ursula K. Le Guin", "Science Fiction"),
    ("A Wizard of Earthsea", "Ursula K. Le Guin", "Fantasy"),
    ("The Remains of the Day", "Kazuo Ishiguro", "Literary"),
    ("Snow Crash", "Neal Stephenson", "Science Fiction"),
    ("Middlemarch", "George Eliot", "Classic"),
    ("The Fifth Season", "N.K. Jemisin", "Fantasy"),
    ("Foundation", "Isaac Asimov", "Science Fiction"),
    ("Beloved", "Toni Morrison", "Literary"),
    ("The Dispossessed", "Ursula K. Le Guin", "Science Fiction"),
    ("Mistborn", "Brandon Sanderson", "Fantasy"),
    ("Wuthering Heights", "Emily Bronte", "Classic"),
    ("Hyperion", "Dan Simmons", "Science Fiction"),
    ("Piranesi", "Susanna Clarke", "Fantasy"),
    ("Never Let Me Go", "Kazuo Ishiguro", "Literary"),
];

/// (username, email, role) for the development accounts.
const USERS: &[(&str, &str, &str)] = &[
    ("admin", "admin@bookshop.test", "admin"),
    ("alice", "alice@bookshop.test", "customer"),
    ("bob", "bob@bookshop.test", "customer"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = BOOKS.len() * 5;
    let mut db_path = String::from("./bookshop_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bookshop seed data generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of books to generate (default: {})", BOOKS.len() * 5);
                println!("  -d, --db <PATH>    Database file path (default: ./bookshop_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Bookshop seed data generator");
    println!("Database: {db_path}");
    println!("Books:    {count}");
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("Connected, migrations applied");

    let existing = db.books().count().await?;
    if existing > 0 {
        println!("Database already has {existing} books; skipping seed.");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    for (username, email, role) in USERS {
        sqlx::query(
            "INSERT INTO users (id, username, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(username)
        .bind(email)
        .bind(role)
        .bind(now)
        .execute(db.pool())
        .await?;
    }
    println!("Seeded {} users", USERS.len());

    let mut generated = 0;
    'outer: loop {
        for (idx, (title, author, genre)) in BOOKS.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let edition = generated / BOOKS.len();
            let title = if edition == 0 {
                (*title).to_string()
            } else {
                format!("{title} (printing {})", edition + 1)
            };

            let seed = generated * 31 + idx;
            let book = Book {
                id: Uuid::new_v4().to_string(),
                title,
                author: (*author).to_string(),
                genre: (*genre).to_string(),
                // 4.99 - 24.99 range
                price_cents: 499 + ((seed * 17) % 2000) as i64,
                image_url: None,
                stock_quantity: (seed % 25) as i64,
                created_at: now,
                updated_at: now,
            };

            if let Err(e) = db.books().insert(&book).await {
                eprintln!("Failed to insert {}: {e}", book.title);
                continue;
            }

            generated += 1;
        }
    }

    println!("Seeded {generated} books");
    println!("Done");

    Ok(())
}
