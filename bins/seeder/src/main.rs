//! Database seeder for pratica invoicing development and testing.
//!
//! Seeds invoice rules and a few mirrored bookings so the attach, retry and
//! finalize routes can be exercised locally.
//!
//! Usage: cargo run --bin seeder

use chrono::{NaiveDate, Utc};
use pratica_core::booking::{Activity, Booking, Customer};
use pratica_db::BookingRepository;
use pratica_db::entities::invoice_rules;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

/// Travel-date rule id (consistent for all seeds)
const TRAVEL_RULE_ID: &str = "00000000-0000-0000-0000-000000000101";
/// Creation-date rule id (consistent for all seeds)
const CREATION_RULE_ID: &str = "00000000-0000-0000-0000-000000000102";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = pratica_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding invoice rules...");
    seed_invoice_rules(&db).await;

    println!("Seeding bookings...");
    seed_bookings(db).await;

    println!("Seeding complete!");
}

/// Seeds one travel-basis and one creation-basis rule.
async fn seed_invoice_rules(db: &DatabaseConnection) {
    let rules = [
        (
            TRAVEL_RULE_ID,
            "Travel-date sellers",
            "travel",
            serde_json::json!(["Rome Walks", "Vatican Tours"]),
            None,
        ),
        (
            CREATION_RULE_ID,
            "Creation-date sellers",
            "creation",
            serde_json::json!(["Florence Bikes"]),
            NaiveDate::from_ymd_opt(2026, 1, 1),
        ),
    ];

    for (id, name, basis, sellers, start_date) in rules {
        let id = Uuid::parse_str(id).unwrap();
        if invoice_rules::Entity::find_by_id(id)
            .one(db)
            .await
            .ok()
            .flatten()
            .is_some()
        {
            println!("  Rule '{name}' already exists, skipping...");
            continue;
        }

        let rule = invoice_rules::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            active: Set(true),
            seller_names: Set(sellers),
            date_basis: Set(basis.to_string()),
            start_date: Set(start_date),
            created_at: Set(Utc::now().into()),
            updated_at: Set(Utc::now().into()),
        };

        if let Err(e) = rule.insert(db).await {
            eprintln!("Failed to insert rule '{name}': {e}");
        } else {
            println!("  Created rule: {name} ({basis})");
        }
    }
}

/// Seeds bookings covering both date bases and a cancelled activity.
async fn seed_bookings(db: DatabaseConnection) {
    let repo = BookingRepository::new(db);

    let bookings = [
        Booking {
            booking_id: 12345,
            confirmation_code: "RW-12345".to_string(),
            created_at: "2026-01-10T08:15:00Z".to_string(),
            total_amount: Decimal::new(6000, 2),
            currency: Some("EUR".to_string()),
            customer: customer(501, "Ada", "Lovelace"),
            seller: None,
            activities: vec![
                activity(1, "Colosseum Underground", 3000, "2026-01-15 09:00:00", false),
                activity(2, "Vatican Museums", 3000, "2026-02-03 10:30:00", false),
                activity(3, "Trastevere Food Tour", 4500, "2026-02-20 18:00:00", true),
            ],
        },
        Booking {
            booking_id: 12346,
            confirmation_code: "FB-12346".to_string(),
            created_at: "2025-12-20T10:00:00Z".to_string(),
            total_amount: Decimal::new(2500, 2),
            currency: None,
            customer: customer(502, "Alan", "Turing"),
            seller: Some("Florence Bikes".to_string()),
            activities: vec![activity(4, "Chianti E-Bike", 2500, "2026-03-01", false)],
        },
    ];

    for booking in &bookings {
        match repo.upsert(booking).await {
            Ok(()) => println!(
                "  Mirrored booking {} ({})",
                booking.booking_id, booking.confirmation_code
            ),
            Err(e) => eprintln!("Failed to mirror booking {}: {e}", booking.booking_id),
        }
    }
}

fn customer(id: i64, first_name: &str, last_name: &str) -> Customer {
    Customer {
        id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: Some(format!("{}@example.com", first_name.to_lowercase())),
    }
}

fn activity(id: i64, title: &str, cents: i64, start: &str, cancelled: bool) -> Activity {
    Activity {
        id,
        title: title.to_string(),
        total_price: Decimal::new(cents, 2),
        start_time: Some(start.to_string()),
        participant_count: 2,
        seller: Some("Rome Walks".to_string()),
        cancelled,
    }
}
