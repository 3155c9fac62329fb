//! Round trip against a real PostgreSQL instance.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use rate_keeper::database::{run_migrations, PgRepository, Repository};
use rate_keeper::rates::{CurrencyRecord, Snapshot};
use sqlx::postgres::PgPoolOptions;

fn record(num_code: i32, char_code: &str, name: &str, value: &str) -> CurrencyRecord {
    CurrencyRecord {
        num_code,
        char_code: char_code.to_string(),
        multiplier: 1,
        name: name.to_string(),
        value: value.to_string(),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable PostgreSQL database"]
async fn test_snapshot_round_trip() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let repository = PgRepository::new(pool);
    repository.health_check().await.unwrap();

    let snapshot = Snapshot::new(vec![
        record(978, "EUR", "Евро", "98.5678"),
        record(840, "USD", "Доллар США", "90.1234"),
    ]);

    let update = repository
        .insert_snapshot("2024-03-02T14:00:00+03:00", &snapshot)
        .await
        .unwrap();

    let latest = repository.latest_update_datetime().await.unwrap().unwrap();
    assert_eq!(latest, update);

    let stored = repository.latest_currencies(update.id).await.unwrap();
    let codes: Vec<&str> = stored.iter().map(|c| c.char_code.as_str()).collect();
    assert_eq!(codes, vec!["USD", "EUR"]);
    assert_eq!(stored.find("USD").unwrap().value, "90.1234");
    assert_eq!(stored.find("EUR").unwrap().name, "Евро");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable PostgreSQL database"]
async fn test_unknown_currency_rolls_back_update() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let repository = PgRepository::new(pool);
    let before = repository.latest_update_datetime().await.unwrap();

    let unknown = Snapshot::new(vec![record(999, "XXX", "Unknown", "1.0")]);
    assert!(repository
        .insert_snapshot("2024-03-02T14:00:00+03:00", &unknown)
        .await
        .is_err());

    assert_eq!(repository.latest_update_datetime().await.unwrap(), before);
}
