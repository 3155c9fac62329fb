use approx::assert_relative_eq;
use chrono::DateTime;
use encoding_rs::WINDOWS_1251;
use rate_keeper::database::{CurrencyMetadata, InMemoryRepository, Repository};
use rate_keeper::datafeed::{FeedNormalizer, FeedParser, FileSource, NormalizeStrategy, ParseStrategy};
use rate_keeper::metrics::RefreshMetrics;
use rate_keeper::rates::RatesCache;
use rate_keeper::refresh::RefreshService;
use rate_keeper::schedule::{ManualClock, UpdateScheduler};
use std::sync::Arc;
use tempfile::TempDir;

const FEED: &str = r#"<?xml version="1.0" encoding="windows-1251"?><ValCurs Date="02.03.2024" name="Foreign Currency Market"><Valute ID="R01235"><NumCode>840</NumCode><CharCode>USD</CharCode><Nominal>1</Nominal><Name>Доллар США</Name><Value>90,1234</Value><VunitRate>90,1234</VunitRate></Valute><Valute ID="R01239"><NumCode>978</NumCode><CharCode>EUR</CharCode><Nominal>1</Nominal><Name>Евро</Name><Value>98,5678</Value><VunitRate>98,5678</VunitRate></Valute></ValCurs>"#;

fn write_feed(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("currencies.xml");
    let (bytes, _, had_errors) = WINDOWS_1251.encode(FEED);
    assert!(!had_errors);
    std::fs::write(&path, &bytes).unwrap();
    path
}

fn metadata() -> Vec<CurrencyMetadata> {
    vec![
        CurrencyMetadata {
            num_code: 840,
            char_code: "USD".to_string(),
            name: "Доллар США".to_string(),
            multiplier: 1,
        },
        CurrencyMetadata {
            num_code: 978,
            char_code: "EUR".to_string(),
            name: "Евро".to_string(),
            multiplier: 1,
        },
    ]
}

fn service(source_path: std::path::PathBuf, repository: Arc<InMemoryRepository>, strategy: NormalizeStrategy, parse: ParseStrategy) -> RefreshService {
    let clock = Arc::new(ManualClock::new(
        DateTime::parse_from_rfc3339("2024-03-02T14:00:00+03:00").unwrap(),
    ));
    let scheduler = UpdateScheduler::new("13:30:00", clock.clone()).unwrap();

    RefreshService::new(
        Arc::new(FileSource::new(source_path)),
        repository,
        Arc::new(RatesCache::new()),
        scheduler,
        clock,
        RefreshMetrics::new().unwrap(),
    )
    .with_normalizer(FeedNormalizer::new(strategy))
    .with_parser(FeedParser::new(parse, 8))
}

#[tokio::test]
async fn test_feed_to_cache_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Arc::new(InMemoryRepository::with_metadata(metadata()));
    let service = service(
        write_feed(&dir),
        repository.clone(),
        NormalizeStrategy::NumericFields,
        ParseStrategy::Streaming,
    );

    let outcome = service.run_cycle().await.unwrap();
    assert!(outcome.refreshed);
    assert_eq!(outcome.currencies, 2);

    let calculated = service.cache().calculated().await.unwrap();
    assert_eq!(calculated.len(), 2);

    assert_eq!(calculated[0].char_code, "USD");
    assert_eq!(calculated[0].name, "Доллар США");
    assert_eq!(calculated[0].ratio, format!("{}", 1.0 / 90.1234_f64));
    assert_relative_eq!(calculated[0].ratio.parse::<f64>().unwrap(), 0.011096, epsilon = 1e-6);

    assert_eq!(calculated[1].char_code, "EUR");
    assert_eq!(calculated[1].ratio, format!("{}", 1.0 / 98.5678_f64));
    assert_relative_eq!(calculated[1].ratio.parse::<f64>().unwrap(), 0.010145, epsilon = 1e-6);

    let latest = repository.latest_update_datetime().await.unwrap().unwrap();
    assert_eq!(latest.update_datetime, "2024-03-02T14:00:00+03:00");
    assert_eq!(repository.value_count().await, 2);
}

#[tokio::test]
async fn test_all_strategy_combinations_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_feed(&dir);
    let mut results = Vec::new();

    for normalizer in [
        NormalizeStrategy::NumericFields,
        NormalizeStrategy::Positional { offset: 100 },
    ] {
        for parse in [ParseStrategy::Document, ParseStrategy::Streaming] {
            let repository = Arc::new(InMemoryRepository::with_metadata(metadata()));
            let service = service(path.clone(), repository, normalizer, parse);

            service.run_cycle().await.unwrap();
            results.push(service.cache().calculated().await.unwrap());
        }
    }

    for result in &results[1..] {
        assert_eq!(result, &results[0]);
    }
}
