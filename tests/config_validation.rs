use std::time::Duration;

use wordcrawl::{Alphabet, ConfigError, CrawlConfig, Crawler, EntryRule, Termination};

#[test]
fn test_zero_cache_capacity_rejected() {
    let result = Crawler::builder().cache_capacity(0).build();

    match result {
        Err(ConfigError::InvalidCacheCapacity(0)) => {}
        _ => panic!("Expected InvalidCacheCapacity error"),
    }
}

#[test]
fn test_zero_max_in_flight_rejected() {
    let result = Crawler::builder().max_in_flight(0).build();

    match result {
        Err(ConfigError::InvalidMaxInFlight(0)) => {}
        _ => panic!("Expected InvalidMaxInFlight error"),
    }
}

#[test]
fn test_zero_record_limit_rejected() {
    let result = Crawler::builder().record_limit(0).build();

    match result {
        Err(ConfigError::InvalidRecordLimit(0)) => {}
        _ => panic!("Expected InvalidRecordLimit error"),
    }
}

#[test]
fn test_zero_quiet_interval_rejected() {
    let result = Crawler::builder().quiet_interval(Duration::ZERO).build();

    match result {
        Err(ConfigError::InvalidQuietInterval) => {}
        _ => panic!("Expected InvalidQuietInterval error"),
    }
}

#[test]
fn test_index_url_without_placeholder_rejected() {
    let result = Crawler::builder()
        .index_url("https://dict.test/browse/")
        .build();

    match result {
        Err(ConfigError::MissingPlaceholder(url)) => assert_eq!(url, "https://dict.test/browse/"),
        _ => panic!("Expected MissingPlaceholder error"),
    }
}

#[test]
fn test_invalid_entry_selector_rejected() {
    let result = Crawler::builder()
        .entry_rule(EntryRule::new().headword(".hw["))
        .build();

    match result {
        Err(ConfigError::InvalidSelector { selector, .. }) => assert_eq!(selector, ".hw["),
        _ => panic!("Expected InvalidSelector error"),
    }
}

#[test]
fn test_valid_configuration_accepted() {
    let result = Crawler::builder()
        .index_url("https://dict.test/browse/{}/")
        .alphabet("a-c".parse().unwrap())
        .quiet_interval(Duration::from_secs(5))
        .record_limit(100)
        .cache_capacity(10)
        .max_in_flight(8)
        .request_timeout(Duration::from_secs(2))
        .build();

    assert!(result.is_ok());
}

#[test]
fn test_defaults() {
    let config = CrawlConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.alphabet(), &Alphabet::latin());
    assert_eq!(config.termination(), Termination::QuietInterval(Duration::from_secs(30)));
    assert_eq!(config.cache_capacity(), 50);
    assert_eq!(config.max_in_flight(), None);
    assert_eq!(
        config.index_url(),
        "https://dictionary.cambridge.org/browse/english/{}/"
    );
}

#[test]
fn test_quiet_interval_keeps_record_limit() {
    let crawler = Crawler::builder()
        .record_limit(4000)
        .quiet_interval(Duration::from_secs(3))
        .build()
        .unwrap_or_else(|e| panic!("build failed: {e}"));

    assert_eq!(
        crawler.config().termination(),
        Termination::QuietIntervalOrLimit {
            quiet: Duration::from_secs(3),
            limit: 4000,
        }
    );
}

#[cfg(test)]
mod alphabet_tests {
    use super::*;

    #[test]
    fn test_range() {
        let alphabet: Alphabet = "a-e".parse().unwrap();
        assert_eq!(alphabet.symbols(), &['a', 'b', 'c', 'd', 'e']);
    }

    #[test]
    fn test_mixed_parts_dedup_in_order() {
        let alphabet: Alphabet = "x-z, abc, y, 0-2".parse().unwrap();
        assert_eq!(alphabet.to_string(), "xyzabc012");
    }

    #[test]
    fn test_reversed_range_rejected() {
        match "z-a".parse::<Alphabet>() {
            Err(ConfigError::InvalidAlphabet { spec, .. }) => assert_eq!(spec, "z-a"),
            other => panic!("Expected InvalidAlphabet error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_range_rejected() {
        assert!(matches!(
            "a-b-c".parse::<Alphabet>(),
            Err(ConfigError::InvalidAlphabet { .. })
        ));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!("".parse::<Alphabet>(), Err(ConfigError::EmptyAlphabet)));
        assert!(matches!(" , ,".parse::<Alphabet>(), Err(ConfigError::EmptyAlphabet)));
    }
}
