mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use common::*;
use tokio_util::sync::CancellationToken;
use wordcrawl::*;

const HEADER: &str = "word,noun,adjective,verb,phrasal verb,adverb";

fn crawler(fetcher: Arc<StaticFetcher>) -> CrawlerBuilder {
    Crawler::builder()
        .index_url(INDEX_TEMPLATE)
        .alphabet("a".parse().unwrap())
        .quiet_interval(Duration::from_secs(5))
        .fetcher(fetcher)
}

fn links(slugs: &[&str]) -> Vec<Link> {
    slugs.iter().map(|slug| Link::from(entry_url(slug))).collect()
}

fn csv_lines(sink: CsvSink<Vec<u8>>) -> Vec<String> {
    let bytes = sink.into_inner().unwrap();
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod end_to_end_tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_headword_written_once() {
        // Two URLs resolve to the same headword
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(&entry_url("run"), entry_page("run", &["verb", "noun"]))
                .page(&entry_url("running"), entry_page("run", &["verb", "noun"]))
                .page(&entry_url("jump"), entry_page("jump", &["verb"])),
        );
        let crawler = crawler(fetcher).max_in_flight(1).build().unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = crawler
            .crawl_links(links(&["run", "running", "jump"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(
            csv_lines(sink),
            vec![HEADER, "run,1,0,1,0,0", "jump,0,0,1,0,0"]
        );
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.missed, 0);
        assert_eq!(summary.close_reason, CloseReason::Exhausted);
    }

    #[tokio::test]
    async fn test_headless_pages_never_reach_sink() {
        let mut fetcher = StaticFetcher::new()
            .page(&entry_url("fox"), entry_page("fox", &["noun", "verb"]))
            .page(&entry_url("hen"), entry_page("hen", &["noun"]));
        let moved = ["moved-1", "moved-2", "moved-3", "moved-4"];
        for slug in moved {
            fetcher = fetcher.page(&entry_url(slug), headless_page());
        }
        let crawler = crawler(Arc::new(fetcher)).max_in_flight(1).build().unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = crawler
            .crawl_links(
                links(&["moved-1", "fox", "moved-2", "moved-3", "hen", "moved-4"]),
                &mut sink,
            )
            .await
            .unwrap();

        assert_eq!(
            csv_lines(sink),
            vec![HEADER, "fox,1,0,1,0,0", "hen,1,0,0,0,0"]
        );
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.missed, moved.len());
        assert_eq!(summary.duplicates, 0);
    }

    #[tokio::test]
    async fn test_only_headless_pages_leave_header_only() {
        let fetcher = Arc::new(StaticFetcher::new().page(&entry_url("moved"), headless_page()));
        let crawler = crawler(fetcher).build().unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = crawler
            .crawl_links(links(&["moved", "moved", "moved"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(csv_lines(sink), vec![HEADER]);
        assert_eq!(summary.accepted, 0);
        assert_eq!(summary.missed, 3);
    }

    #[tokio::test]
    async fn test_failed_entry_fetch_is_not_a_miss() {
        let fetcher = Arc::new(StaticFetcher::new().page(&entry_url("cat"), entry_page("cat", &["noun"])));
        let crawler = crawler(fetcher).build().unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = crawler
            .crawl_links(links(&["cat", "gone"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.missed, 0);
        assert_eq!(summary.stats.errors_encountered, 1);
        assert_eq!(summary.stats.pages_fetched, 1);
    }

    #[tokio::test]
    async fn test_record_limit_stops_crawl() {
        let slugs = ["ant", "bee", "cow", "dog", "eel"];
        let mut fetcher = StaticFetcher::new();
        for slug in slugs {
            fetcher = fetcher.page(&entry_url(slug), entry_page(slug, &["noun"]));
        }
        let crawler = crawler(Arc::new(fetcher))
            .max_in_flight(1)
            .record_limit(2)
            .build()
            .unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = crawler.crawl_links(links(&slugs), &mut sink).await.unwrap();

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.close_reason, CloseReason::RecordLimit);
        assert_eq!(csv_lines(sink).len(), 3);
    }

    #[tokio::test]
    async fn test_enumerated_crawl() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(
                    "https://dict.test/browse/a/",
                    format!(
                        "{}{}",
                        index_of_indices(&["/browse/a/a-ab/"]),
                        index_of_entries(&[
                            ("/dictionary/english/able", "adjective"),
                            ("/dictionary/english/at-all", "idiom"),
                        ])
                    ),
                )
                .page(
                    "https://dict.test/browse/a/a-ab/",
                    index_of_entries(&[("/dictionary/english/abandon", "verb")]),
                )
                .page(&entry_url("able"), entry_page("able", &["adjective"]))
                .page(&entry_url("abandon"), entry_page("abandon", &["verb", "noun"])),
        );
        let crawler = crawler(fetcher.clone()).build().unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = crawler.crawl(&mut sink).await.unwrap();

        let mut rows = csv_lines(sink);
        assert_eq!(rows.remove(0), HEADER);
        rows.sort();
        assert_eq!(rows, vec!["abandon,1,0,1,0,0", "able,0,1,0,0,0"]);

        assert_eq!(summary.close_reason, CloseReason::Exhausted);
        assert_eq!(summary.enumeration.index_pages, 2);
        assert_eq!(summary.enumeration.entry_links, 2);
        assert!(!fetcher.requests().contains(&entry_url("at-all")));
    }
}

#[cfg(test)]
mod termination_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_quiet_interval_closes_before_slow_fetch() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(&entry_url("quick"), entry_page("quick", &["adjective"]))
                .page(&entry_url("slow"), entry_page("slow", &["adjective"]))
                .delayed(&entry_url("slow"), Duration::from_secs(60)),
        );
        let crawler = crawler(fetcher)
            .quiet_interval(Duration::from_secs(1))
            .build()
            .unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = crawler
            .crawl_links(links(&["quick", "slow"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.close_reason, CloseReason::QuietInterval);
        assert_eq!(csv_lines(sink), vec![HEADER, "quick,0,1,0,0,0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_crawl() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(
                    "https://dict.test/browse/a/",
                    index_of_entries(&[("/dictionary/english/ache", "noun")]),
                )
                .page(&entry_url("ache"), entry_page("ache", &["noun", "verb"]))
                .delayed(&entry_url("ache"), Duration::from_secs(10)),
        );
        let crawler = crawler(fetcher)
            .quiet_interval(Duration::from_secs(600))
            .build()
            .unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let summary = crawler
            .crawl_with_cancellation(&mut sink, token)
            .await
            .unwrap();

        assert_eq!(summary.close_reason, CloseReason::Cancelled);
        assert_eq!(summary.accepted, 0);
        assert_eq!(csv_lines(sink), vec![HEADER]);
    }
}

#[cfg(test)]
mod summary_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_record_limit_keeps_partial_enumeration_totals() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(
                    "https://dict.test/browse/a/",
                    index_of_entries(&[("/dictionary/english/ant", "noun")]),
                )
                .page(
                    "https://dict.test/browse/b/",
                    index_of_entries(&[("/dictionary/english/bat", "noun")]),
                )
                .delayed("https://dict.test/browse/b/", Duration::from_secs(3))
                .page(&entry_url("ant"), entry_page("ant", &["noun"]))
                .page(&entry_url("bat"), entry_page("bat", &["noun"])),
        );
        let crawler = crawler(fetcher)
            .alphabet("a-b".parse().unwrap())
            .record_limit(1)
            .build()
            .unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = crawler.crawl(&mut sink).await.unwrap();

        assert_eq!(summary.close_reason, CloseReason::RecordLimit);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.enumeration.index_pages, 1);
        assert_eq!(summary.enumeration.entry_links, 1);
        assert!(summary.enumeration.symbols >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_keeps_enumeration_totals() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(
                    "https://dict.test/browse/a/",
                    index_of_indices(&["/browse/a/a-ab/"]),
                )
                .page(
                    "https://dict.test/browse/a/a-ab/",
                    index_of_entries(&[("/dictionary/english/abbey", "noun")]),
                )
                .delayed("https://dict.test/browse/a/a-ab/", Duration::from_secs(30)),
        );
        let crawler = crawler(fetcher)
            .quiet_interval(Duration::from_secs(600))
            .build()
            .unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let summary = crawler
            .crawl_with_cancellation(&mut sink, token)
            .await
            .unwrap();

        assert_eq!(summary.close_reason, CloseReason::Cancelled);
        assert_eq!(summary.enumeration.symbols, 1);
        assert_eq!(summary.enumeration.index_pages, 1);
        assert_eq!(summary.enumeration.entry_links, 0);
    }

    #[tokio::test]
    async fn test_second_run_starts_from_zero() {
        let fetcher = Arc::new(StaticFetcher::new().page(&entry_url("elk"), entry_page("elk", &["noun"])));
        let crawler = crawler(fetcher).build().unwrap();
        let mut stats_rx = crawler.subscribe_stats();

        let mut first_sink = CsvSink::new(Vec::new()).unwrap();
        let first = crawler
            .crawl_links(links(&["elk"]), &mut first_sink)
            .await
            .unwrap();
        let _ = stats_rx.borrow_and_update();

        let mut second_sink = CsvSink::new(Vec::new()).unwrap();
        let second = crawler
            .crawl_links(links(&["elk"]), &mut second_sink)
            .await
            .unwrap();

        assert_eq!(first.stats.pages_fetched, 1);
        assert_eq!(second.accepted, 1);
        assert_eq!(second.stats.pages_fetched, 1);
        assert_eq!(second.stats.links_queued, 1);

        // Subscribers keep receiving updates across runs
        assert!(stats_rx.has_changed().unwrap());
        let latest = stats_rx.borrow_and_update().clone();
        assert_eq!(latest.pages_fetched, 1);
        assert_eq!(latest.links_queued, 1);
        assert_eq!(crawler.stats().pages_fetched, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_all_published() {
        let tracker = Arc::new(StatsTracker::new());
        let stats_rx = tracker.subscribe();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    for _ in 0..250 {
                        tracker.page_fetched();
                        tracker.link_queued();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let latest = stats_rx.borrow().clone();
        assert_eq!(latest.pages_fetched, 2000);
        assert_eq!(latest.links_queued, 2000);
    }
}

#[cfg(test)]
mod observer_tests {
    use super::*;

    #[derive(Default)]
    struct CountingObserver {
        queued: AtomicUsize,
        fetched: AtomicUsize,
        errors: AtomicUsize,
        accepted: AtomicUsize,
        unresolved: AtomicUsize,
        completed: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CrawlObserver for CountingObserver {
        async fn on_link_queued(&self, _link: &Link) {
            self.queued.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_page_fetched(&self, _link: &Link) {
            self.fetched.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_fetch_error(&self, _url: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_record_accepted(&self, _index: usize, _record: &Record) {
            self.accepted.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_unresolved(&self, _link: &Link) {
            self.unresolved.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_crawl_complete(&self, _summary: &CrawlSummary) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_observer_sees_every_event() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page(&entry_url("owl"), entry_page("owl", &["noun"]))
                .page(&entry_url("moved"), headless_page()),
        );
        let observer = Arc::new(CountingObserver::default());
        let crawler = crawler(fetcher)
            .observe_with(observer.clone())
            .build()
            .unwrap();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = crawler
            .crawl_links(links(&["owl", "moved", "missing"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(observer.queued.load(Ordering::SeqCst), 3);
        assert_eq!(observer.fetched.load(Ordering::SeqCst), 2);
        assert_eq!(observer.errors.load(Ordering::SeqCst), 1);
        assert_eq!(observer.accepted.load(Ordering::SeqCst), 1);
        assert_eq!(observer.unresolved.load(Ordering::SeqCst), 1);
        assert_eq!(observer.completed.load(Ordering::SeqCst), 1);
        assert_eq!(summary.stats.links_queued, 3);
    }

    #[tokio::test]
    async fn test_stats_subscription_sees_progress() {
        let fetcher = Arc::new(StaticFetcher::new().page(&entry_url("elk"), entry_page("elk", &["noun"])));
        let crawler = crawler(fetcher).build().unwrap();
        let stats_rx = crawler.subscribe_stats();
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        crawler
            .crawl_links(links(&["elk"]), &mut sink)
            .await
            .unwrap();

        let latest = stats_rx.borrow().clone();
        assert_eq!(latest.links_queued, 1);
        assert_eq!(latest.pages_fetched, 1);
        assert_eq!(crawler.stats().pages_fetched, 1);
    }
}
