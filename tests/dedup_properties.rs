// tests/dedup_properties.rs
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use topic_digest::analyze::dedup::{deduplicate, normalize_url};
use topic_digest::SearchResult;

const TITLES: &[&str] = &[
    "Fed raises rates by a quarter point",
    "Fed raises rates by a quarter point!",
    "Rust 1.90 released with new lints",
    "RUST 1.90 RELEASED WITH NEW LINTS",
    "Tokio 2.0 roadmap published",
    "Local bakery wins award",
    "Tokio 2.0 roadmap published (update)",
];

const URLS: &[&str] = &[
    "https://www.news.test/a/",
    "https://news.test/a?utm_source=rss",
    "HTTPS://NEWS.test/a#comments",
    "https://news.test/b",
    "https://blog.test/post/1",
    "https://blog.test/post/2/",
    "https://other.test/x",
    "https://other.test/y",
];

fn random_batch(rng: &mut StdRng) -> Vec<SearchResult> {
    let n = rng.random_range(0..25);
    (0..n)
        .map(|i| SearchResult {
            title: TITLES[rng.random_range(0..TITLES.len())].to_string(),
            url: URLS[rng.random_range(0..URLS.len())].to_string(),
            snippet: format!("snippet {i}"),
            published_at: None,
            source_name: "prop".into(),
        })
        .collect()
}

#[test]
fn dedup_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(0xD1D0);
    for _ in 0..200 {
        let batch = random_batch(&mut rng);
        let once = deduplicate(batch);
        let twice = deduplicate(once.clone());
        assert_eq!(once, twice);
    }
}

#[test]
fn dedup_preserves_first_occurrence_order() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let batch = random_batch(&mut rng);
        let out = deduplicate(batch.clone());

        // Output is a subsequence of the input (snippets are unique per position).
        let positions: Vec<usize> = out
            .iter()
            .map(|o| batch.iter().position(|b| b.snippet == o.snippet).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        // Each kept item is the first input item with its normalized URL.
        for (o, &pos) in out.iter().zip(&positions) {
            let key = normalize_url(&o.url);
            let first = batch.iter().position(|b| normalize_url(&b.url) == key).unwrap();
            assert_eq!(first, pos);
        }

        // Survivors have pairwise-distinct URLs.
        let mut keys: Vec<String> = out.iter().map(|o| normalize_url(&o.url)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), out.len());
    }
}

#[test]
fn url_variants_collapse_to_one_identity() {
    let a = normalize_url(URLS[0]);
    assert_eq!(a, normalize_url(URLS[1]));
    assert_eq!(a, normalize_url(URLS[2]));
    assert_ne!(a, normalize_url(URLS[3]));
}
