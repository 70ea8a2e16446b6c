// tests/prefilter_properties.rs
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use topic_digest::analyze::prefilter;
use topic_digest::SearchResult;

fn random_batch(rng: &mut StdRng) -> Vec<SearchResult> {
    let base = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
    let n = rng.random_range(0..30);
    (0..n)
        .map(|i| SearchResult {
            title: format!("t{i}"),
            url: format!("https://example.test/{i}"),
            snippet: String::new(),
            published_at: rng
                .random_bool(0.7)
                .then(|| base + Duration::hours(rng.random_range(0..240))),
            source_name: "prop".into(),
        })
        .collect()
}

#[test]
fn output_is_newest_first_with_undated_last() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let batch = random_batch(&mut rng);
        let max = rng.random_range(0..35);
        let out = prefilter(batch, max);
        for w in out.windows(2) {
            match (w[0].published_at, w[1].published_at) {
                (Some(a), Some(b)) => assert!(a >= b),
                (_, None) => {}
                (None, Some(_)) => panic!("undated item sorted before a dated one"),
            }
        }
    }
}

#[test]
fn output_is_bounded_and_stable() {
    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..200 {
        let batch = random_batch(&mut rng);
        let max = rng.random_range(0..35);
        let out = prefilter(batch.clone(), max);
        assert!(out.len() <= batch.len().min(max));
        assert_eq!(out.len(), batch.len().min(max));

        // Equal keys keep input order: compare input positions within runs.
        let pos = |r: &SearchResult| batch.iter().position(|b| b.url == r.url).unwrap();
        for w in out.windows(2) {
            if w[0].published_at == w[1].published_at {
                assert!(pos(&w[0]) < pos(&w[1]));
            }
        }
    }
}
