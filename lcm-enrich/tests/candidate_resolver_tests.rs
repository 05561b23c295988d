//! Candidate resolver tests: strategy order, dedup, cap, error propagation

mod helpers;

use helpers::{candidate, MockPartsSource};
use lcm_enrich::models::Candidate;
use lcm_enrich::services::{find_candidates, generate_variants, SourceError, MAX_CANDIDATES};
use std::collections::HashSet;

fn hits(range: std::ops::Range<u32>) -> Vec<Candidate> {
    range.map(|n| candidate(&n.to_string(), &format!("PART{}", n))).collect()
}

#[tokio::test]
async fn test_no_hits_anywhere_is_empty_not_error() {
    let source = MockPartsSource::new();

    let candidates = find_candidates(&source, "XYZ-999", Some("mystery part"))
        .await
        .unwrap();

    assert!(candidates.is_empty());
    // exact, every variant, then the description
    let mut expected = vec!["XYZ-999".to_string()];
    expected.extend(generate_variants("XYZ-999"));
    expected.push("mystery part".to_string());
    assert_eq!(source.searches(), expected);
}

#[tokio::test]
async fn test_capped_at_twenty_without_duplicates() {
    // variants of "TPS62160DGKR" (12 chars): TPS62160DGK, TPS62160DG, ...
    let source = MockPartsSource::new()
        .with_search("TPS62160DGKR", hits(1..16))
        .with_search("TPS62160DGK", hits(10..26))
        .with_search("TPS62160DG", hits(30..40));

    let candidates = find_candidates(&source, "TPS62160DGKR", Some("buck converter"))
        .await
        .unwrap();

    assert_eq!(candidates.len(), MAX_CANDIDATES);
    let ids: HashSet<&str> = candidates.iter().map(|c| c.external_part_id.as_str()).collect();
    assert_eq!(ids.len(), candidates.len());

    // discovery order: exact hits first, then new ids from the first variant
    assert_eq!(candidates[0].external_part_id, "1");
    assert_eq!(candidates[14].external_part_id, "15");
    assert_eq!(candidates[15].external_part_id, "16");
    assert_eq!(candidates[19].external_part_id, "20");

    // cap reached: remaining variants and the description are never searched
    assert_eq!(
        source.searches(),
        vec!["TPS62160DGKR".to_string(), "TPS62160DGK".to_string()]
    );
}

#[tokio::test]
async fn test_description_searched_trimmed_when_under_cap() {
    let source = MockPartsSource::new()
        .with_search("LM358", vec![candidate("1", "LM358")])
        .with_search("dual op amp", vec![candidate("1", "LM358"), candidate("2", "LM358A")]);

    let candidates = find_candidates(&source, "LM358", Some("  dual op amp  "))
        .await
        .unwrap();

    let ids: Vec<&str> = candidates.iter().map(|c| c.external_part_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(source.searches().last().map(String::as_str), Some("dual op amp"));
}

#[tokio::test]
async fn test_blank_description_not_searched() {
    let source = MockPartsSource::new();

    find_candidates(&source, "LM358", Some("   ")).await.unwrap();

    assert_eq!(source.searches(), vec!["LM358".to_string()]);
}

#[tokio::test]
async fn test_authentication_error_propagates() {
    let source = MockPartsSource::new();
    source.set_auth_failure(true);

    let err = find_candidates(&source, "LM358", None).await.unwrap_err();

    assert!(matches!(err, SourceError::Authentication(_)));
}

#[tokio::test]
async fn test_source_error_on_variant_propagates() {
    let source = MockPartsSource::new().with_search_error(
        "ATMEGA328PAU",
        SourceError::Source {
            code: 503,
            message: "busy".to_string(),
        },
    );

    let err = find_candidates(&source, "ATMEGA328P-AU", None).await.unwrap_err();

    assert!(matches!(err, SourceError::Source { code: 503, .. }));
}

#[tokio::test]
async fn test_blank_identifier_is_never_searched() {
    let source = MockPartsSource::new()
        .with_search("10k resistor", vec![candidate("7", "RC0603")]);

    let candidates = find_candidates(&source, "  ", Some("10k resistor"))
        .await
        .unwrap();

    assert!(candidates.is_empty());
    assert!(source.searches().is_empty());
}
