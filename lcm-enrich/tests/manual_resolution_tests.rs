//! Manual resolution tests: commit writes, aggregate recompute, session flow

mod helpers;

use helpers::{
    candidate, create_test_db, enrichment_columns_blank, item_by_value, seed_assembly,
    MockPartsSource,
};
use lcm_common::events::{EventBus, LcmEvent};
use lcm_common::EnrichmentStatus;
use lcm_enrich::db::{assemblies, line_items};
use lcm_enrich::models::{FallbackFields, PartDetails};
use lcm_enrich::services::{
    BatchOrchestrator, EnrichmentEngine, ManualResolver, ResolutionError, ResolutionState,
    SessionError, SourceError,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Assembly with one enriched item and two failed ones
///
/// Seeded through an automatic run against a source that only knows LM358.
async fn seed_with_failures(pool: &SqlitePool) -> Uuid {
    let id = seed_assembly(
        pool,
        &[("LM358", "op amp"), ("XYZ-999", "mystery"), ("ABC-123", "connector")],
    )
    .await;
    let seeding = Arc::new(MockPartsSource::new().with_search("LM358", vec![candidate("1", "LM358")]));
    let engine = EnrichmentEngine::new(seeding);
    let orchestrator = BatchOrchestrator::new(pool.clone(), engine, EventBus::new(10));
    while !orchestrator.run_batch(id).await.unwrap().is_done() {}
    id
}

fn base_source() -> MockPartsSource {
    MockPartsSource::new()
}

#[tokio::test]
async fn test_resolution_clears_prior_error() {
    let pool = create_test_db().await;
    let source = Arc::new(base_source().with_details(
        "500",
        PartDetails {
            manufacturer: Some("Mystery Corp".to_string()),
            lifecycle_status: Some("NRND".to_string()),
            rohs_status: Some("Compliant".to_string()),
            ..Default::default()
        },
    ));
    let id = seed_with_failures(&pool).await;
    let event_bus = EventBus::new(10);
    let mut rx = event_bus.subscribe();
    let resolver = ManualResolver::new(pool.clone(), source.clone(), event_bus);

    let item = item_by_value(&pool, id, "XYZ-999").await;
    assert!(item.enrichment.error.is_some());

    let fallback = FallbackFields {
        description: Some("Picked by hand".to_string()),
        ..Default::default()
    };
    let summary = resolver.resolve(id, item.id, "500", &fallback).await.unwrap();

    let resolved = item_by_value(&pool, id, "XYZ-999").await;
    assert_eq!(resolved.enrichment.error, None);
    assert!(resolved.enrichment.enriched_at.is_some());
    assert_eq!(resolved.enrichment.external_part_id.as_deref(), Some("500"));
    assert_eq!(resolved.enrichment.manufacturer.as_deref(), Some("Mystery Corp"));
    assert_eq!(resolved.enrichment.description.as_deref(), Some("Picked by hand"));
    assert_eq!(resolved.enrichment.lifecycle_status.as_deref(), Some("NRND"));
    assert_eq!(resolved.enrichment.reach_status.as_deref(), Some(""));

    assert_eq!(summary.enriched_count, 2);
    assert_eq!(summary.enrichable_total, 3);
    assert_eq!(summary.status, EnrichmentStatus::Partial);

    match rx.try_recv().unwrap() {
        LcmEvent::ItemResolved {
            item_id,
            external_part_id,
            enriched_total,
            ..
        } => {
            assert_eq!(item_id, item.id);
            assert_eq!(external_part_id, "500");
            assert_eq!(enriched_total, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_last_resolution_completes_assembly() {
    let pool = create_test_db().await;
    let source = Arc::new(base_source());
    let id = seed_with_failures(&pool).await;
    let resolver = ManualResolver::new(pool.clone(), source.clone(), EventBus::new(10));

    for value in ["XYZ-999", "ABC-123"] {
        let item = item_by_value(&pool, id, value).await;
        resolver
            .resolve(id, item.id, "77", &FallbackFields::default())
            .await
            .unwrap();
    }

    let assembly = assemblies::require_assembly(&pool, id).await.unwrap();
    assert_eq!(assembly.enrichment_status, EnrichmentStatus::Completed);
    assert_eq!(assembly.enriched_count, 3);
    assert!(line_items::list_failed(&pool, id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_details_failure_uses_supplied_fields() {
    let pool = create_test_db().await;
    let source = Arc::new(base_source().with_failing_details());
    let id = seed_with_failures(&pool).await;
    let resolver = ManualResolver::new(pool.clone(), source.clone(), EventBus::new(10));
    let item = item_by_value(&pool, id, "ABC-123").await;

    let fallback = FallbackFields {
        manufacturer: Some("Molex".to_string()),
        description: Some("Header 2x5".to_string()),
        datasheet_url: Some("https://example.com/molex.pdf".to_string()),
    };
    resolver.resolve(id, item.id, "900", &fallback).await.unwrap();

    let resolved = item_by_value(&pool, id, "ABC-123").await;
    assert_eq!(resolved.enrichment.manufacturer.as_deref(), Some("Molex"));
    assert_eq!(resolved.enrichment.description.as_deref(), Some("Header 2x5"));
    assert_eq!(
        resolved.enrichment.datasheet_url.as_deref(),
        Some("https://example.com/molex.pdf")
    );
    assert_eq!(resolved.enrichment.lifecycle_status.as_deref(), Some(""));
}

#[tokio::test]
async fn test_resolved_item_never_reenters_automatic_path() {
    let pool = create_test_db().await;
    let source = Arc::new(base_source());
    let id = seed_with_failures(&pool).await;
    let resolver = ManualResolver::new(pool.clone(), source.clone(), EventBus::new(10));
    let item = item_by_value(&pool, id, "XYZ-999").await;

    resolver
        .resolve(id, item.id, "501", &FallbackFields::default())
        .await
        .unwrap();

    assert!(line_items::list_unprocessed(&pool, id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resolve_rejects_blank_part_and_unknown_item() {
    let pool = create_test_db().await;
    let source = Arc::new(base_source());
    let id = seed_with_failures(&pool).await;
    let resolver = ManualResolver::new(pool.clone(), source.clone(), EventBus::new(10));
    let item = item_by_value(&pool, id, "XYZ-999").await;

    let err = resolver
        .resolve(id, item.id, "  ", &FallbackFields::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::Store(lcm_common::Error::InvalidInput(_))
    ));

    let err = resolver
        .resolve(id, Uuid::new_v4(), "1", &FallbackFields::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ResolutionError::Store(lcm_common::Error::NotFound(_))));
}

#[tokio::test]
async fn test_candidates_for_failed_item() {
    let pool = create_test_db().await;
    let source = Arc::new(
        base_source()
            .with_search("ABC123", vec![candidate("5", "ABC123"), candidate("6", "ABC123-T")])
            .with_search("connector", vec![candidate("6", "ABC123-T"), candidate("7", "CONN")]),
    );
    let id = seed_with_failures(&pool).await;
    let resolver = ManualResolver::new(pool.clone(), source.clone(), EventBus::new(10));
    let item = item_by_value(&pool, id, "ABC-123").await;

    let candidates = resolver.candidates_for(id, item.id).await.unwrap();

    let ids: Vec<&str> = candidates.iter().map(|c| c.external_part_id.as_str()).collect();
    assert_eq!(ids, vec!["5", "6", "7"]);
}

#[tokio::test]
async fn test_candidates_auth_error_surfaces() {
    let pool = create_test_db().await;
    let source = Arc::new(base_source());
    let id = seed_with_failures(&pool).await;
    let resolver = ManualResolver::new(pool.clone(), source.clone(), EventBus::new(10));
    let item = item_by_value(&pool, id, "ABC-123").await;
    source.set_auth_failure(true);

    let err = resolver.candidates_for(id, item.id).await.unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::Source(SourceError::Authentication(_))
    ));
}

#[tokio::test]
async fn test_session_commit_auto_advances() {
    let pool = create_test_db().await;
    let source = Arc::new(
        base_source()
            .with_search("XYZ-999", vec![candidate("31", "XYZ-999A")])
            .with_search("ABC-123", vec![candidate("41", "ABC-123")]),
    );
    let id = seed_with_failures(&pool).await;
    let resolver = ManualResolver::new(pool.clone(), source.clone(), EventBus::new(10));

    let mut session = resolver.start_session(id).await.unwrap();
    assert_eq!(session.remaining().count(), 2);
    assert_eq!(session.state(), &ResolutionState::Idle);

    let first = item_by_value(&pool, id, "XYZ-999").await;
    let second = item_by_value(&pool, id, "ABC-123").await;

    resolver.select(&mut session, first.id).await.unwrap();
    assert!(matches!(session.state(), ResolutionState::Listing { candidates, .. } if candidates.len() == 1));

    let next = resolver.commit(&mut session, "31").await.unwrap();
    assert_eq!(next, Some(second.id));
    // the next item was searched automatically
    assert!(matches!(
        session.state(),
        ResolutionState::Listing { item_id, .. } if *item_id == second.id
    ));

    let next = resolver.commit(&mut session, "41").await.unwrap();
    assert_eq!(next, None);
    assert_eq!(session.state(), &ResolutionState::Idle);

    let assembly = assemblies::require_assembly(&pool, id).await.unwrap();
    assert_eq!(assembly.enrichment_status, EnrichmentStatus::Completed);
}

#[tokio::test]
async fn test_session_empty_and_rejected_commit() {
    let pool = create_test_db().await;
    let source = Arc::new(base_source());
    let id = seed_with_failures(&pool).await;
    let resolver = ManualResolver::new(pool.clone(), source.clone(), EventBus::new(10));
    let item = item_by_value(&pool, id, "XYZ-999").await;

    let mut session = resolver.start_session(id).await.unwrap();
    resolver.select(&mut session, item.id).await.unwrap();
    assert_eq!(session.state(), &ResolutionState::Empty { item_id: item.id });

    let err = resolver.commit(&mut session, "1").await.unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::Session(SessionError::InvalidTransition { action: "commit", .. })
    ));
}

#[tokio::test]
async fn test_blank_identifier_item_rejected_by_resolution() {
    let pool = create_test_db().await;
    let id = seed_assembly(&pool, &[("LM358", "op amp"), ("", "10k resistor")]).await;
    let seeding = Arc::new(MockPartsSource::new().with_search("LM358", vec![candidate("1", "LM358")]));
    let orchestrator =
        BatchOrchestrator::new(pool.clone(), EnrichmentEngine::new(seeding), EventBus::new(10));
    while !orchestrator.run_batch(id).await.unwrap().is_done() {}

    let source = Arc::new(
        base_source().with_search("10k resistor", vec![candidate("7", "RC0603")]),
    );
    let resolver = ManualResolver::new(pool.clone(), source.clone(), EventBus::new(10));
    let blank = item_by_value(&pool, id, "").await;

    let err = resolver.candidates_for(id, blank.id).await.unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::Store(lcm_common::Error::InvalidInput(_))
    ));

    let err = resolver
        .resolve(id, blank.id, "7", &FallbackFields::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::Store(lcm_common::Error::InvalidInput(_))
    ));
    assert!(source.calls().is_empty());

    let untouched = item_by_value(&pool, id, "").await;
    assert!(enrichment_columns_blank(&untouched));

    let assembly = assemblies::require_assembly(&pool, id).await.unwrap();
    assert_eq!(assembly.enriched_count, 1);
    assert!(assembly.enriched_count <= assembly.enrichable_total);
    assert_eq!(assembly.enrichment_status, EnrichmentStatus::Completed);
}
