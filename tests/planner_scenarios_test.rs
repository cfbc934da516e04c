//! Planner scenarios against an in-memory store and scripted providers:
//! identical recrawls, insignificant edits, section-level changes, and a
//! site pivot.

mod common;

use common::{homepage, record, section_data, test_settings, MockCrawler, MockCurator};
use sitepulse::{
    PageRecord, PlanDecision, Planner, Project, ProjectStatus, SectionData, Store, TriggerReason,
};
use std::collections::HashMap;

const HOME: &str = "https://example.com";

fn curated_fixture() -> Vec<SectionData> {
    vec![
        section_data(
            "Platform Features",
            &[
                ("https://example.com/features", "Features"),
                ("https://example.com/platform", "Platform"),
            ],
        ),
        section_data(
            "Resources",
            &[
                ("https://example.com/docs", "Docs"),
                ("https://example.com/blog", "Blog"),
            ],
        ),
        section_data(
            "Company",
            &[
                ("https://example.com/about", "About"),
                ("https://example.com/team", "Team"),
            ],
        ),
    ]
}

fn baseline_crawl() -> Vec<PageRecord> {
    vec![
        homepage(HOME, "h-home"),
        record("https://example.com/features", "h-features"),
        record("https://example.com/platform", "h-platform"),
        record("https://example.com/docs", "h-docs"),
        record("https://example.com/blog", "h-blog"),
        record("https://example.com/about", "h-about"),
        record("https://example.com/team", "h-team"),
    ]
}

/// Create a ready project with curated state, inventory, and artifact v1
/// matching `baseline_crawl`.
async fn seed(store: &Store) -> Project {
    let project = store.create_project(HOME, "Example").await.unwrap();
    store
        .set_project_status(&project.id, ProjectStatus::Ready)
        .await
        .unwrap();

    let page_hashes: HashMap<String, String> = baseline_crawl()
        .iter()
        .map(|p| (p.url.clone(), p.content_hash.clone()))
        .collect();

    store
        .replace_curated_state(
            &project.id,
            "Example",
            "An example site",
            "Example does things.",
            &curated_fixture(),
            &page_hashes,
            &HashMap::new(),
        )
        .await
        .unwrap();

    let urls: Vec<String> = baseline_crawl().iter().map(|p| p.url.clone()).collect();
    store.store_inventory(&project.id, &urls).await.unwrap();

    store
        .save_artifact(&project.id, "seed artifact", "seed-hash", TriggerReason::Initial)
        .await
        .unwrap();

    store.get_project(&project.id).await.unwrap().unwrap()
}

#[tokio::test]
async fn identical_recrawl_is_noop_and_writes_no_artifact() {
    let store = Store::memory().await.unwrap();
    let project = seed(&store).await;
    let settings = test_settings();

    let crawl = baseline_crawl();
    let crawler = MockCrawler::new(crawl.clone());
    let curator = MockCurator::new();
    let planner = Planner::new(&store, &crawler, &curator, &settings);

    let plan = planner.plan(&project, &crawl).await.unwrap();
    assert_eq!(plan.decision, PlanDecision::NoOp);
    assert!(plan.hash_mismatch.is_empty());
    assert!(plan.removed_from_site.is_empty());
    assert!(plan.affected_sections.is_empty());

    let outcome = planner
        .execute(&project, &plan, &crawl, TriggerReason::ScheduledCheck)
        .await
        .unwrap();
    assert!(!outcome.did_work);
    assert!(outcome.artifact_version.is_none());

    let versions = store.list_artifact_versions(&project.id).await.unwrap();
    assert_eq!(versions.len(), 1, "no new artifact version on a no-op");
}

#[tokio::test]
async fn insignificant_change_touches_zero_sections() {
    let store = Store::memory().await.unwrap();
    let project = seed(&store).await;
    let settings = test_settings();

    let mut crawl = baseline_crawl();
    crawl
        .iter_mut()
        .find(|p| p.url.ends_with("/about"))
        .unwrap()
        .content_hash = "h-about-v2".to_string();

    let crawler = MockCrawler::new(crawl.clone());
    // The provider sees the change but judges it cosmetic.
    let curator = MockCurator::new();
    let planner = Planner::new(&store, &crawler, &curator, &settings);

    let plan = planner.plan(&project, &crawl).await.unwrap();
    assert_eq!(plan.hash_mismatch, vec!["https://example.com/about"]);
    assert!(plan.significant_changes.is_empty());
    assert_eq!(plan.decision, PlanDecision::NoOp);
    assert!(plan.affected_sections.is_empty());

    let outcome = planner
        .execute(&project, &plan, &crawl, TriggerReason::ScheduledCheck)
        .await
        .unwrap();
    assert!(!outcome.did_work);
    assert!(curator.regenerated.lock().unwrap().is_empty());

    let versions = store.list_artifact_versions(&project.id).await.unwrap();
    assert_eq!(versions.len(), 1);
}

#[tokio::test]
async fn significant_section_change_regenerates_only_that_section() {
    let store = Store::memory().await.unwrap();
    let project = seed(&store).await;
    let settings = test_settings();

    let mut crawl = baseline_crawl();
    crawl
        .iter_mut()
        .find(|p| p.url.ends_with("/features"))
        .unwrap()
        .content_hash = "h-features-v2".to_string();

    let crawler = MockCrawler::new(crawl.clone());
    let curator = MockCurator::new().with_significant(&["https://example.com/features"]);
    let planner = Planner::new(&store, &crawler, &curator, &settings);

    let plan = planner.plan(&project, &crawl).await.unwrap();
    assert_eq!(plan.decision, PlanDecision::Selective);
    assert_eq!(
        plan.affected_sections.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["Platform Features"]
    );

    let outcome = planner
        .execute(&project, &plan, &crawl, TriggerReason::LightweightChangeDetected)
        .await
        .unwrap();
    assert!(outcome.did_work);
    assert_eq!(outcome.sections_regenerated, vec!["Platform Features"]);
    assert_eq!(
        *curator.regenerated.lock().unwrap(),
        vec!["Platform Features"]
    );

    // Untouched sections keep their stored prose byte for byte, and the
    // merged artifact carries both.
    let sections = store.get_curated_sections(&project.id).await.unwrap();
    let resources = sections.iter().find(|s| s.name == "Resources").unwrap();
    assert_eq!(resources.description, "Resources prose.");

    let artifact = store.get_artifact(&project.id).await.unwrap().unwrap();
    assert!(artifact.content.contains("Fresh prose for Platform Features."));
    assert!(artifact.content.contains("Resources prose."));

    let versions = store.list_artifact_versions(&project.id).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version, 2);
    assert_eq!(
        versions[0].trigger_reason,
        Some(TriggerReason::LightweightChangeDetected)
    );
}

#[tokio::test]
async fn site_pivot_forces_full_regeneration() {
    let store = Store::memory().await.unwrap();
    let project = seed(&store).await;
    let settings = test_settings();

    // Keep four curated URLs, drop two, add nine new ones: the expansion
    // rule fires on its own.
    let mut crawl: Vec<PageRecord> = vec![
        homepage(HOME, "h-home"),
        record("https://example.com/features", "h-features"),
        record("https://example.com/platform", "h-platform"),
        record("https://example.com/docs", "h-docs"),
        record("https://example.com/blog", "h-blog"),
    ];
    for i in 0..9 {
        crawl.push(record(&format!("https://example.com/new-{i}"), &format!("h-new-{i}")));
    }

    let crawler = MockCrawler::new(crawl.clone());
    let curator = MockCurator::new().with_curation(vec![
        section_data("Solutions", &[("https://example.com/new-0", "New Zero")]),
        section_data("Other", &[("https://example.com/new-1", "New One")]),
    ]);
    let planner = Planner::new(&store, &crawler, &curator, &settings);

    let plan = planner.plan(&project, &crawl).await.unwrap();
    assert!(matches!(plan.decision, PlanDecision::FullRegeneration(_)));
    assert_eq!(plan.new_relevant.len(), 9);
    assert_eq!(plan.removed_from_site.len(), 2);

    let outcome = planner
        .execute(&project, &plan, &crawl, TriggerReason::ScheduledCheck)
        .await
        .unwrap();
    assert!(outcome.did_work);
    assert_eq!(outcome.artifact_version, Some(2));

    // Every section was replaced by the full curation result.
    let sections = store.get_curated_sections(&project.id).await.unwrap();
    let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Solutions"));
    assert!(names.contains(&"Other"));

    let versions = store.list_artifact_versions(&project.id).await.unwrap();
    assert_eq!(versions[0].version, 2);
    assert_eq!(versions[0].trigger_reason, Some(TriggerReason::ScheduledCheck));
}

#[tokio::test]
async fn missing_curated_state_forces_full_build() {
    let store = Store::memory().await.unwrap();
    let project = store.create_project(HOME, "Example").await.unwrap();
    store
        .set_project_status(&project.id, ProjectStatus::Ready)
        .await
        .unwrap();
    let project = store.get_project(&project.id).await.unwrap().unwrap();
    let settings = test_settings();

    let crawl = baseline_crawl();
    let crawler = MockCrawler::new(crawl.clone());
    let curator = MockCurator::new().with_curation(vec![section_data(
        "Resources",
        &[("https://example.com/docs", "Docs")],
    )]);
    let planner = Planner::new(&store, &crawler, &curator, &settings);

    let plan = planner.plan(&project, &crawl).await.unwrap();
    assert!(matches!(plan.decision, PlanDecision::FullRegeneration(_)));

    let outcome = planner
        .execute(&project, &plan, &crawl, TriggerReason::Initial)
        .await
        .unwrap();
    assert!(outcome.did_work);
    assert_eq!(outcome.artifact_version, Some(1));
}
