use zoneshard::channel::DocumentFilter;
use zoneshard::placement::{SetupStep, StepOutcome, ZoneReconciler};
use zoneshard::sample::SamplePopulator;
use zoneshard::{
    CollectionClass, Namespace, PlacementConfig, SetupState, ZoneConfig, ZoneError, ZoneSetup,
    simulated,
};

fn small_config() -> PlacementConfig {
    PlacementConfig {
        demo_data_size: 40,
        ..PlacementConfig::default()
    }
}

fn orders(database: &str) -> Namespace {
    Namespace::new(database, "orders")
}

#[tokio::test]
async fn two_shard_setup_keeps_each_zone_on_its_shard() {
    let (admin, cluster) = simulated(&["shardA", "shardB"]);
    let config = small_config();
    let setup = ZoneSetup::new(admin.clone(), config.clone()).expect("valid config");

    let run = setup.run().await.expect("setup");
    assert!(!run.report.has_failures(), "{:?}", run.report.failures().collect::<Vec<_>>());
    assert_eq!(run.reached, SetupState::RangesInstalled);
    assert_eq!(run.plan.shard_for("region1"), Some("shardA"));
    assert_eq!(run.plan.shard_for("region2"), Some("shardB"));
    assert_eq!(cluster.primary_of("app_region1").await.as_deref(), Some("shardA"));
    assert_eq!(cluster.primary_of("app_region2").await.as_deref(), Some("shardB"));

    let summary = SamplePopulator::new(admin, config.clone())
        .populate()
        .await
        .expect("populate");
    // 40 records over CN and TR
    assert_eq!(summary.for_namespace(&orders("app_region1")), 40);

    let auditor = setup.auditor();
    let region1 = ["CN".to_string(), "TR".to_string()];
    let region2 = ["AE", "US", "EU", "GB"].map(String::from);
    assert_eq!(
        auditor.count_in_zone(&orders("app_region1"), &region1).await.unwrap(),
        40
    );
    assert_eq!(
        auditor.count_in_zone(&orders("app_region1"), &region2).await.unwrap(),
        0
    );
    assert_eq!(
        auditor.count_in_zone(&orders("app_region2"), &region2).await.unwrap(),
        40
    );

    assert_eq!(cluster.documents_on(&orders("app_region1"), "shardA").await.len(), 40);
    assert!(cluster.documents_on(&orders("app_region1"), "shardB").await.is_empty());
    assert_eq!(cluster.documents_on(&orders("app_region2"), "shardB").await.len(), 40);

    let distribution = auditor.distribution(&orders("app_region2")).await.unwrap();
    assert_eq!(distribution.len(), 1);
    assert_eq!(distribution[0].shard_id, "shardB");

    let audits = setup.verify().await.expect("verify");
    assert_eq!(audits.len(), 2);
    assert!(audits.iter().all(|a| a.is_clean()));
}

#[tokio::test]
async fn common_collections_are_copied_verbatim_without_ranges() {
    let (admin, cluster) = simulated(&["shardA", "shardB"]);
    let config = small_config();
    let setup = ZoneSetup::new(admin.clone(), config.clone()).unwrap();
    setup.run().await.unwrap();
    SamplePopulator::new(admin, config.clone())
        .populate()
        .await
        .unwrap();

    let auditor = setup.auditor();
    for collection in &config.common_collections {
        let region1 = Namespace::new("app_region1", collection);
        let region2 = Namespace::new("app_region2", collection);

        let count = auditor.count_all(&region1).await.unwrap();
        assert!(count > 0, "{} is empty", region1);
        assert_eq!(auditor.count_all(&region2).await.unwrap(), count);
        assert_eq!(
            cluster.documents_on(&region1, "shardA").await,
            cluster.documents_on(&region2, "shardB").await
        );

        assert!(cluster.zone_ranges(&region1).await.is_empty());
        assert!(cluster.zone_ranges(&region2).await.is_empty());
    }
    assert!(!cluster.zone_ranges(&orders("app_region1")).await.is_empty());

    let audits = setup.verify().await.unwrap();
    for audit in &audits {
        let common: Vec<_> = audit
            .collections
            .iter()
            .filter(|c| c.class == CollectionClass::Common)
            .collect();
        assert_eq!(common.len(), config.common_collections.len());
        for row in common {
            assert!(row.total > 0);
            assert_eq!(row.in_zone, 0);
            assert!(row.distribution.is_empty());
            assert!(row.is_clean());
        }
    }
}

#[tokio::test]
async fn single_shard_hosts_every_zone() {
    let (admin, cluster) = simulated(&["only"]);
    let config = small_config();
    let setup = ZoneSetup::new(admin.clone(), config.clone()).unwrap();

    let run = setup.run().await.unwrap();
    assert!(!run.report.has_failures());
    assert_eq!(run.plan.shard_for("region1"), Some("only"));
    assert_eq!(run.plan.shard_for("region2"), Some("only"));

    SamplePopulator::new(admin, config).populate().await.unwrap();
    let auditor = setup.auditor();
    let total = auditor.count_all(&orders("app_region2")).await.unwrap();
    assert_eq!(total, 40);
    assert_eq!(cluster.documents_on(&orders("app_region2"), "only").await.len(), 40);

    let tags = cluster.zone_tags().await;
    assert_eq!(tags["only"], vec!["region1".to_string(), "region2".to_string()]);
}

#[tokio::test]
async fn rerunning_setup_changes_nothing() {
    let (admin, cluster) = simulated(&["shardA", "shardB"]);
    let setup = ZoneSetup::new(admin, small_config()).unwrap();

    setup.run().await.unwrap();
    let tags = cluster.zone_tags().await;
    let ranges = cluster.zone_ranges(&orders("app_region1")).await;

    let second = setup.run().await.unwrap();
    assert!(!second.report.has_failures());
    for step in [
        SetupStep::AssociateZone,
        SetupStep::EnableSharding,
        SetupStep::ShardCollection,
    ] {
        assert!(
            second
                .report
                .for_step(step)
                .all(|r| r.outcome == StepOutcome::AlreadySatisfied),
            "{} was not a no-op",
            step
        );
    }
    assert_eq!(cluster.zone_tags().await, tags);
    assert_eq!(cluster.zone_ranges(&orders("app_region1")).await, ranges);
}

#[tokio::test]
async fn reconcile_remove_reconcile_matches_single_reconcile() {
    let (admin, cluster) = simulated(&["shardA", "shardB", "shardC"]);
    let setup = ZoneSetup::new(admin.clone(), small_config()).unwrap();
    let plan = setup.plan().await.unwrap();
    let reconciler = ZoneReconciler::new(admin);

    reconciler.reconcile(&plan).await.unwrap();
    let once_tags = cluster.zone_tags().await;
    let once_zones = cluster.zone_names().await;

    let removed = reconciler.remove(&plan).await.unwrap();
    assert!(!removed.has_failures());
    assert!(cluster.zone_names().await.is_empty());

    let again = reconciler.reconcile(&plan).await.unwrap();
    assert_eq!(again.summary().applied, 2);
    assert_eq!(cluster.zone_tags().await, once_tags);
    assert_eq!(cluster.zone_names().await, once_zones);
    assert!(cluster.zone_tags().await["shardC"].is_empty());
}

#[tokio::test]
async fn failed_primary_move_skips_only_that_zone() {
    let (admin, cluster) = simulated(&["shardA", "shardB"]);
    let setup = ZoneSetup::new(admin, small_config()).unwrap();
    cluster
        .fail_next("move_primary", "could not acquire the database lock")
        .await;

    let run = setup.run().await.unwrap();
    assert!(run.report.has_failures());
    assert_eq!(run.reached, SetupState::ZonesCreated);
    assert!(
        run.report
            .for_zone("region1")
            .filter(|r| matches!(r.step, SetupStep::ShardCollection | SetupStep::InstallRange))
            .all(|r| matches!(r.outcome, StepOutcome::Skipped(_)))
    );
    assert!(run.report.zone_succeeded("region2"));
    assert!(cluster.zone_ranges(&orders("app_region1")).await.is_empty());
    assert_eq!(cluster.zone_ranges(&orders("app_region2")).await.len(), 4);

    let resumed = setup.run_from(run.reached).await.unwrap();
    assert!(!resumed.report.has_failures());
    assert_eq!(resumed.reached, SetupState::RangesInstalled);
    assert_eq!(cluster.zone_ranges(&orders("app_region1")).await.len(), 2);
}

#[tokio::test]
async fn rejected_range_is_reported_and_others_installed() {
    let (admin, cluster) = simulated(&["shardA", "shardB"]);
    let setup = ZoneSetup::new(admin, small_config()).unwrap();
    cluster
        .fail_next("update_zone_key_range", "balancer holds the chunk")
        .await;

    let run = setup.run().await.unwrap();
    let failures: Vec<_> = run.report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].step, SetupStep::InstallRange);
    assert_eq!(run.reached, SetupState::CollectionsSharded);
    // region1 orders lost its CN range only
    assert_eq!(cluster.zone_ranges(&orders("app_region1")).await.len(), 1);
    assert_eq!(
        cluster
            .zone_ranges(&Namespace::new("app_region1", "logs"))
            .await
            .len(),
        2
    );
}

#[tokio::test]
async fn unreachable_or_empty_cluster_is_unavailable() {
    let (admin, cluster) = simulated(&["shardA"]);
    cluster.set_available(false).await;
    let setup = ZoneSetup::new(admin, small_config()).unwrap();
    assert!(matches!(setup.run().await, Err(ZoneError::Unavailable(_))));
    assert!(matches!(setup.ping().await, Err(ZoneError::Unavailable(_))));

    let (admin, _) = simulated(&[]);
    let setup = ZoneSetup::new(admin, small_config()).unwrap();
    assert!(matches!(setup.plan().await, Err(ZoneError::Unavailable(_))));

    let (admin, _) = simulated(&["config"]);
    let setup = ZoneSetup::new(admin, small_config()).unwrap();
    assert!(matches!(setup.plan().await, Err(ZoneError::Unavailable(_))));
}

#[tokio::test]
async fn config_shard_is_never_a_zone_home() {
    let (admin, _) = simulated(&["config", "shardA", "shardB"]);
    let setup = ZoneSetup::new(admin, small_config()).unwrap();
    let plan = setup.plan().await.unwrap();
    assert_eq!(plan.shard_for("region1"), Some("shardA"));
    assert_eq!(plan.shard_for("region2"), Some("shardB"));
}

#[tokio::test]
async fn status_reports_planned_and_tagged_shards() {
    let (admin, _) = simulated(&["shardA", "shardB"]);
    let setup = ZoneSetup::new(admin, small_config()).unwrap();

    let before = setup.status().await.unwrap();
    assert_eq!(before.len(), 2);
    assert!(before.iter().all(|s| s.tagged_shards.is_empty()));
    assert!(!before[0].is_in_sync());

    setup.run().await.unwrap();
    let after = setup.status().await.unwrap();
    assert_eq!(after[0].zone, "region1");
    assert_eq!(after[0].planned_shard, "shardA");
    assert_eq!(after[0].tenant_ids, vec!["CN".to_string(), "TR".to_string()]);
    assert!(after[0].shard_host.as_deref().unwrap().contains("shardA"));
    assert!(after.iter().all(|s| s.is_in_sync()));
}

#[tokio::test]
async fn cleanup_removes_zones_and_databases() {
    let (admin, cluster) = simulated(&["shardA", "shardB"]);
    let config = small_config();
    let setup = ZoneSetup::new(admin.clone(), config.clone()).unwrap();
    setup.run().await.unwrap();
    SamplePopulator::new(admin.clone(), config).populate().await.unwrap();

    let report = setup.cleanup(true).await.unwrap();
    assert!(!report.has_failures());
    assert!(cluster.zone_names().await.is_empty());
    assert!(admin.list_databases().await.unwrap().is_empty());
    assert_eq!(
        admin
            .count_documents(&orders("app_region1"), DocumentFilter::All)
            .await
            .unwrap(),
        0
    );

    let again = setup.cleanup(true).await.unwrap();
    assert!(!again.has_failures());
}

#[tokio::test]
async fn custom_zones_follow_declaration_order() {
    let config = PlacementConfig::with_zones(vec![
        ZoneConfig::new("apac", ["JP", "SG"], "app_apac"),
        ZoneConfig::new("emea", ["DE"], "app_emea"),
        ZoneConfig::new("amer", ["US", "BR"], "app_amer"),
    ])
    .unwrap();
    let (admin, cluster) = simulated(&["s1", "s2"]);
    let setup = ZoneSetup::new(admin, config).unwrap();

    let run = setup.run().await.unwrap();
    assert!(!run.report.has_failures());
    assert_eq!(run.plan.shard_for("apac"), Some("s1"));
    assert_eq!(run.plan.shard_for("emea"), Some("s2"));
    assert_eq!(run.plan.shard_for("amer"), Some("s2"));
    assert_eq!(cluster.primary_of("app_amer").await.as_deref(), Some("s2"));
}
