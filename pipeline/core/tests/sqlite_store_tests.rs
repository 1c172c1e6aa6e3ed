// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! SQLite store tests.
//!
//! Runs every store operation against a migrated in-memory database:
//! source loading, whole-table weight replacement, per-conversion sums and
//! the channel/date aggregation behind the report.

use chrono::NaiveDate;
use ihc_attribution_core::domain::attribution::AttributionWeight;
use ihc_attribution_core::domain::report::ChannelDateAggregate;
use ihc_attribution_core::domain::repository::{
    AttributionRepository, ReportRepository, TouchpointStore,
};
use ihc_attribution_core::domain::touchpoint::DateRange;
use ihc_attribution_core::infrastructure::db::Database;
use ihc_attribution_core::infrastructure::repositories::SqliteStore;
use sqlx::SqlitePool;

async fn seeded_store() -> (SqliteStore, SqlitePool) {
    let database = Database::connect_and_migrate("sqlite::memory:").await.unwrap();
    let pool = database.get_pool().clone();

    sqlx::raw_sql(
        r#"
        INSERT INTO conversions (conv_id, user_id, conv_date, conv_time, revenue) VALUES
            ('c2', 'u1', '2024-02-03', '18:00:00', 50.0),
            ('c1', 'u1', '2024-02-03', '12:00:00', 100.0),
            ('c3', 'u2', '2024-02-04', '09:00:00', 10.0);
        INSERT INTO session_sources
            (session_id, user_id, event_date, event_time, channel_name, holder_engagement, closer_engagement, impression_interaction)
        VALUES
            ('s1', 'u1', '2024-02-01', '10:00:00', 'SEA', 1, 0, 0),
            ('s2', 'u1', '2024-02-02', '10:00:00', 'Display', 0, 1, 1),
            ('s3', 'u1', '2024-02-03', '15:00:00', 'SEA', 0, 0, 0);
        INSERT INTO session_costs (session_id, cost) VALUES ('s1', 20.0), ('s2', 5.0);
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    (SqliteStore::new(pool.clone()), pool)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
}

#[tokio::test]
async fn test_load_conversions_in_time_order() {
    let (store, _pool) = seeded_store().await;

    let conversions = store.load_conversions().await.unwrap();

    let ids: Vec<&str> = conversions.iter().map(|c| c.conversion_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert_eq!(conversions[0].identity_id.as_str(), "u1");
    assert_eq!(conversions[0].occurred_at, day(3).and_hms_opt(12, 0, 0).unwrap());
}

#[tokio::test]
async fn test_load_touchpoints_maps_flags() {
    let (store, _pool) = seeded_store().await;

    let touchpoints = store.load_touchpoints().await.unwrap();

    assert_eq!(touchpoints.len(), 3);
    let display = &touchpoints[1];
    assert_eq!(display.session_id.as_str(), "s2");
    assert_eq!(display.channel_label, "Display");
    assert!(!display.holder_engagement);
    assert!(display.closer_engagement);
    assert!(display.impression_interaction);
}

#[tokio::test]
async fn test_replace_all_overwrites_previous_run() {
    let (store, pool) = seeded_store().await;

    store
        .replace_all(&[
            AttributionWeight::new("old".into(), "s9".into(), 1.0),
            AttributionWeight::new("old".into(), "s8".into(), 0.0),
        ])
        .await
        .unwrap();
    let written = store
        .replace_all(&[AttributionWeight::new("c1".into(), "s1".into(), 1.0)])
        .await
        .unwrap();

    assert_eq!(written, 1);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attribution_customer_journey")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_weight_sums_per_conversion() {
    let (store, _pool) = seeded_store().await;
    store
        .replace_all(&[
            AttributionWeight::new("c1".into(), "s1".into(), 0.25),
            AttributionWeight::new("c1".into(), "s2".into(), 0.75),
            AttributionWeight::new("c2".into(), "s3".into(), 0.5),
        ])
        .await
        .unwrap();

    let sums = store.weight_sums().await.unwrap();

    assert_eq!(sums.len(), 2);
    assert_eq!(sums[0].conversion_id.as_str(), "c1");
    assert_eq!(sums[0].weight_sum, 1.0);
    assert_eq!(sums[1].weight_sum, 0.5);
}

#[tokio::test]
async fn test_aggregate_counts_session_cost_once() {
    let (store, _pool) = seeded_store().await;
    store
        .replace_all(&[
            AttributionWeight::new("c1".into(), "s1".into(), 0.5),
            AttributionWeight::new("c1".into(), "s2".into(), 0.5),
            AttributionWeight::new("c2".into(), "s1".into(), 0.25),
            AttributionWeight::new("c2".into(), "s3".into(), 0.75),
        ])
        .await
        .unwrap();

    let aggregates = store.aggregate_by_channel_date(DateRange::unbounded()).await.unwrap();

    assert_eq!(
        aggregates,
        vec![
            ChannelDateAggregate {
                channel_label: "SEA".to_string(),
                date: day(1),
                cost: 20.0,
                total_weight: 0.75,
                weighted_revenue: 62.5,
            },
            ChannelDateAggregate {
                channel_label: "Display".to_string(),
                date: day(2),
                cost: 5.0,
                total_weight: 0.5,
                weighted_revenue: 50.0,
            },
            ChannelDateAggregate {
                channel_label: "SEA".to_string(),
                date: day(3),
                cost: 0.0,
                total_weight: 0.75,
                weighted_revenue: 37.5,
            },
        ]
    );

    let filtered = store
        .aggregate_by_channel_date(DateRange::new(Some(day(2)), Some(day(3))))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 2);
    assert_eq!(filtered[0].date, day(2));
}

#[tokio::test]
async fn test_replace_report_round_trip() {
    let (store, pool) = seeded_store().await;
    let rows = vec![ChannelDateAggregate {
        channel_label: "SEA".to_string(),
        date: day(1),
        cost: 20.0,
        total_weight: 0.75,
        weighted_revenue: 62.5,
    }];

    assert_eq!(store.replace_report(&rows).await.unwrap(), 1);
    assert_eq!(store.replace_report(&rows).await.unwrap(), 1);

    let (channel, date): (String, String) =
        sqlx::query_as("SELECT channel_name, date FROM channel_reporting")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(channel, "SEA");
    assert_eq!(date, "2024-02-01");
}
