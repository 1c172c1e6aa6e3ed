// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::domain::attribution::{AttributionWeight, ConversionWeightSum};
use crate::domain::report::ChannelDateAggregate;
use crate::domain::repository::{
    AttributionRepository, ReportRepository, RepositoryError, TouchpointStore,
};
use crate::domain::touchpoint::{
    parse_timestamp, Conversion, ConversionId, DateRange, IdentityId, SessionId, Touchpoint,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Touchpoint store backed by the SQLite reporting database.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_conversion(row: &SqliteRow) -> Result<Conversion, RepositoryError> {
    let occurred_at: String = row.try_get("occurred_at")?;
    Ok(Conversion {
        conversion_id: ConversionId(row.try_get("conv_id")?),
        identity_id: IdentityId(row.try_get("user_id")?),
        occurred_at: parse_timestamp(&occurred_at)?,
    })
}

fn map_touchpoint(row: &SqliteRow) -> Result<Touchpoint, RepositoryError> {
    let occurred_at: String = row.try_get("occurred_at")?;
    let holder: i64 = row.try_get("holder_engagement")?;
    let closer: i64 = row.try_get("closer_engagement")?;
    let impression: i64 = row.try_get("impression_interaction")?;
    Ok(Touchpoint {
        session_id: SessionId(row.try_get("session_id")?),
        identity_id: IdentityId(row.try_get("user_id")?),
        occurred_at: parse_timestamp(&occurred_at)?,
        channel_label: row.try_get("channel_name")?,
        holder_engagement: holder != 0,
        closer_engagement: closer != 0,
        impression_interaction: impression != 0,
    })
}

fn map_aggregate(row: &SqliteRow) -> Result<ChannelDateAggregate, RepositoryError> {
    let date: String = row.try_get("date")?;
    Ok(ChannelDateAggregate {
        channel_label: row.try_get("channel_name")?,
        date: NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)?,
        cost: row.try_get("cost")?,
        total_weight: row.try_get("ihc")?,
        weighted_revenue: row.try_get("ihc_revenue")?,
    })
}

#[async_trait]
impl TouchpointStore for SqliteStore {
    async fn load_conversions(&self) -> Result<Vec<Conversion>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                CAST(conv_id AS TEXT) AS conv_id,
                CAST(user_id AS TEXT) AS user_id,
                conv_date || ' ' || conv_time AS occurred_at
            FROM conversions
            ORDER BY conv_date, conv_time, conv_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to load conversions: {}", e)))?;

        rows.iter().map(map_conversion).collect()
    }

    async fn load_touchpoints(&self) -> Result<Vec<Touchpoint>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                CAST(session_id AS TEXT) AS session_id,
                CAST(user_id AS TEXT) AS user_id,
                event_date || ' ' || event_time AS occurred_at,
                channel_name,
                CAST(holder_engagement AS INTEGER) AS holder_engagement,
                CAST(closer_engagement AS INTEGER) AS closer_engagement,
                CAST(impression_interaction AS INTEGER) AS impression_interaction
            FROM session_sources
            ORDER BY event_date, event_time, session_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to load session sources: {}", e)))?;

        rows.iter().map(map_touchpoint).collect()
    }
}

#[async_trait]
impl AttributionRepository for SqliteStore {
    async fn replace_all(&self, weights: &[AttributionWeight]) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM attribution_customer_journey")
            .execute(&mut *tx)
            .await?;

        for weight in weights {
            sqlx::query(
                "INSERT INTO attribution_customer_journey (conv_id, session_id, ihc) VALUES (?, ?, ?)",
            )
            .bind(weight.conversion_id.as_str())
            .bind(weight.session_id.as_str())
            .bind(weight.weight)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to insert weight: {}", e)))?;
        }

        tx.commit().await?;
        Ok(weights.len())
    }

    async fn weight_sums(&self) -> Result<Vec<ConversionWeightSum>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(conv_id AS TEXT) AS conv_id, CAST(SUM(ihc) AS REAL) AS ihc_sum
            FROM attribution_customer_journey
            GROUP BY conv_id
            ORDER BY conv_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ConversionWeightSum, RepositoryError> {
                Ok(ConversionWeightSum {
                    conversion_id: ConversionId(row.try_get("conv_id")?),
                    weight_sum: row.try_get("ihc_sum")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ReportRepository for SqliteStore {
    async fn aggregate_by_channel_date(
        &self,
        range: DateRange,
    ) -> Result<Vec<ChannelDateAggregate>, RepositoryError> {
        let start = range.start.map(|d| d.format(DATE_FORMAT).to_string());
        let end = range.end.map(|d| d.format(DATE_FORMAT).to_string());

        // Weights are rolled up per session first so a session that feeds
        // several conversions contributes its cost once.
        let rows = sqlx::query(
            r#"
            WITH session_data AS (
                SELECT
                    ss.session_id,
                    ss.channel_name,
                    ss.event_date AS date,
                    COALESCE(sc.cost, 0) AS cost
                FROM session_sources ss
                LEFT JOIN session_costs sc ON ss.session_id = sc.session_id
                WHERE (? IS NULL OR ss.event_date >= ?)
                  AND (? IS NULL OR ss.event_date <= ?)
            ),
            attributed AS (
                SELECT
                    acj.session_id,
                    SUM(acj.ihc) AS ihc,
                    SUM(acj.ihc * c.revenue) AS ihc_revenue
                FROM attribution_customer_journey acj
                JOIN conversions c ON acj.conv_id = c.conv_id
                GROUP BY acj.session_id
            )
            SELECT
                sd.channel_name AS channel_name,
                sd.date AS date,
                CAST(SUM(sd.cost) AS REAL) AS cost,
                CAST(SUM(a.ihc) AS REAL) AS ihc,
                CAST(SUM(a.ihc_revenue) AS REAL) AS ihc_revenue
            FROM session_data sd
            JOIN attributed a ON sd.session_id = a.session_id
            GROUP BY sd.channel_name, sd.date
            ORDER BY sd.date, sd.channel_name
            "#,
        )
        .bind(start.clone())
        .bind(start)
        .bind(end.clone())
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to aggregate channel report: {}", e)))?;

        rows.iter().map(map_aggregate).collect()
    }

    async fn replace_report(&self, rows: &[ChannelDateAggregate]) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM channel_reporting")
            .execute(&mut *tx)
            .await?;

        for row in rows {
            sqlx::query(
                "INSERT INTO channel_reporting (channel_name, date, cost, ihc, ihc_revenue) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&row.channel_label)
            .bind(row.date.format(DATE_FORMAT).to_string())
            .bind(row.cost)
            .bind(row.total_weight)
            .bind(row.weighted_revenue)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(rows.len())
    }
}
