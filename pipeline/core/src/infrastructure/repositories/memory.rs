// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::domain::attribution::{AttributionWeight, ConversionWeightSum};
use crate::domain::report::ChannelDateAggregate;
use crate::domain::repository::{
    AttributionRepository, ReportRepository, RepositoryError, TouchpointStore,
};
use crate::domain::touchpoint::{Conversion, ConversionId, DateRange, SessionId, Touchpoint};

/// In-memory touchpoint store for development and tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    conversions: Arc<Mutex<Vec<Conversion>>>,
    touchpoints: Arc<Mutex<Vec<Touchpoint>>>,
    revenue: Arc<Mutex<HashMap<ConversionId, f64>>>,
    costs: Arc<Mutex<HashMap<SessionId, f64>>>,
    weights: Arc<Mutex<Vec<AttributionWeight>>>,
    report: Arc<Mutex<Vec<ChannelDateAggregate>>>,
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unknown("Mutex poisoned".to_string())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(conversions: Vec<Conversion>, touchpoints: Vec<Touchpoint>) -> Self {
        Self {
            conversions: Arc::new(Mutex::new(conversions)),
            touchpoints: Arc::new(Mutex::new(touchpoints)),
            ..Self::default()
        }
    }

    pub fn set_revenue(&self, conversion_id: ConversionId, revenue: f64) -> Result<(), RepositoryError> {
        self.revenue.lock().map_err(poisoned)?.insert(conversion_id, revenue);
        Ok(())
    }

    pub fn set_cost(&self, session_id: SessionId, cost: f64) -> Result<(), RepositoryError> {
        self.costs.lock().map_err(poisoned)?.insert(session_id, cost);
        Ok(())
    }

    /// Snapshot of the persisted attribution table.
    pub fn stored_weights(&self) -> Result<Vec<AttributionWeight>, RepositoryError> {
        Ok(self.weights.lock().map_err(poisoned)?.clone())
    }

    /// Snapshot of the persisted reporting table.
    pub fn stored_report(&self) -> Result<Vec<ChannelDateAggregate>, RepositoryError> {
        Ok(self.report.lock().map_err(poisoned)?.clone())
    }
}

#[async_trait]
impl TouchpointStore for InMemoryStore {
    async fn load_conversions(&self) -> Result<Vec<Conversion>, RepositoryError> {
        let mut conversions = self.conversions.lock().map_err(poisoned)?.clone();
        conversions.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.conversion_id.cmp(&b.conversion_id))
        });
        Ok(conversions)
    }

    async fn load_touchpoints(&self) -> Result<Vec<Touchpoint>, RepositoryError> {
        let mut touchpoints = self.touchpoints.lock().map_err(poisoned)?.clone();
        touchpoints.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(touchpoints)
    }
}

#[async_trait]
impl AttributionRepository for InMemoryStore {
    async fn replace_all(&self, weights: &[AttributionWeight]) -> Result<usize, RepositoryError> {
        let mut stored = self.weights.lock().map_err(poisoned)?;
        *stored = weights.to_vec();
        Ok(stored.len())
    }

    async fn weight_sums(&self) -> Result<Vec<ConversionWeightSum>, RepositoryError> {
        let stored = self.weights.lock().map_err(poisoned)?;
        let mut sums: BTreeMap<ConversionId, f64> = BTreeMap::new();
        for weight in stored.iter() {
            *sums.entry(weight.conversion_id.clone()).or_insert(0.0) += weight.weight;
        }
        Ok(sums
            .into_iter()
            .map(|(conversion_id, weight_sum)| ConversionWeightSum {
                conversion_id,
                weight_sum,
            })
            .collect())
    }
}

#[async_trait]
impl ReportRepository for InMemoryStore {
    async fn aggregate_by_channel_date(
        &self,
        range: DateRange,
    ) -> Result<Vec<ChannelDateAggregate>, RepositoryError> {
        let touchpoints = self.touchpoints.lock().map_err(poisoned)?.clone();
        let weights = self.weights.lock().map_err(poisoned)?.clone();
        let revenue = self.revenue.lock().map_err(poisoned)?.clone();
        let costs = self.costs.lock().map_err(poisoned)?.clone();
        let known_conversions: HashSet<ConversionId> = self
            .conversions
            .lock()
            .map_err(poisoned)?
            .iter()
            .map(|c| c.conversion_id.clone())
            .collect();

        // (weight, weighted revenue) per session, mirroring the inner join on conversions
        let mut attributed: HashMap<&SessionId, (f64, f64)> = HashMap::new();
        for weight in &weights {
            if !known_conversions.contains(&weight.conversion_id) {
                continue;
            }
            let conversion_revenue = revenue.get(&weight.conversion_id).copied().unwrap_or(0.0);
            let entry = attributed.entry(&weight.session_id).or_insert((0.0, 0.0));
            entry.0 += weight.weight;
            entry.1 += weight.weight * conversion_revenue;
        }

        let mut groups: BTreeMap<(chrono::NaiveDate, String), ChannelDateAggregate> = BTreeMap::new();
        for touchpoint in &touchpoints {
            let date = touchpoint.occurred_at.date();
            if !range.contains(date) {
                continue;
            }
            let Some((weight, weighted_revenue)) = attributed.get(&touchpoint.session_id) else {
                continue;
            };
            let aggregate = groups
                .entry((date, touchpoint.channel_label.clone()))
                .or_insert_with(|| ChannelDateAggregate {
                    channel_label: touchpoint.channel_label.clone(),
                    date,
                    cost: 0.0,
                    total_weight: 0.0,
                    weighted_revenue: 0.0,
                });
            aggregate.cost += costs.get(&touchpoint.session_id).copied().unwrap_or(0.0);
            aggregate.total_weight += weight;
            aggregate.weighted_revenue += weighted_revenue;
        }

        Ok(groups.into_values().collect())
    }

    async fn replace_report(&self, rows: &[ChannelDateAggregate]) -> Result<usize, RepositoryError> {
        let mut stored = self.report.lock().map_err(poisoned)?;
        *stored = rows.to_vec();
        Ok(stored.len())
    }
}
