//! Aggregate statistics over visits and timeline actions.
//!
//! Pure functions over snapshots; the journal resolves the working set.

use crate::model::{ActionCategory, Companion, ParkType, TimelineAction, Visit};
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Entries kept in each ranking.
pub const TOP_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteCompanion {
    pub companion: Companion,
    pub visit_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitStatistics {
    pub total_visits: usize,
    pub land_visits: usize,
    pub sea_visits: usize,

    /// Mean minutes over visits with both times; `None` if there are none.
    pub average_visit_duration: Option<f64>,

    pub favorite_companions: Vec<FavoriteCompanion>,

    /// Keyed `YYYY-MM`.
    pub visits_by_month: BTreeMap<String, usize>,
    pub visits_by_year: BTreeMap<i32, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCount {
    pub location_name: String,
    pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStatistics {
    pub total_actions: usize,
    pub by_category: BTreeMap<ActionCategory, usize>,

    /// Mean minutes over actions that record a wait.
    pub average_wait_time: Option<f64>,

    pub top_locations: Vec<LocationCount>,
    pub total_photos: usize,
    pub total_spent: u64,
}

pub fn visit_statistics(visits: &[Visit], companions: &[Companion]) -> VisitStatistics {
    let mut stats = VisitStatistics {
        total_visits: visits.len(),
        ..Default::default()
    };

    let mut companion_counts = Vec::new();
    let mut durations = Vec::new();

    for visit in visits {
        match visit.park_type {
            ParkType::Land => stats.land_visits += 1,
            ParkType::Sea => stats.sea_visits += 1,
        }

        if let Some(minutes) = visit.duration_minutes() {
            durations.push(minutes);
        }

        for id in &visit.companion_ids {
            bump(&mut companion_counts, *id);
        }

        *stats
            .visits_by_month
            .entry(visit.date.format("%Y-%m").to_string())
            .or_insert(0) += 1;
        *stats.visits_by_year.entry(visit.date.year()).or_insert(0) += 1;
    }

    stats.average_visit_duration = mean(&durations);

    stats.favorite_companions = ranked(companion_counts)
        .into_iter()
        .take(TOP_LIMIT)
        .filter_map(|(id, visit_count)| {
            let companion = companions.iter().find(|c| c.id == id)?;
            Some(FavoriteCompanion {
                companion: companion.clone(),
                visit_count,
            })
        })
        .collect();

    stats
}

pub fn action_statistics(actions: &[TimelineAction]) -> ActionStatistics {
    let mut stats = ActionStatistics {
        total_actions: actions.len(),
        ..Default::default()
    };

    let mut waits = Vec::new();
    let mut locations: Vec<(String, usize)> = Vec::new();

    for action in actions {
        *stats.by_category.entry(action.category).or_insert(0) += 1;

        if let Some(wait) = action.wait_time {
            waits.push(f64::from(wait));
        }
        if let Some(name) = &action.location_name {
            bump(&mut locations, name.clone());
        }

        stats.total_photos += action.photos.len();
        stats.total_spent += action.purchase_amount.map(u64::from).unwrap_or(0);
    }

    stats.average_wait_time = mean(&waits);
    stats.top_locations = ranked(locations)
        .into_iter()
        .take(TOP_LIMIT)
        .map(|(location_name, count)| LocationCount {
            location_name,
            count,
        })
        .collect();

    stats
}

/// Count `key` in an insertion-ordered tally.
fn bump<K: PartialEq>(tally: &mut Vec<(K, usize)>, key: K) {
    match tally.iter_mut().find(|(k, _)| *k == key) {
        Some((_, count)) => *count += 1,
        None => tally.push((key, 1)),
    }
}

/// Highest count first; ties keep first-seen order.
fn ranked<K>(mut tally: Vec<(K, usize)>) -> Vec<(K, usize)> {
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
