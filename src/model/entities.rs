//! Visit, companion and timeline action bodies, and their partial updates.

use super::area::{ParkArea, ParkType};
use crate::types::{Collection, Document, Record, RecordId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type Visit = Record<VisitData>;
pub type Companion = Record<CompanionData>;
pub type TimelineAction = Record<ActionData>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Weather {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCategory {
    Attraction,
    Restaurant,
    Show,
    Greeting,
    Shopping,
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// A single day at one of the parks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitData {
    pub date: NaiveDate,
    pub park_type: ParkType,
    #[serde(default)]
    pub companion_ids: Vec<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_photo_count: Option<u32>,
}

impl VisitData {
    pub fn new(date: NaiveDate, park_type: ParkType) -> Self {
        Self {
            date,
            park_type,
            companion_ids: Vec::new(),
            notes: None,
            weather: None,
            start_time: None,
            end_time: None,
            action_count: None,
            total_photo_count: None,
        }
    }

    pub fn with_companions(mut self, ids: Vec<RecordId>) -> Self {
        self.companion_ids = ids;
        self
    }

    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Minutes between start and end, when both are known.
    pub fn duration_minutes(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 60_000.0),
            _ => None,
        }
    }
}

impl Document for VisitData {
    const COLLECTION: Collection = Collection::Visits;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionData {
    pub name: String,
    #[serde(default)]
    pub visit_ids: Vec<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CompanionData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visit_ids: Vec::new(),
            avatar: None,
            notes: None,
        }
    }
}

impl Document for CompanionData {
    const COLLECTION: Collection = Collection::Companions;
}

/// Reference to a photo attached to an action. The file itself lives
/// outside the journal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl PhotoRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            thumbnail_uri: None,
            caption: None,
        }
    }
}

/// One entry on a visit's timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionData {
    pub visit_id: RecordId,
    pub category: ActionCategory,
    pub area: ParkArea,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    pub time: DateTime<Utc>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_amount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchased_items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performer_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
}

impl ActionData {
    pub fn new(
        visit_id: RecordId,
        category: ActionCategory,
        area: impl Into<ParkArea>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            visit_id,
            category,
            area: area.into(),
            location_name: None,
            time,
            duration: None,
            wait_time: None,
            notes: None,
            photos: Vec::new(),
            meal_type: None,
            purchase_amount: None,
            purchased_items: None,
            performer_names: None,
            show_time: None,
            custom_title: None,
            sort_order: None,
        }
    }

    pub fn at(mut self, location_name: impl Into<String>) -> Self {
        self.location_name = Some(location_name.into());
        self
    }
}

impl Document for ActionData {
    const COLLECTION: Collection = Collection::Actions;
}

// --- Partial updates ---
//
// `None` leaves a field alone. Nullable fields take `Some(None)` to clear.

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub park_type: Option<ParkType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion_ids: Option<Vec<RecordId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Option<Weather>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_count: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_photo_count: Option<Option<u32>>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

/// Companion-side bookkeeping; only the visit repository writes this.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompanionVisitsPatch {
    pub visit_ids: Vec<RecordId>,
}

/// Visit-side bookkeeping for companion deletion.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VisitCompanionsPatch {
    pub companion_ids: Vec<RecordId>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ActionCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<ParkArea>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<PhotoRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<Option<MealType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_amount: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased_items: Option<Option<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performer_names: Option<Option<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_time: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<Option<u32>>,
}

/// Append `id` unless already present. Keeps first-seen order.
pub(crate) fn insert_id(ids: &mut Vec<RecordId>, id: RecordId) -> bool {
    if ids.contains(&id) {
        false
    } else {
        ids.push(id);
        true
    }
}

/// Drop duplicates, keeping first-seen order.
pub(crate) fn dedup_ids(ids: &[RecordId]) -> Vec<RecordId> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        insert_id(&mut out, *id);
    }
    out
}

/// Set equality over id lists.
pub(crate) fn same_id_set(a: &[RecordId], b: &[RecordId]) -> bool {
    a.iter().all(|id| b.contains(id)) && b.iter().all(|id| a.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::area::LandArea;
    use chrono::TimeZone;

    #[test]
    fn test_visit_optional_fields_omitted() {
        let visit = VisitData::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), ParkType::Land);
        let value = serde_json::to_value(&visit).unwrap();
        assert_eq!(value["date"], "2024-03-01");
        assert_eq!(value["parkType"], "LAND");
        assert_eq!(value["companionIds"], serde_json::json!([]));
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_patch_clear_serializes_null() {
        let patch = VisitPatch {
            notes: Some(None),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({"notes": null}));
    }

    #[test]
    fn test_duration_minutes() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 21, 30, 0).unwrap();
        let visit = VisitData::new(start.date_naive(), ParkType::Sea).with_times(start, end);
        assert_eq!(visit.duration_minutes(), Some(750.0));

        let open = VisitData::new(start.date_naive(), ParkType::Sea);
        assert_eq!(open.duration_minutes(), None);
    }

    #[test]
    fn test_action_deserializes_without_optional_fields() {
        let json = serde_json::json!({
            "visitId": 4,
            "category": "ATTRACTION",
            "area": "TOMORROWLAND",
            "time": "2024-03-01T10:15:00Z"
        });
        let action: ActionData = serde_json::from_value(json).unwrap();
        assert_eq!(action.visit_id, RecordId(4));
        assert_eq!(action.area, ParkArea::Land(LandArea::Tomorrowland));
        assert!(action.photos.is_empty());
    }

    #[test]
    fn test_id_set_helpers() {
        let ids = dedup_ids(&[RecordId(2), RecordId(1), RecordId(2)]);
        assert_eq!(ids, vec![RecordId(2), RecordId(1)]);
        assert!(same_id_set(&ids, &[RecordId(1), RecordId(2)]));
        assert!(!same_id_set(&ids, &[RecordId(1)]));
    }
}
