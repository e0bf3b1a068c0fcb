//! Integration tests for the park journal.

use chrono::{NaiveDate, TimeZone, Utc};
use park_journal::{
    ActionCategory, ActionData, CompanionData, Journal, JournalConfig, LandArea, ParkType,
    RecordId, SeaArea, VisitData, VisitFilter, VisitPatch, Weather,
};
use tempfile::TempDir;

fn test_journal(dir: &TempDir) -> Journal {
    Journal::open(JournalConfig {
        path: dir.path().join("journal"),
        ..Default::default()
    })
    .unwrap()
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

// --- Realistic Workflow Tests ---

#[test]
fn test_visit_lifecycle_scenario() {
    let dir = TempDir::new().unwrap();
    let journal = test_journal(&dir);

    let c1 = journal.create_companion(CompanionData::new("Mika")).unwrap();
    let v1 = journal
        .create_visit(VisitData::new(date(3, 1), ParkType::Land).with_companions(vec![c1.id]))
        .unwrap();
    let v2 = journal
        .create_visit(VisitData::new(date(3, 15), ParkType::Sea))
        .unwrap();
    let a1 = journal
        .create_action(ActionData::new(
            v1.id,
            ActionCategory::Attraction,
            LandArea::Westernland,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        ))
        .unwrap();

    assert_eq!(journal.get_actions_by_visit(v1.id).unwrap(), vec![a1]);
    assert_eq!(
        journal.get_companion(c1.id).unwrap().unwrap().visit_ids,
        vec![v1.id]
    );
    assert_eq!(
        journal
            .get_filtered_visits(&VisitFilter::new().park(ParkType::Sea))
            .unwrap(),
        vec![v2]
    );

    let stats = journal.get_visit_statistics(None).unwrap();
    assert_eq!(stats.total_visits, 2);
    assert_eq!(stats.land_visits, 1);

    assert!(journal.delete_visit(v1.id).unwrap());

    assert!(journal.get_actions_by_visit(v1.id).unwrap().is_empty());
    assert!(journal
        .get_companion(c1.id)
        .unwrap()
        .unwrap()
        .visit_ids
        .is_empty());
    assert_eq!(journal.get_visit_statistics(None).unwrap().total_visits, 1);
}

#[test]
fn test_day_at_the_sea() {
    let dir = TempDir::new().unwrap();
    let journal = test_journal(&dir);

    let ren = journal.create_companion(CompanionData::new("Ren")).unwrap();
    let mut data = VisitData::new(date(7, 20), ParkType::Sea)
        .with_companions(vec![ren.id])
        .with_times(
            Utc.with_ymd_and_hms(2024, 7, 20, 8, 45, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 20, 21, 15, 0).unwrap(),
        );
    data.weather = Some(Weather::Sunny);
    let visit = journal.create_visit(data).unwrap();

    let stops = [
        (ActionCategory::Attraction, SeaArea::MysteriousIsland, "Journey", 9, Some(70)),
        (ActionCategory::Restaurant, SeaArea::ArabianCoast, "Casbah", 12, None),
        (ActionCategory::Attraction, SeaArea::AmericanWaterfront, "Tower", 14, Some(90)),
        (ActionCategory::Show, SeaArea::MediterraneanHarbor, "Harbor Show", 19, None),
    ];
    for (category, area, name, hour, wait) in stops {
        let mut action = ActionData::new(
            visit.id,
            category,
            area,
            Utc.with_ymd_and_hms(2024, 7, 20, hour, 0, 0).unwrap(),
        )
        .at(name);
        action.wait_time = wait;
        journal.create_action(action).unwrap();
    }

    let counters = journal.refresh_visit_counters(visit.id).unwrap().unwrap();
    assert_eq!(counters.action_count, Some(4));

    let stats = journal.get_action_statistics(Some(visit.id)).unwrap();
    assert_eq!(stats.total_actions, 4);
    assert_eq!(stats.average_wait_time, Some(80.0));
    assert_eq!(stats.by_category.get(&ActionCategory::Attraction), Some(&2));

    let visit_stats = journal.get_visit_statistics(None).unwrap();
    assert_eq!(visit_stats.average_visit_duration, Some(750.0));
    assert_eq!(visit_stats.favorite_companions.len(), 1);
    assert_eq!(visit_stats.favorite_companions[0].companion.id, ren.id);
    assert_eq!(visit_stats.visits_by_month.get("2024-07"), Some(&1));
}

#[test]
fn test_filtered_statistics() {
    let journal = Journal::in_memory();
    let a = journal.create_companion(CompanionData::new("A")).unwrap();

    journal
        .create_visit(VisitData::new(date(1, 5), ParkType::Land).with_companions(vec![a.id]))
        .unwrap();
    journal
        .create_visit(VisitData::new(date(2, 5), ParkType::Land))
        .unwrap();
    journal
        .create_visit(VisitData::new(date(2, 6), ParkType::Sea).with_companions(vec![a.id]))
        .unwrap();

    let february = VisitFilter::new().between(date(2, 1), date(2, 29));
    let stats = journal.get_visit_statistics(Some(&february)).unwrap();
    assert_eq!(stats.total_visits, 2);
    assert_eq!(stats.sea_visits, 1);

    let with_a = VisitFilter::new().with_companions(vec![a.id]);
    assert_eq!(journal.get_filtered_visits(&with_a).unwrap().len(), 2);

    let land_feb = VisitFilter::new()
        .park(ParkType::Land)
        .between(date(2, 1), date(2, 29));
    let visits = journal.get_filtered_visits(&land_feb).unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].date, date(2, 5));
}

#[test]
fn test_companion_links_stay_symmetric() {
    let journal = Journal::in_memory();
    let a = journal.create_companion(CompanionData::new("A")).unwrap();
    let b = journal.create_companion(CompanionData::new("B")).unwrap();
    let c = journal.create_companion(CompanionData::new("C")).unwrap();

    let v = journal
        .create_visit(VisitData::new(date(4, 1), ParkType::Land).with_companions(vec![a.id, b.id]))
        .unwrap();
    journal
        .update_visit(
            v.id,
            VisitPatch {
                companion_ids: Some(vec![b.id, c.id]),
                ..Default::default()
            },
        )
        .unwrap();
    journal.delete_companion(b.id).unwrap();

    let visit = journal.get_visit(v.id).unwrap().unwrap();
    assert_eq!(visit.companion_ids, vec![c.id]);
    assert!(journal.get_companion(a.id).unwrap().unwrap().visit_ids.is_empty());
    assert_eq!(journal.get_companion(c.id).unwrap().unwrap().visit_ids, vec![v.id]);
}

#[test]
fn test_change_events_follow_cascade() {
    let journal = Journal::in_memory();
    let c = journal.create_companion(CompanionData::new("C")).unwrap();
    let v = journal
        .create_visit(VisitData::new(date(5, 1), ParkType::Land).with_companions(vec![c.id]))
        .unwrap();

    let handle = journal.subscribe(None);
    journal.delete_visit(v.id).unwrap();

    let events = handle.drain();
    // Companions and visits, one event each
    assert_eq!(events.len(), 2);
    assert_eq!(journal.stats().unwrap().visit_count, 0);
    assert_eq!(journal.get_visit(RecordId(v.id.0)).unwrap(), None);
}
