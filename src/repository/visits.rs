use super::Journal;
use crate::error::{JournalError, Result};
use crate::model::{
    dedup_ids, insert_id, same_id_set, ActionData, CompanionData, CompanionVisitsPatch, Visit,
    VisitData, VisitPatch,
};
use crate::store::Transaction;
use crate::types::{Collection, RecordId};
use tracing::debug;

impl Journal {
    /// Create a visit and add it to each listed companion.
    pub fn create_visit(&self, mut data: VisitData) -> Result<Visit> {
        data.companion_ids = dedup_ids(&data.companion_ids);

        self.store.transaction(move |tx| {
            require_companions(tx, &data.companion_ids)?;
            let companion_ids = data.companion_ids.clone();

            let visit = tx.create(data)?;
            link_companions(tx, visit.id, &companion_ids)?;

            debug!(id = %visit.id, companions = companion_ids.len(), "created visit");
            Ok(visit)
        })
    }

    /// Apply `patch`, moving the visit between companions when its
    /// companion set changes. `None` if the visit doesn't exist.
    pub fn update_visit(&self, id: RecordId, mut patch: VisitPatch) -> Result<Option<Visit>> {
        if let Some(ids) = &patch.companion_ids {
            patch.companion_ids = Some(dedup_ids(ids));
        }

        self.store.transaction(move |tx| {
            let current = match tx.get::<VisitData>(id)? {
                Some(visit) => visit,
                None => return Ok(None),
            };

            if let Some(ids) = &patch.companion_ids {
                if !same_id_set(ids, &current.companion_ids) {
                    require_companions(tx, ids)?;

                    let removed: Vec<RecordId> = current
                        .companion_ids
                        .iter()
                        .filter(|c| !ids.contains(c))
                        .copied()
                        .collect();
                    let added: Vec<RecordId> = ids
                        .iter()
                        .filter(|c| !current.companion_ids.contains(c))
                        .copied()
                        .collect();

                    unlink_companions(tx, id, &removed)?;
                    link_companions(tx, id, &added)?;
                }
            }

            if let Some(park_type) = patch.park_type {
                if park_type != current.park_type {
                    let actions = tx.find::<ActionData>(|a| a.visit_id == id)?;
                    if let Some(action) = actions.iter().find(|a| !a.area.belongs_to(park_type)) {
                        return Err(JournalError::AreaMismatch {
                            area: action.area,
                            park_type,
                        });
                    }
                }
            }

            tx.update(id, &patch).map(Some)
        })
    }

    /// Delete a visit, its actions, and its companion links.
    /// Returns `false` if the visit doesn't exist.
    pub fn delete_visit(&self, id: RecordId) -> Result<bool> {
        self.store.transaction(|tx| {
            if tx.get::<VisitData>(id)?.is_none() {
                return Ok(false);
            }

            let companions = tx.find::<CompanionData>(|c| c.visit_ids.contains(&id))?;
            unlink_companions(tx, id, &companions.iter().map(|c| c.id).collect::<Vec<_>>())?;

            let action_ids: Vec<RecordId> = tx
                .find::<ActionData>(|a| a.visit_id == id)?
                .iter()
                .map(|a| a.id)
                .collect();
            let actions = tx.delete_many::<ActionData>(&action_ids)?;

            tx.delete::<VisitData>(id)?;

            debug!(%id, actions, companions = companions.len(), "deleted visit");
            Ok(true)
        })
    }

    pub fn get_visit(&self, id: RecordId) -> Result<Option<Visit>> {
        self.store.get(id)
    }

    pub fn list_visits(&self) -> Result<Vec<Visit>> {
        self.store.get_all()
    }

    /// Recompute the cached action and photo counts from the timeline.
    pub fn refresh_visit_counters(&self, id: RecordId) -> Result<Option<Visit>> {
        self.store.transaction(|tx| {
            if tx.get::<VisitData>(id)?.is_none() {
                return Ok(None);
            }

            let actions = tx.find::<ActionData>(|a| a.visit_id == id)?;
            let photos: usize = actions.iter().map(|a| a.photos.len()).sum();

            let patch = VisitPatch {
                action_count: Some(Some(actions.len() as u32)),
                total_photo_count: Some(Some(photos as u32)),
                ..Default::default()
            };
            tx.update(id, &patch).map(Some)
        })
    }
}

/// Fail with `DanglingReference` on the first id that isn't a companion.
pub(super) fn require_companions(tx: &mut Transaction<'_>, ids: &[RecordId]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let existing: Vec<RecordId> = tx
        .get_all::<CompanionData>()?
        .iter()
        .map(|c| c.id)
        .collect();
    match ids.iter().find(|id| !existing.contains(id)) {
        Some(missing) => Err(JournalError::DanglingReference {
            collection: Collection::Companions,
            id: *missing,
        }),
        None => Ok(()),
    }
}

/// Add `visit_id` to each companion's `visit_ids`.
fn link_companions(tx: &mut Transaction<'_>, visit_id: RecordId, companion_ids: &[RecordId]) -> Result<()> {
    let mut patches = Vec::new();
    for id in companion_ids {
        if let Some(companion) = tx.get::<CompanionData>(*id)? {
            let mut visit_ids = companion.data.visit_ids;
            if insert_id(&mut visit_ids, visit_id) {
                patches.push((*id, CompanionVisitsPatch { visit_ids }));
            }
        }
    }
    tx.update_many::<CompanionData, _>(&patches)?;
    Ok(())
}

/// Remove `visit_id` from each companion's `visit_ids`.
fn unlink_companions(tx: &mut Transaction<'_>, visit_id: RecordId, companion_ids: &[RecordId]) -> Result<()> {
    let mut patches = Vec::new();
    for id in companion_ids {
        if let Some(companion) = tx.get::<CompanionData>(*id)? {
            if companion.visit_ids.contains(&visit_id) {
                let visit_ids = companion
                    .data
                    .visit_ids
                    .into_iter()
                    .filter(|v| *v != visit_id)
                    .collect();
                patches.push((*id, CompanionVisitsPatch { visit_ids }));
            }
        }
    }
    tx.update_many::<CompanionData, _>(&patches)?;
    Ok(())
}
