//! Journal entities.

mod area;
mod entities;

pub use area::{LandArea, ParkArea, ParkType, SeaArea};
pub use entities::{
    ActionCategory, ActionData, ActionPatch, Companion, CompanionData, CompanionPatch, MealType,
    PhotoRef, TimelineAction, Visit, VisitData, VisitPatch, Weather,
};
pub(crate) use entities::{
    dedup_ids, insert_id, same_id_set, CompanionVisitsPatch, VisitCompanionsPatch,
};
