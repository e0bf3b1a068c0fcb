//! # Park Journal
//!
//! A local journal of theme-park visits: the companions who came along and
//! the timeline of rides, meals and shows within each visit.
//!
//! ## Core Concepts
//!
//! - **Visits**: One day at one park, linked to companions
//! - **Companions**: People who came along, linked back to their visits
//! - **Timeline actions**: Logged events within a visit, in a park area
//! - **Statistics**: Aggregates over visits and timelines
//!
//! Every change that spans records (companion links, cascade deletes,
//! reordering) commits atomically.
//!
//! ## Example
//!
//! ```ignore
//! use park_journal::{Journal, JournalConfig, VisitData, ParkType, VisitFilter};
//!
//! let journal = Journal::open(JournalConfig {
//!     path: "./my-journal".into(),
//!     ..Default::default()
//! })?;
//!
//! let mika = journal.create_companion(CompanionData::new("Mika"))?;
//! let visit = journal.create_visit(
//!     VisitData::new(date, ParkType::Land).with_companions(vec![mika.id]),
//! )?;
//!
//! let sea = journal.get_filtered_visits(&VisitFilter::new().park(ParkType::Sea))?;
//! let stats = journal.get_visit_statistics(None)?;
//! ```

pub mod error;
pub mod events;
pub mod model;
pub mod query;
pub mod repository;
pub mod session;
pub mod stats;
pub mod storage;
pub mod store;
pub mod types;
pub mod wal;

// Re-exports
pub use error::{JournalError, Result};
pub use events::{
    ChangeSet, DropReason, EventBus, JournalEvent, SubscriptionConfig, SubscriptionHandle,
    SubscriptionId,
};
pub use model::{
    ActionCategory, ActionData, ActionPatch, Companion, CompanionData, CompanionPatch, LandArea,
    MealType, ParkArea, ParkType, PhotoRef, SeaArea, TimelineAction, Visit, VisitData, VisitPatch,
    Weather,
};
pub use query::{DateRange, VisitFilter};
pub use repository::Journal;
pub use session::{ActionsView, VisitsView};
pub use stats::{
    action_statistics, visit_statistics, ActionStatistics, FavoriteCompanion, LocationCount,
    VisitStatistics,
};
pub use storage::{FileBackend, MemoryBackend, StorageBackend, WriteBatch};
pub use store::{DocumentStore, JournalConfig, Transaction};
pub use types::*;
pub use wal::{KeyWrite, WalEntry, WalEntryStatus, WalOperation, WriteAheadLog};
