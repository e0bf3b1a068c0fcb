//! Change notifications for views that cache journal snapshots.
//!
//! Every successful commit publishes one [`JournalEvent::Changed`] per
//! collection it touched. Subscribers are bounded; one that stops reading
//! is dropped.
//!
//! # Example
//!
//! ```ignore
//! let handle = journal.subscribe(SubscriptionConfig::collections(vec![Collection::Visits]));
//!
//! journal.create_visit(VisitData::new(date, ParkType::Land))?;
//!
//! for event in handle.drain() {
//!     if let JournalEvent::Changed { .. } = event {
//!         view.refresh()?;
//!     }
//! }
//! ```

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{
    ChangeSet, DropReason, JournalEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};
