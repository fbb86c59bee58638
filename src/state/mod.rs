//! Reactive cells.
//!
//! A [`State`] holds one value behind a mutex. Every committed change is
//! pushed, inside the critical section, onto the channel of each
//! [`Subscription`], so subscribers observe changes in commit order without
//! any subscriber code running while the lock is held.

mod cell;
mod converted;
mod subscription;

pub use cell::{CellId, Observable, State};
pub use converted::ConvertedState;
pub use subscription::Subscription;

pub(crate) use cell::ChangeNotifier;
