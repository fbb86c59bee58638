//! Effect hooks and the conditions under which they (re-)run.
//!
//! A hook pairs a stable identity with an async action and a set of
//! triggers. The [`EffectScheduler`] decides, once per render pass of the
//! owning view, which hooks are due and runs them in declaration order.

mod hook;
mod scheduler;
mod trigger;

pub use hook::{Cleanup, EffectFuture, EffectHook, HookId};
pub use scheduler::{EffectScheduler, HookFailure};
pub use trigger::EffectTrigger;
