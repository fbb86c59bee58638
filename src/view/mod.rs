//! The render contract between application code and the tree.
//!
//! A [`View`] turns its state into an [`Element`]. Views are rendered by the
//! tree, which owns one [`ViewContext`] per view instance so that state
//! declared with [`ViewContext::use_state`] survives re-renders.

mod context;
mod element;
mod services;

pub use context::ViewContext;
pub use element::{Element, ViewElement};
pub use services::Services;

/// A composable unit of UI.
pub trait View: Send + Sync + 'static {
    /// Produce this view's content for the current pass.
    fn build(&self, cx: &mut ViewContext) -> anyhow::Result<Element>;

    /// Name used in identities and diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
