//! Server-resident reactive UI runtime.
//!
//! Application code describes its UI as [`view::View`]s holding
//! [`state::State`] cells. The server renders them into an immutable tree of
//! [`widget::WidgetNode`]s, ships that tree to a thin client as JSON, and
//! routes the client's events back to typed handlers. Changed state marks
//! its view dirty; the next refresh re-renders only that view and patches
//! the tree.

pub mod config;
pub mod demo;
pub mod effect;
pub mod event;
pub mod logging;
pub mod server;
pub mod state;
pub mod tree;
pub mod view;
pub mod widget;
