//! Session orchestration: rendering views, tracking identities, routing
//! events and applying incremental refreshes.
//!
//! Every operation on a [`WidgetTree`] takes the session lock, a FIFO
//! `tokio::sync::Mutex`, so renders and event handlers of one session never
//! overlap. Other sessions are unaffected.

mod index;
mod resolve;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::event::{self, ByteStream, Dispatch, FileMetadata, NotHandled};
use crate::view::{Element, Services, View, ViewElement};
use crate::widget::{serialize, WidgetError, WidgetId, WidgetNode, WireNode};

use index::NodeIndex;
use resolve::{Frame, Pass, ViewInstance};

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("tree has not been built yet")]
    NotBuilt,

    #[error("tree has been disposed")]
    Disposed,

    #[error("no widget with id '{0}'")]
    UnknownNode(WidgetId),

    #[error("operation cancelled")]
    Cancelled,

    #[error("handler for '{event}' on widget '{widget}' failed: {source}")]
    Handler {
        widget: WidgetId,
        event: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Widget(#[from] WidgetError),
}

/// Lifecycle of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Built,
    Disposed,
}

/// The render tree of one session.
pub struct WidgetTree {
    session: Uuid,
    inner: Mutex<TreeInner>,
}

pub(crate) struct TreeInner {
    session: Uuid,
    phase: Phase,
    root_view: ViewElement,
    root_anchor: WidgetId,
    config: Arc<Config>,
    services: Services,
    dirty_tx: mpsc::UnboundedSender<u64>,
    dirty_rx: mpsc::UnboundedReceiver<u64>,
    next_owner: u64,
    generation: u64,
    views: HashMap<WidgetId, ViewInstance>,
    /// Owner tag of a view context to the view's id.
    owners: HashMap<u64, WidgetId>,
    index: NodeIndex,
    root: Option<WidgetNode>,
}

impl WidgetTree {
    pub fn new(root: Arc<dyn View>, config: Arc<Config>, services: Services) -> Self {
        Self::with_session(Uuid::new_v4(), root, config, services)
    }

    pub fn with_session(
        session: Uuid,
        root: Arc<dyn View>,
        config: Arc<Config>,
        services: Services,
    ) -> Self {
        let (dirty_tx, dirty_rx) = mpsc::unbounded_channel();
        Self {
            session,
            inner: Mutex::new(TreeInner {
                session,
                phase: Phase::Uninitialized,
                root_view: ViewElement::from_arc(root),
                root_anchor: WidgetId::root(&session),
                config,
                services,
                dirty_tx,
                dirty_rx,
                next_owner: 1,
                generation: 0,
                views: HashMap::new(),
                owners: HashMap::new(),
                index: NodeIndex::default(),
                root: None,
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.phase
    }

    /// Render the whole tree and return it in wire form.
    pub async fn build(&self, cancel: &CancellationToken) -> Result<WireNode, TreeError> {
        let mut inner = self.lock(cancel).await?;
        inner.build_root(cancel).await
    }

    /// Re-render the view that produced `node_id` and return its new subtree.
    pub async fn refresh_view(
        &self,
        node_id: &WidgetId,
        cancel: &CancellationToken,
    ) -> Result<WireNode, TreeError> {
        let mut inner = self.lock(cancel).await?;
        inner.ensure_built()?;
        let view = inner
            .index
            .owner(node_id)
            .cloned()
            .ok_or_else(|| TreeError::UnknownNode(node_id.clone()))?;
        inner.refresh(view, cancel).await
    }

    /// Re-render every view whose state changed since its last render.
    ///
    /// Views nested inside another dirty view are covered by the outer
    /// render. Patches come back outermost first.
    pub async fn refresh_dirty(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<WireNode>, TreeError> {
        let mut inner = self.lock(cancel).await?;
        inner.ensure_built()?;
        inner.refresh_dirty(cancel).await
    }

    /// Route an event to the widget `widget_id`.
    ///
    /// The handler runs to completion before the session lock is released,
    /// so a second event waits for the first.
    pub async fn trigger_event(
        &self,
        widget_id: &WidgetId,
        name: &str,
        args: &[Value],
        cancel: &CancellationToken,
    ) -> Result<Dispatch, TreeError> {
        let inner = self.lock(cancel).await?;
        inner.ensure_built()?;
        let Some(node) = inner.index.get(widget_id).cloned() else {
            tracing::debug!(session = %self.session, widget = %widget_id, event = name, "event for unknown widget");
            return Ok(Dispatch::NotHandled(NotHandled::UnknownWidget));
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TreeError::Cancelled),
            outcome = event::invoke(&node, name, args) => outcome,
        };
        drop(inner);

        outcome.map_err(|source| {
            tracing::warn!(session = %self.session, widget = %widget_id, event = name, error = %source, "event handler failed");
            TreeError::Handler {
                widget: widget_id.clone(),
                event: name.to_string(),
                source,
            }
        })
    }

    /// Stream a file to the upload delegate `name` of `widget_id`.
    pub async fn upload(
        &self,
        widget_id: &WidgetId,
        name: &str,
        meta: FileMetadata,
        stream: ByteStream,
        cancel: &CancellationToken,
    ) -> Result<Dispatch, TreeError> {
        let inner = self.lock(cancel).await?;
        inner.ensure_built()?;
        let Some(node) = inner.index.get(widget_id).cloned() else {
            return Ok(Dispatch::NotHandled(NotHandled::UnknownWidget));
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TreeError::Cancelled),
            outcome = event::invoke_upload(&node, name, meta, stream, cancel.child_token()) => outcome,
        };
        drop(inner);

        outcome.map_err(|source| TreeError::Handler {
            widget: widget_id.clone(),
            event: name.to_string(),
            source,
        })
    }

    /// Rebuild from the root, keeping the session and all view state.
    pub async fn hot_reload(&self, cancel: &CancellationToken) -> Result<WireNode, TreeError> {
        let mut inner = self.lock(cancel).await?;
        inner.ensure_built()?;
        tracing::info!(session = %self.session, "hot reload");
        inner.build_root(cancel).await
    }

    /// Replace the root view and rebuild.
    ///
    /// State of views that keep their name and position is preserved.
    pub async fn swap_root(
        &self,
        root: Arc<dyn View>,
        cancel: &CancellationToken,
    ) -> Result<WireNode, TreeError> {
        let mut inner = self.lock(cancel).await?;
        inner.ensure_live()?;
        inner.root_view = ViewElement::from_arc(root);
        tracing::info!(session = %self.session, view = inner.root_view.name(), "root view swapped");
        inner.build_root(cancel).await
    }

    /// Run every cleanup, dispose every cell and refuse further work.
    pub async fn dispose(&self) {
        let mut inner = self.inner.lock().await;
        if inner.phase == Phase::Disposed {
            return;
        }
        let views: Vec<ViewInstance> = inner.views.drain().map(|(_, v)| v).collect();
        for instance in views {
            inner.unmount(instance);
        }
        inner.index.clear();
        inner.root = None;
        inner.phase = Phase::Disposed;
        tracing::info!(session = %self.session, "tree disposed");
    }

    /// The current tree in wire form, without rendering.
    pub async fn snapshot(&self) -> Result<WireNode, TreeError> {
        let inner = self.inner.lock().await;
        inner.ensure_built()?;
        let root = inner.root.as_ref().ok_or(TreeError::NotBuilt)?;
        Ok(serialize(root)?)
    }

    /// Number of widgets in the current tree.
    pub async fn node_count(&self) -> usize {
        self.inner.lock().await.index.len()
    }

    async fn lock(&self, cancel: &CancellationToken) -> Result<MutexGuard<'_, TreeInner>, TreeError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TreeError::Cancelled),
            guard = self.inner.lock() => Ok(guard),
        }
    }
}

impl fmt::Debug for WidgetTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetTree")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl TreeInner {
    fn ensure_live(&self) -> Result<(), TreeError> {
        match self.phase {
            Phase::Disposed => Err(TreeError::Disposed),
            _ => Ok(()),
        }
    }

    fn ensure_built(&self) -> Result<(), TreeError> {
        match self.phase {
            Phase::Uninitialized => Err(TreeError::NotBuilt),
            Phase::Disposed => Err(TreeError::Disposed),
            Phase::Built => Ok(()),
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    async fn build_root(&mut self, cancel: &CancellationToken) -> Result<WireNode, TreeError> {
        self.ensure_live()?;
        // Marks raised before this pass are covered by it. Marks raised
        // during it (effects writing state) are not.
        let covered = self.dirty_rx.len();
        let mut pass = Pass::new(cancel, self.next_generation());
        let frame = Frame::root(self.root_anchor.clone());
        let element = Element::View(self.root_view.clone());

        let root = self.resolve_element(element, frame, &mut pass).await?;
        self.sweep(None, pass.generation);
        for _ in 0..covered {
            if self.dirty_rx.try_recv().is_err() {
                break;
            }
        }
        self.index.rebuild(&root, &pass.produced);
        let wire = serialize(&root)?;

        self.root = Some(root);
        self.phase = Phase::Built;
        tracing::info!(
            session = %self.session,
            views = self.views.len(),
            widgets = self.index.len(),
            "tree built"
        );
        Ok(wire)
    }

    async fn refresh(
        &mut self,
        view_id: WidgetId,
        cancel: &CancellationToken,
    ) -> Result<WireNode, TreeError> {
        let (element, frame, old_output) = {
            let instance = self
                .views
                .get(&view_id)
                .ok_or_else(|| TreeError::UnknownNode(view_id.clone()))?;
            let frame = Frame {
                anchor: instance.anchor.clone(),
                slot: instance.slot.clone(),
                view: instance.parent.clone(),
                depth: instance.depth.saturating_sub(1),
            };
            (
                ViewElement::from_arc(instance.view.clone()),
                frame,
                instance.output.clone(),
            )
        };
        let old_output = old_output.ok_or(TreeError::NotBuilt)?;

        let mut pass = Pass::new(cancel, self.next_generation());
        let node = self.render_view(element, frame, &mut pass).await?;
        self.sweep(Some(&view_id), pass.generation);

        let new_root = self.index.splice(&old_output, node.clone(), &pass.produced)?;
        if let Ok(new_output) = node.id() {
            // Enclosing views that resolved to the same widget now resolve
            // to the replacement.
            let enclosing: Vec<WidgetId> = self
                .views
                .iter()
                .filter(|(id, instance)| {
                    instance.output.as_ref() == Some(&old_output)
                        && self.descends_from(&view_id, id)
                })
                .map(|(id, _)| id.clone())
                .collect();
            for id in enclosing {
                if let Some(instance) = self.views.get_mut(&id) {
                    instance.output = Some(new_output.clone());
                }
            }
        }
        self.root = Some(new_root);
        tracing::debug!(session = %self.session, view = %view_id, "view refreshed");
        Ok(serialize(&node)?)
    }

    async fn refresh_dirty(&mut self, cancel: &CancellationToken) -> Result<Vec<WireNode>, TreeError> {
        let mut dirty = HashSet::new();
        while let Ok(owner) = self.dirty_rx.try_recv() {
            if let Some(view) = self.owners.get(&owner) {
                dirty.insert(view.clone());
            }
        }

        let mut roots: Vec<(usize, WidgetId)> = dirty
            .iter()
            .filter(|id| {
                !dirty
                    .iter()
                    .any(|other| other != *id && self.descends_from(id, other))
            })
            .filter_map(|id| self.views.get(id).map(|v| (v.depth, id.clone())))
            .collect();
        roots.sort();

        let mut patches = Vec::with_capacity(roots.len());
        for (_, view) in roots {
            // An earlier refresh may have unmounted it.
            if self.views.contains_key(&view) {
                patches.push(self.refresh(view, cancel).await?);
            }
        }
        Ok(patches)
    }
}
