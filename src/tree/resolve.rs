use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_core::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::effect::EffectScheduler;
use crate::view::{Element, View, ViewContext, ViewElement};
use crate::widget::{ErrorView, TextBlock, WidgetId, WidgetNode};

use super::{TreeError, TreeInner};

/// A mounted view and everything that persists between its renders.
pub(super) struct ViewInstance {
    pub(super) view: Arc<dyn View>,
    pub(super) name: &'static str,
    pub(super) cx: ViewContext,
    pub(super) effects: EffectScheduler,
    pub(super) owner: u64,
    pub(super) anchor: WidgetId,
    pub(super) slot: String,
    /// Enclosing view, `None` for the root view.
    pub(super) parent: Option<WidgetId>,
    pub(super) depth: usize,
    /// Id of the widget this view resolved to on its last render.
    pub(super) output: Option<WidgetId>,
    pub(super) generation: u64,
}

/// Where an element is being placed.
#[derive(Debug, Clone)]
pub(super) struct Frame {
    pub(super) anchor: WidgetId,
    pub(super) slot: String,
    pub(super) view: Option<WidgetId>,
    pub(super) depth: usize,
}

impl Frame {
    pub(super) fn root(anchor: WidgetId) -> Self {
        Self {
            anchor,
            slot: "root".to_string(),
            view: None,
            depth: 0,
        }
    }
}

/// Bookkeeping of one resolution pass.
pub(super) struct Pass {
    pub(super) cancel: CancellationToken,
    pub(super) generation: u64,
    /// Widgets resolved in this pass, mapped to the view that produced them.
    pub(super) produced: HashMap<WidgetId, WidgetId>,
}

impl Pass {
    pub(super) fn new(cancel: &CancellationToken, generation: u64) -> Self {
        Self {
            cancel: cancel.clone(),
            generation,
            produced: HashMap::new(),
        }
    }

    fn record(&mut self, id: &WidgetId, frame: &Frame) {
        if let Some(view) = &frame.view {
            self.produced.insert(id.clone(), view.clone());
        }
    }
}

impl TreeInner {
    /// Turn an element into a resolved widget subtree: views rendered,
    /// leaf content wrapped, every node assigned its id.
    pub(super) fn resolve_element<'a>(
        &'a mut self,
        element: Element,
        frame: Frame,
        pass: &'a mut Pass,
    ) -> BoxFuture<'a, Result<WidgetNode, TreeError>> {
        Box::pin(async move {
            match element {
                Element::Widget(node) => self.resolve_widget(node, frame, pass).await,
                Element::View(view) => self.render_view(view, frame, pass).await,
                Element::Content(content) => {
                    let node = WidgetNode::new(TextBlock { content });
                    let id = WidgetId::derive(&frame.anchor, node.type_name(), &frame.slot);
                    node.assign_id(id.clone())?;
                    pass.record(&id, &frame);
                    Ok(node)
                }
            }
        })
    }

    async fn resolve_widget(
        &mut self,
        node: WidgetNode,
        frame: Frame,
        pass: &mut Pass,
    ) -> Result<WidgetNode, TreeError> {
        let id = WidgetId::derive(&frame.anchor, node.type_name(), &frame.slot);

        let resolved = if node.children().is_empty() {
            match node.id().ok().map(|existing| *existing == id) {
                None => node,
                Some(true) => {
                    pass.record(&id, &frame);
                    return Ok(node);
                }
                // Same node placed twice; the copy gets its own identity.
                Some(false) => node.with_children(Vec::<Element>::new()),
            }
        } else {
            let slots = child_slots(node.children(), node.type_name());
            let mut children = Vec::with_capacity(slots.len());
            for (child, slot) in node.children().iter().cloned().zip(slots) {
                let child_frame = Frame {
                    anchor: id.clone(),
                    slot,
                    view: frame.view.clone(),
                    depth: frame.depth,
                };
                children.push(self.resolve_element(child, child_frame, pass).await?);
            }
            node.with_children(children)
        };

        resolved.assign_id(id.clone())?;
        pass.record(&id, &frame);
        Ok(resolved)
    }

    /// Render one view instance and resolve its output.
    pub(super) async fn render_view(
        &mut self,
        element: ViewElement,
        frame: Frame,
        pass: &mut Pass,
    ) -> Result<WidgetNode, TreeError> {
        if pass.cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }

        let name = element.name();
        let view_id = WidgetId::derive(&frame.anchor, &format!("view:{name}"), &frame.slot);
        let depth = frame.depth + 1;

        let mut instance = match self.views.remove(&view_id) {
            Some(mut existing) if existing.name == name => {
                existing.view = element.view().clone();
                existing
            }
            Some(stale) => {
                self.unmount(stale);
                self.mount(view_id.clone(), &element)
            }
            None => self.mount(view_id.clone(), &element),
        };
        instance.anchor = frame.anchor.clone();
        instance.slot = frame.slot.clone();
        instance.parent = frame.view.clone();
        instance.depth = depth;
        instance.generation = pass.generation;

        let limit = self.config.session.render_depth_limit;
        let built = if depth > limit {
            Err(anyhow::anyhow!("view nesting exceeds {limit} levels"))
        } else {
            build_view(&mut instance)
        };

        let result = match built {
            Ok(output) => {
                let slot = output
                    .key()
                    .map(|key| format!("key:{key}"))
                    .unwrap_or_else(|| "0".to_string());
                let child_frame = Frame {
                    anchor: view_id.clone(),
                    slot,
                    view: Some(view_id.clone()),
                    depth,
                };
                match self.resolve_element(output, child_frame, pass).await {
                    Ok(node) => {
                        let failures = instance.effects.run_pass(instance.cx.take_hooks()).await;
                        match failures.into_iter().next() {
                            None => Ok(node),
                            Some(failure) => {
                                let error = failure
                                    .error
                                    .context(format!("effect '{}' failed", failure.hook));
                                self.error_node(&view_id, name, &error, pass)
                            }
                        }
                    }
                    Err(error) => Err(error),
                }
            }
            Err(error) => {
                instance.cx.take_hooks();
                self.error_node(&view_id, name, &error, pass)
            }
        };

        if let Ok(node) = &result {
            instance.output = node.id().ok().cloned();
        }
        self.views.insert(view_id, instance);
        result
    }

    /// Substitute an error node for the output of `view_id`. Views the
    /// failed render had already mounted below it are unmounted.
    fn error_node(
        &mut self,
        view_id: &WidgetId,
        name: &str,
        error: &anyhow::Error,
        pass: &mut Pass,
    ) -> Result<WidgetNode, TreeError> {
        tracing::warn!(
            session = %self.session,
            view = name,
            error = %error,
            "view failed, rendering error node"
        );
        let unmounted = self.unmount_descendants(view_id);
        pass.produced.retain(|_, owner| !unmounted.contains(owner));
        let node = WidgetNode::new(ErrorView::from_error(format!("{name} failed"), error));
        let id = WidgetId::derive(view_id, node.type_name(), "0");
        node.assign_id(id.clone())?;
        pass.produced.insert(id, view_id.clone());
        Ok(node)
    }

    fn mount(&mut self, id: WidgetId, element: &ViewElement) -> ViewInstance {
        let owner = self.next_owner;
        self.next_owner += 1;
        self.owners.insert(owner, id.clone());
        tracing::debug!(session = %self.session, view = element.name(), id = %id, "mounting view");

        ViewInstance {
            view: element.view().clone(),
            name: element.name(),
            cx: ViewContext::new(
                id.clone(),
                owner,
                self.dirty_tx.clone(),
                self.config.clone(),
                self.services.clone(),
            ),
            effects: EffectScheduler::new(),
            owner,
            anchor: id,
            slot: String::new(),
            parent: None,
            depth: 0,
            output: None,
            generation: 0,
        }
    }

    pub(super) fn unmount(&mut self, mut instance: ViewInstance) {
        tracing::debug!(session = %self.session, view = instance.name, "unmounting view");
        instance.effects.dispose();
        instance.cx.dispose();
        self.owners.remove(&instance.owner);
    }

    /// Unmount views under `scope` (or anywhere, when `None`) that the pass
    /// `generation` did not reach.
    pub(super) fn sweep(&mut self, scope: Option<&WidgetId>, generation: u64) {
        let stale: Vec<WidgetId> = self
            .views
            .iter()
            .filter(|(_, instance)| instance.generation != generation)
            .filter(|(id, instance)| match scope {
                None => true,
                Some(scope) => {
                    self.descends_from(id, scope)
                        || instance
                            .parent
                            .as_ref()
                            .is_some_and(|parent| !self.views.contains_key(parent))
                }
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in stale {
            if let Some(instance) = self.views.remove(&id) {
                self.unmount(instance);
            }
        }
    }

    fn unmount_descendants(&mut self, view_id: &WidgetId) -> Vec<WidgetId> {
        let nested: Vec<WidgetId> = self
            .views
            .keys()
            .filter(|id| self.descends_from(id, view_id))
            .cloned()
            .collect();
        for id in &nested {
            if let Some(instance) = self.views.remove(id) {
                self.unmount(instance);
            }
        }
        nested
    }

    pub(super) fn descends_from(&self, id: &WidgetId, ancestor: &WidgetId) -> bool {
        let mut cursor = self.views.get(id).and_then(|v| v.parent.clone());
        while let Some(current) = cursor {
            if &current == ancestor {
                return true;
            }
            cursor = self.views.get(&current).and_then(|v| v.parent.clone());
        }
        false
    }
}

fn build_view(instance: &mut ViewInstance) -> anyhow::Result<Element> {
    instance.cx.begin_pass();
    let view = instance.view.clone();
    let cx = &mut instance.cx;
    match panic::catch_unwind(AssertUnwindSafe(|| view.build(cx))) {
        Ok(output) => output,
        Err(payload) => Err(anyhow::anyhow!("view panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Identity slots of a child list: the key when it is unique among the
/// siblings, otherwise the position.
fn child_slots(children: &[Element], parent: &str) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in children.iter().filter_map(Element::key) {
        *counts.entry(key).or_default() += 1;
    }

    children
        .iter()
        .enumerate()
        .map(|(index, child)| match child.key() {
            Some(key) if counts.get(key) == Some(&1) => format!("key:{key}"),
            Some(key) => {
                tracing::warn!(parent, key, "duplicate sibling key, falling back to position");
                format!("key:{key}#{index}")
            }
            None => index.to_string(),
        })
        .collect()
}
