use std::collections::HashMap;

use crate::view::Element;
use crate::widget::{WidgetId, WidgetNode};

use super::TreeError;

/// Lookup tables over the current resolved tree.
#[derive(Default)]
pub(super) struct NodeIndex {
    nodes: HashMap<WidgetId, WidgetNode>,
    parents: HashMap<WidgetId, WidgetId>,
    /// Widget id to the id of the innermost view that produced it.
    owners: HashMap<WidgetId, WidgetId>,
}

impl NodeIndex {
    pub(super) fn get(&self, id: &WidgetId) -> Option<&WidgetNode> {
        self.nodes.get(id)
    }

    pub(super) fn owner(&self, id: &WidgetId) -> Option<&WidgetId> {
        self.owners.get(id)
    }

    pub(super) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(super) fn clear(&mut self) {
        self.nodes.clear();
        self.parents.clear();
        self.owners.clear();
    }

    /// Replace the whole index with the tree under `root`.
    pub(super) fn rebuild(&mut self, root: &WidgetNode, produced: &HashMap<WidgetId, WidgetId>) {
        self.clear();
        self.insert_subtree(root, None, produced);
    }

    /// Swap the subtree at `old` for `new` and rebuild the ancestor path.
    ///
    /// Returns the new tree root. Siblings and unrelated subtrees are
    /// shared with the previous tree.
    pub(super) fn splice(
        &mut self,
        old: &WidgetId,
        new: WidgetNode,
        produced: &HashMap<WidgetId, WidgetId>,
    ) -> Result<WidgetNode, TreeError> {
        if !self.nodes.contains_key(old) {
            return Err(TreeError::UnknownNode(old.clone()));
        }
        let parent = self.parents.get(old).cloned();
        self.remove_subtree(old);
        self.insert_subtree(&new, parent.as_ref(), produced);

        let mut replaced = old.clone();
        let mut replacement = new;
        let mut cursor = parent;
        while let Some(parent_id) = cursor {
            let parent = self
                .nodes
                .get(&parent_id)
                .cloned()
                .ok_or_else(|| TreeError::UnknownNode(parent_id.clone()))?;

            let children: Vec<Element> = parent
                .children()
                .iter()
                .map(|child| match child {
                    Element::Widget(node) if node.id().ok() == Some(&replaced) => {
                        Element::Widget(replacement.clone())
                    }
                    other => other.clone(),
                })
                .collect();

            let rebuilt = parent.with_children(children);
            rebuilt.assign_id(parent_id.clone())?;
            if let Some(child_id) = replacement.id().ok().cloned() {
                self.parents.insert(child_id, parent_id.clone());
            }
            self.nodes.insert(parent_id.clone(), rebuilt.clone());

            cursor = self.parents.get(&parent_id).cloned();
            replaced = parent_id;
            replacement = rebuilt;
        }
        Ok(replacement)
    }

    fn insert_subtree(
        &mut self,
        node: &WidgetNode,
        parent: Option<&WidgetId>,
        produced: &HashMap<WidgetId, WidgetId>,
    ) {
        let Ok(id) = node.id() else {
            return;
        };
        if let Some(parent) = parent {
            self.parents.insert(id.clone(), parent.clone());
        }
        if let Some(owner) = produced.get(id) {
            self.owners.insert(id.clone(), owner.clone());
        }
        self.nodes.insert(id.clone(), node.clone());
        for child in node.children().iter().filter_map(Element::as_widget) {
            self.insert_subtree(child, Some(id), produced);
        }
    }

    fn remove_subtree(&mut self, id: &WidgetId) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        self.parents.remove(id);
        self.owners.remove(id);
        for child in node.children().iter().filter_map(Element::as_widget) {
            if let Ok(child_id) = child.id() {
                self.remove_subtree(child_id);
            }
        }
    }
}
