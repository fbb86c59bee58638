use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::effect::{Cleanup, EffectHook, EffectTrigger};
use crate::state::{ChangeNotifier, State};
use crate::widget::WidgetId;

use super::Services;

struct Slot {
    value: Box<dyn Any + Send + Sync>,
    dispose: Box<dyn Fn() + Send + Sync>,
}

/// Per-instance render context of a view.
///
/// State slots are matched by call order: the n-th `use_state` call of a
/// pass returns the cell created by the n-th call of the first pass.
pub struct ViewContext {
    id: WidgetId,
    notifier: ChangeNotifier,
    config: Arc<Config>,
    services: Services,
    slots: Vec<Slot>,
    cursor: usize,
    hooks: Vec<EffectHook>,
    auto_effects: usize,
    pass: u64,
}

impl ViewContext {
    pub(crate) fn new(
        id: WidgetId,
        owner: u64,
        dirty: mpsc::UnboundedSender<u64>,
        config: Arc<Config>,
        services: Services,
    ) -> Self {
        Self {
            id,
            notifier: ChangeNotifier::new(owner, dirty),
            config,
            services,
            slots: Vec::new(),
            cursor: 0,
            hooks: Vec::new(),
            auto_effects: 0,
            pass: 0,
        }
    }

    /// A context not attached to any tree. Changes to its cells mark
    /// nothing dirty.
    pub fn standalone(config: Arc<Config>) -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut cx = Self::new(WidgetId::new("standalone"), 0, tx, config, Services::new());
        cx.begin_pass();
        cx
    }

    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    /// Number of the current render pass, starting at 1.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The cell stored in this call's slot, created with `initial` on the
    /// first pass.
    pub fn use_state<T>(&mut self, initial: T) -> State<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let index = self.cursor;
        self.cursor += 1;

        if let Some(slot) = self.slots.get(index) {
            if let Some(state) = slot.value.downcast_ref::<State<T>>() {
                return state.clone();
            }
            tracing::warn!(view = %self.id, slot = index, "state slot changed type, replacing");
            (slot.dispose)();
        }

        let state = State::new(initial);
        state.add_notifier(self.notifier.clone());
        let handle = state.clone();
        let slot = Slot {
            value: Box::new(state.clone()),
            dispose: Box::new(move || handle.dispose()),
        };
        if index < self.slots.len() {
            self.slots[index] = slot;
        } else {
            self.slots.push(slot);
        }
        state
    }

    /// Register an effect hook for this pass.
    pub fn use_effect(&mut self, hook: EffectHook) {
        if self.hooks.iter().any(|h| h.id() == hook.id()) {
            tracing::warn!(view = %self.id, hook = %hook.id(), "duplicate hook id ignored");
            return;
        }
        self.hooks.push(hook);
    }

    /// Register an anonymous effect. Its identity is its position among the
    /// anonymous effects of the pass.
    pub fn effect<F, Fut, I>(&mut self, triggers: I, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Cleanup>> + Send + 'static,
        I: IntoIterator<Item = EffectTrigger>,
    {
        let id = format!("effect#{}", self.auto_effects);
        self.auto_effects += 1;
        self.use_effect(EffectHook::new(id, action).with_triggers(triggers));
    }

    pub(crate) fn begin_pass(&mut self) {
        self.cursor = 0;
        self.hooks.clear();
        self.auto_effects = 0;
        self.pass += 1;
    }

    pub(crate) fn take_hooks(&mut self) -> Vec<EffectHook> {
        std::mem::take(&mut self.hooks)
    }

    /// Dispose every cell this context created.
    pub(crate) fn dispose(&mut self) {
        for slot in self.slots.drain(..) {
            (slot.dispose)();
        }
        self.hooks.clear();
    }
}

impl fmt::Debug for ViewContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewContext")
            .field("id", &self.id)
            .field("slots", &self.slots.len())
            .field("pass", &self.pass)
            .finish()
    }
}
