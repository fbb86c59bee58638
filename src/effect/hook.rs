use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_core::future::BoxFuture;

use super::trigger::EffectTrigger;

/// Future returned by an effect action.
pub type EffectFuture = BoxFuture<'static, anyhow::Result<Cleanup>>;

/// Stable identity of a hook across render passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(Cow<'static, str>);

impl HookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for HookId {
    fn from(value: &'static str) -> Self {
        HookId(Cow::Borrowed(value))
    }
}

impl From<String> for HookId {
    fn from(value: String) -> Self {
        HookId(Cow::Owned(value))
    }
}

/// Work to undo an effect, run before the hook's next invocation or when
/// the owning view goes away.
#[derive(Default)]
pub struct Cleanup(Option<Box<dyn FnOnce() + Send>>);

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Cleanup(Some(Box::new(f)))
    }

    pub fn none() -> Self {
        Cleanup(None)
    }

    pub(crate) fn run(self) {
        if let Some(f) = self.0 {
            f();
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cleanup").field(&self.0.is_some()).finish()
    }
}

/// A side-effecting action plus the triggers that make it due.
#[derive(Clone)]
pub struct EffectHook {
    id: HookId,
    action: Arc<dyn Fn() -> EffectFuture + Send + Sync>,
    triggers: Vec<EffectTrigger>,
}

impl EffectHook {
    /// Create a hook with no explicit triggers (runs once after init).
    pub fn new<F, Fut>(id: impl Into<HookId>, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Cleanup>> + Send + 'static,
    {
        Self {
            id: id.into(),
            action: Arc::new(move || Box::pin(action()) as EffectFuture),
            triggers: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<EffectTrigger>) -> Self {
        self.triggers.push(trigger.into());
        self
    }

    pub fn with_triggers<I>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = EffectTrigger>,
    {
        self.triggers.extend(triggers);
        self
    }

    pub fn id(&self) -> &HookId {
        &self.id
    }

    /// Declared triggers, or `[AfterInit]` when none were given.
    pub fn triggers(&self) -> Vec<EffectTrigger> {
        if self.triggers.is_empty() {
            vec![EffectTrigger::AfterInit]
        } else {
            self.triggers.clone()
        }
    }

    pub(crate) fn start(&self) -> EffectFuture {
        (self.action)()
    }
}

impl fmt::Debug for EffectHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectHook")
            .field("id", &self.id)
            .field("triggers", &self.triggers())
            .finish()
    }
}
