use std::fmt;
use std::sync::Arc;

use crate::state::{CellId, ConvertedState, Observable, State};

/// When an effect hook must run.
#[derive(Clone)]
pub enum EffectTrigger {
    /// The observed cell published a new value since the previous pass.
    AfterChange(Arc<dyn Observable>),
    /// The first pass in which the hook appears.
    AfterInit,
    /// Every render pass of the owning view.
    AfterRender,
}

impl EffectTrigger {
    pub fn after_change<O>(source: &O) -> Self
    where
        O: Observable + Clone + 'static,
    {
        EffectTrigger::AfterChange(Arc::new(source.clone()))
    }

    pub fn after_init() -> Self {
        EffectTrigger::AfterInit
    }

    pub fn after_render() -> Self {
        EffectTrigger::AfterRender
    }

    pub(crate) fn watched_cell(&self) -> Option<(CellId, u64)> {
        match self {
            EffectTrigger::AfterChange(source) => Some((source.cell_id(), source.version())),
            _ => None,
        }
    }
}

impl fmt::Debug for EffectTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectTrigger::AfterChange(source) => {
                write!(f, "AfterChange({})", source.cell_id())
            }
            EffectTrigger::AfterInit => f.write_str("AfterInit"),
            EffectTrigger::AfterRender => f.write_str("AfterRender"),
        }
    }
}

impl<T> From<&State<T>> for EffectTrigger
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn from(state: &State<T>) -> Self {
        EffectTrigger::after_change(state)
    }
}

impl<S, T> From<&ConvertedState<S, T>> for EffectTrigger
where
    S: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn from(state: &ConvertedState<S, T>) -> Self {
        EffectTrigger::after_change(state)
    }
}
