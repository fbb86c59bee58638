//! Shared test widgets, views and helpers.

#![allow(dead_code, unused_imports)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::Deserialize;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use tether::config::Config;
use tether::event::{EventHandler, UploadHandler, ValueHandler};
use tether::state::State;
use tether::tree::WidgetTree;
use tether::view::{Element, Services, View, ViewContext};
use tether::widget::{Widget, WidgetNode, WidgetSchema, WireNode};

/// Config with limits suitable for tests.
pub fn create_test_config() -> Arc<Config> {
    let mut config = Config::default();
    config.server.bind_addr = "127.0.0.1:0".to_string();
    config.session.event_timeout_ms = 2_000;
    config.session.render_depth_limit = 16;
    config.routes.insert("home".to_string(), "/".to_string());
    Arc::new(config)
}

/// Write `content` to a config file inside a fresh temp dir.
pub fn temp_config(content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).expect("Failed to write config");
    (dir, path)
}

pub fn token() -> CancellationToken {
    CancellationToken::new()
}

/// Build a tree for `view` and return it with its first wire tree.
pub async fn built_tree(view: impl View) -> (WidgetTree, WireNode) {
    let tree = WidgetTree::new(Arc::new(view), create_test_config(), Services::new());
    let wire = tree.build(&token()).await.expect("initial build");
    (tree, wire)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Mode {
    Off,
    Low,
    High,
}

pub const MODES: &[&str] = &["Off", "Low", "High"];

/// Widget exposing one event of every argument shape.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    pub label: String,
    pub hint: Option<String>,
    pub on_click: Option<EventHandler>,
    pub on_value: Option<ValueHandler<i64>>,
    pub on_pair: Option<ValueHandler<(i64, String)>>,
    pub on_mode: Option<ValueHandler<Mode>>,
    pub on_file: Option<UploadHandler>,
}

impl Probe {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }
}

impl Widget for Probe {
    fn schema() -> &'static WidgetSchema<Self> {
        static SCHEMA: OnceLock<WidgetSchema<Probe>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            WidgetSchema::builder("Probe")
                .prop("label", |w: &Probe| &w.label)
                .prop("hint", |w: &Probe| &w.hint)
                .event("on_click", |w: &Probe| w.on_click.as_ref())
                .value_event("on_value", |w: &Probe| w.on_value.as_ref())
                .tuple_event("on_pair", |w: &Probe| w.on_pair.as_ref())
                .enum_event("on_mode", MODES, |w: &Probe| w.on_mode.as_ref())
                .upload("on_file", |w: &Probe| w.on_file.as_ref())
                .build()
        })
    }
}

/// Container with an attached `dock` prop.
#[derive(Debug, Clone, Default)]
pub struct Panel {
    pub title: Option<String>,
}

impl Widget for Panel {
    fn schema() -> &'static WidgetSchema<Self> {
        static SCHEMA: OnceLock<WidgetSchema<Panel>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            WidgetSchema::builder("Panel")
                .prop("title", |w: &Panel| &w.title)
                .attached("dock")
                .build()
        })
    }
}

pub fn panel(children: Vec<Element>) -> Element {
    WidgetNode::new(Panel::default()).with_children(children).into()
}

/// Counter whose button increments its state.
pub struct CounterView {
    pub renders: Arc<AtomicUsize>,
}

impl CounterView {
    pub fn new() -> Self {
        Self {
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl View for CounterView {
    fn name(&self) -> &'static str {
        "CounterView"
    }

    fn build(&self, cx: &mut ViewContext) -> anyhow::Result<Element> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let count = cx.use_state(0i64);
        let handle = count.clone();
        let mut button = Probe::new(&format!("count {}", count.value()));
        button.on_click = Some(EventHandler::sync(move |_| {
            handle.update(|n| n + 1);
            Ok(())
        }));
        Ok(button.into())
    }
}

/// Publishes its state cell so tests can write to it from outside the
/// session, the way a timer or background task would.
pub struct Ticker {
    pub cell: Arc<Mutex<Option<State<i64>>>>,
    pub renders: Arc<AtomicUsize>,
}

impl Ticker {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn share(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            renders: self.renders.clone(),
        }
    }

    pub fn state(&self) -> State<i64> {
        self.cell.lock().clone().expect("ticker rendered")
    }
}

impl View for Ticker {
    fn name(&self) -> &'static str {
        "Ticker"
    }

    fn build(&self, cx: &mut ViewContext) -> anyhow::Result<Element> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let ticks = cx.use_state(0i64);
        *self.cell.lock() = Some(ticks.clone());
        Ok(Probe::new(&format!("tick {}", ticks.value())).into())
    }
}

/// A view whose build always fails.
pub struct FailingView;

impl View for FailingView {
    fn name(&self) -> &'static str {
        "FailingView"
    }

    fn build(&self, _cx: &mut ViewContext) -> anyhow::Result<Element> {
        anyhow::bail!("backend unavailable")
    }
}

/// A view whose build panics.
pub struct PanickingView;

impl View for PanickingView {
    fn name(&self) -> &'static str {
        "PanickingView"
    }

    fn build(&self, _cx: &mut ViewContext) -> anyhow::Result<Element> {
        panic!("render exploded")
    }
}

/// Records the order in which values arrive.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}
