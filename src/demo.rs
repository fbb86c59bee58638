//! Small application served by `tether serve`: a counter, a note list and a
//! file drop, built from a handful of widgets declared here.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::effect::{Cleanup, EffectHook, EffectTrigger};
use crate::event::{read_to_end, EventHandler, UploadHandler, ValueHandler};
use crate::server::RootFactory;
use crate::view::{Element, View, ViewContext, ViewElement};
use crate::widget::{Widget, WidgetNode, WidgetSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Container laying out its children in a line. Children may attach a
/// `grow` factor.
#[derive(Debug, Clone)]
pub struct Stack {
    pub orientation: Orientation,
    pub spacing: u32,
}

impl Stack {
    pub fn vertical() -> Self {
        Self {
            orientation: Orientation::Vertical,
            spacing: 8,
        }
    }

    pub fn horizontal() -> Self {
        Self {
            orientation: Orientation::Horizontal,
            spacing: 4,
        }
    }
}

impl Widget for Stack {
    fn schema() -> &'static WidgetSchema<Self> {
        static SCHEMA: OnceLock<WidgetSchema<Stack>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            WidgetSchema::builder("Stack")
                .prop("orientation", |w: &Stack| &w.orientation)
                .prop("spacing", |w: &Stack| &w.spacing)
                .attached("grow")
                .build()
        })
    }
}

#[derive(Debug, Clone)]
pub struct Label {
    pub text: String,
    pub style: Option<String>,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    pub fn styled(text: impl Into<String>, style: &str) -> Self {
        Self {
            text: text.into(),
            style: Some(style.to_string()),
        }
    }
}

impl Widget for Label {
    fn schema() -> &'static WidgetSchema<Self> {
        static SCHEMA: OnceLock<WidgetSchema<Label>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            WidgetSchema::builder("Label")
                .prop("text", |w: &Label| &w.text)
                .prop("style", |w: &Label| &w.style)
                .build()
        })
    }
}

#[derive(Debug, Clone)]
pub struct Button {
    pub label: String,
    pub enabled: bool,
    pub on_click: Option<EventHandler>,
}

impl Button {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            on_click: None,
        }
    }

    pub fn on_click(mut self, handler: EventHandler) -> Self {
        self.on_click = Some(handler);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Widget for Button {
    fn schema() -> &'static WidgetSchema<Self> {
        static SCHEMA: OnceLock<WidgetSchema<Button>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            WidgetSchema::builder("Button")
                .prop("label", |w: &Button| &w.label)
                .prop("enabled", |w: &Button| &w.enabled)
                .event("on_click", |w: &Button| w.on_click.as_ref())
                .build()
        })
    }
}

#[derive(Debug, Clone)]
pub struct TextField {
    pub value: String,
    pub placeholder: Option<String>,
    pub on_change: Option<ValueHandler<String>>,
    pub on_submit: Option<EventHandler>,
}

impl Widget for TextField {
    fn schema() -> &'static WidgetSchema<Self> {
        static SCHEMA: OnceLock<WidgetSchema<TextField>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            WidgetSchema::builder("TextField")
                .prop("value", |w: &TextField| &w.value)
                .prop("placeholder", |w: &TextField| &w.placeholder)
                .value_event("on_change", |w: &TextField| w.on_change.as_ref())
                .event("on_submit", |w: &TextField| w.on_submit.as_ref())
                .build()
        })
    }
}

/// Drop target accepting one file at a time.
#[derive(Debug, Clone)]
pub struct FileDrop {
    pub hint: String,
    pub on_file: Option<UploadHandler>,
}

impl Widget for FileDrop {
    fn schema() -> &'static WidgetSchema<Self> {
        static SCHEMA: OnceLock<WidgetSchema<FileDrop>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            WidgetSchema::builder("FileDrop")
                .prop("hint", |w: &FileDrop| &w.hint)
                .upload("on_file", |w: &FileDrop| w.on_file.as_ref())
                .build()
        })
    }
}

/// Counter with increment, decrement and reset.
pub struct Counter {
    pub step: i64,
}

impl View for Counter {
    fn name(&self) -> &'static str {
        "Counter"
    }

    fn build(&self, cx: &mut ViewContext) -> anyhow::Result<Element> {
        let count = cx.use_state(0i64);

        let logged = count.clone();
        cx.use_effect(
            EffectHook::new("log-count", move || {
                let value = logged.value();
                async move {
                    tracing::debug!(count = value, "counter changed");
                    Ok(Cleanup::none())
                }
            })
            .with_trigger(&count),
        );

        let step = self.step;
        let increment = {
            let count = count.clone();
            EventHandler::sync(move |_| {
                count.update(|n| n + step);
                Ok(())
            })
        };
        let decrement = {
            let count = count.clone();
            EventHandler::sync(move |_| {
                count.update(|n| n - step);
                Ok(())
            })
        };
        let reset = {
            let count = count.clone();
            EventHandler::sync(move |_| {
                count.reset();
                Ok(())
            })
        };

        let value = count.value();
        Ok(WidgetNode::new(Stack::horizontal())
            .with_children(vec![
                Element::from(Button::new("-").on_click(decrement)),
                WidgetNode::new(Label::styled(value.to_string(), "counter"))
                    .attach_for::<Stack>("grow", 1)
                    .into(),
                Button::new("+").on_click(increment).into(),
                Button::new("reset").enabled(value != 0).on_click(reset).into(),
            ])
            .into())
    }
}

/// Editable list of notes. Each note is keyed by its id so that removing
/// one keeps the identity of the others.
pub struct Notes;

#[derive(Debug, Clone, PartialEq)]
struct Note {
    id: u64,
    text: String,
}

impl View for Notes {
    fn name(&self) -> &'static str {
        "Notes"
    }

    fn build(&self, cx: &mut ViewContext) -> anyhow::Result<Element> {
        let notes = cx.use_state(Vec::<Note>::new());
        let draft = cx.use_state(String::new());
        let next_id = cx.use_state(1u64);

        let on_change = {
            let draft = draft.clone();
            ValueHandler::<String>::sync(move |event| {
                draft.set(event.value);
                Ok(())
            })
        };
        let on_submit = {
            let (notes, draft, next_id) = (notes.clone(), draft.clone(), next_id.clone());
            EventHandler::sync(move |_| {
                let text = draft.value();
                if text.trim().is_empty() {
                    return Ok(());
                }
                let id = next_id.value();
                next_id.set(id + 1);
                notes.update(|list| {
                    let mut list = list.clone();
                    list.push(Note { id, text });
                    list
                });
                draft.reset();
                Ok(())
            })
        };

        let mut children: Vec<Element> = vec![TextField {
            value: draft.value(),
            placeholder: Some("New note".to_string()),
            on_change: Some(on_change),
            on_submit: Some(on_submit),
        }
        .into()];

        for note in notes.value() {
            let remove = {
                let (notes, id) = (notes.clone(), note.id);
                EventHandler::sync(move |_| {
                    notes.update(|list| list.iter().filter(|n| n.id != id).cloned().collect());
                    Ok(())
                })
            };
            let row = WidgetNode::new(Stack::horizontal())
                .with_children(vec![
                    WidgetNode::new(Label::new(note.text))
                        .attach_for::<Stack>("grow", 1)
                        .into(),
                    Element::from(Button::new("remove").on_click(remove)),
                ])
                .with_key(format!("note-{}", note.id));
            children.push(row.into());
        }

        Ok(WidgetNode::new(Stack::vertical()).with_children(children).into())
    }
}

/// Accepts an upload and shows its name and size.
pub struct Uploads;

impl View for Uploads {
    fn name(&self) -> &'static str {
        "Uploads"
    }

    fn build(&self, cx: &mut ViewContext) -> anyhow::Result<Element> {
        let last = cx.use_state(None::<(String, usize)>);

        let on_file = {
            let last = last.clone();
            UploadHandler::new(move |meta, mut stream, cancel| {
                let last = last.clone();
                async move {
                    let bytes = read_to_end(&mut stream, &cancel).await?;
                    tracing::info!(file = %meta.name, bytes = bytes.len(), "file received");
                    last.set(Some((meta.name, bytes.len())));
                    Ok(())
                }
            })
        };

        let status = match last.value() {
            Some((name, size)) => format!("{name} ({size} bytes)"),
            None => "nothing uploaded yet".to_string(),
        };

        Ok(WidgetNode::new(Stack::vertical())
            .with_children(vec![
                Element::from(FileDrop {
                    hint: "Drop a file".to_string(),
                    on_file: Some(on_file),
                }),
                Element::text(status),
            ])
            .into())
    }
}

/// Root of the demo application.
pub struct App;

impl View for App {
    fn name(&self) -> &'static str {
        "App"
    }

    fn build(&self, cx: &mut ViewContext) -> anyhow::Result<Element> {
        let home = cx.config().route("home").unwrap_or("/").to_string();
        let renders = cx.pass();
        cx.effect([EffectTrigger::after_init()], || async {
            tracing::info!("demo app mounted");
            Ok(Cleanup::new(|| tracing::info!("demo app unmounted")))
        });

        Ok(WidgetNode::new(Stack::vertical())
            .with_children(vec![
                Element::from(Label::styled(format!("tether demo at {home}"), "title")),
                ViewElement::new(Counter { step: 1 }).with_key("counter").into(),
                ViewElement::new(Notes).with_key("notes").into(),
                ViewElement::new(Uploads).with_key("uploads").into(),
                Element::text(format!("root renders: {renders}")),
            ])
            .into())
    }
}

pub fn factory() -> RootFactory {
    Arc::new(|| Arc::new(App) as Arc<dyn View>)
}
