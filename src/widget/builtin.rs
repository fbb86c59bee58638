use std::sync::OnceLock;

use serde_json::Value;

use super::node::Widget;
use super::schema::WidgetSchema;

/// Leaf content normalized into a widget.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub content: Value,
}

impl TextBlock {
    pub fn new(content: impl Into<Value>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl Widget for TextBlock {
    fn schema() -> &'static WidgetSchema<Self> {
        static SCHEMA: OnceLock<WidgetSchema<TextBlock>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            WidgetSchema::builder("TextBlock")
                .prop("content", |w: &TextBlock| &w.content)
                .build()
        })
    }
}

/// Placeholder rendered in place of a view that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorView {
    pub title: String,
    pub message: String,
    pub detail: Option<String>,
}

impl ErrorView {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Build from an error chain; the outer message becomes the message and
    /// the causes, if any, the detail.
    pub fn from_error(title: impl Into<String>, error: &anyhow::Error) -> Self {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        let view = Self::new(title, error.to_string());
        if causes.is_empty() {
            view
        } else {
            view.with_detail(causes.join(": "))
        }
    }
}

impl Widget for ErrorView {
    fn schema() -> &'static WidgetSchema<Self> {
        static SCHEMA: OnceLock<WidgetSchema<ErrorView>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            WidgetSchema::builder("ErrorView")
                .prop("title", |w: &ErrorView| &w.title)
                .prop("message", |w: &ErrorView| &w.message)
                .prop("detail", |w: &ErrorView| &w.detail)
                .build()
        })
    }
}
