mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use tether::event::{
    invoke, invoke_upload, read_to_end, stream_from_chunks, Dispatch, EventHandler, FileMetadata,
    NotHandled, UploadHandler, ValueHandler,
};
use tether::widget::WidgetNode;

use common::{Journal, Mode, Probe};

fn probe_with(f: impl FnOnce(&mut Probe)) -> WidgetNode {
    let mut probe = Probe::new("probe");
    f(&mut probe);
    WidgetNode::new(probe)
}

/// A tuple event with the wrong number of arguments is not handled and the
/// handler never runs.
#[tokio::test]
async fn test_tuple_arity_mismatch_is_not_handled() {
    let called = Arc::new(AtomicBool::new(false));
    let flag = called.clone();
    let node = probe_with(|p| {
        p.on_pair = Some(ValueHandler::<(i64, String)>::sync(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }))
    });

    let dispatch = invoke(&node, "on_pair", &[json!(1)]).await.expect("dispatch");
    assert_eq!(dispatch, Dispatch::NotHandled(NotHandled::BadArguments));
    assert!(!called.load(Ordering::SeqCst));
}

/// Tuples arrive either as positional arguments or as one array.
#[tokio::test]
async fn test_tuple_accepts_both_layouts() {
    let journal = Journal::default();
    let log = journal.clone();
    let node = probe_with(|p| {
        p.on_pair = Some(ValueHandler::<(i64, String)>::sync(move |event| {
            let (n, s) = event.value;
            log.push(format!("{n}:{s}"));
            Ok(())
        }))
    });

    let positional = invoke(&node, "on_pair", &[json!(3), json!("a")]).await.expect("dispatch");
    let packed = invoke(&node, "onPair", &[json!([4, "b"])]).await.expect("dispatch");
    assert!(positional.is_handled());
    assert!(packed.is_handled());
    assert_eq!(journal.entries(), vec!["3:a", "4:b"]);
}

/// Enumerations match by case-insensitive name or by ordinal.
#[tokio::test]
async fn test_enum_by_name_or_ordinal() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::<Mode>::new()));
    let sink = seen.clone();
    let node = probe_with(|p| {
        p.on_mode = Some(ValueHandler::<Mode>::sync(move |event| {
            sink.lock().push(event.value);
            Ok(())
        }))
    });

    for arg in [json!("high"), json!(1), json!("0")] {
        let dispatch = invoke(&node, "on_mode", &[arg]).await.expect("dispatch");
        assert!(dispatch.is_handled());
    }
    let unknown = invoke(&node, "on_mode", &[json!("turbo")]).await.expect("dispatch");
    assert_eq!(unknown.reason(), Some(NotHandled::BadArguments));
    assert_eq!(*seen.lock(), vec![Mode::High, Mode::Low, Mode::Off]);
}

/// Numeric strings are accepted for numeric values.
#[tokio::test]
async fn test_single_value_is_coerced() {
    let journal = Journal::default();
    let log = journal.clone();
    let node = probe_with(|p| {
        p.on_value = Some(ValueHandler::<i64>::sync(move |event| {
            log.push(event.value.to_string());
            Ok(())
        }))
    });

    assert!(invoke(&node, "on_value", &[json!("41")]).await.expect("dispatch").is_handled());
    assert!(invoke(&node, "on_value", &[json!(2.0)]).await.expect("dispatch").is_handled());
    let wrong = invoke(&node, "on_value", &[json!("forty")]).await.expect("dispatch");
    assert_eq!(wrong.reason(), Some(NotHandled::BadArguments));
    assert_eq!(journal.entries(), vec!["41", "2"]);
}

/// `Handled` is only returned after an async handler has finished.
#[tokio::test]
async fn test_async_handler_is_awaited() {
    let done = Arc::new(AtomicBool::new(false));
    let flag = done.clone();
    let node = probe_with(|p| {
        p.on_click = Some(EventHandler::new(move |_| {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
        }))
    });

    let dispatch = invoke(&node, "on_click", &[]).await.expect("dispatch");
    assert!(dispatch.is_handled());
    assert!(done.load(Ordering::SeqCst));
}

/// The sender passed to the handler is the node the event was routed to.
#[tokio::test]
async fn test_handler_receives_sender() {
    let journal = Journal::default();
    let log = journal.clone();
    let node = probe_with(|p| {
        p.on_click = Some(EventHandler::sync(move |event| {
            let probe = event.sender.widget::<Probe>().expect("sender is a probe");
            log.push(format!("{}:{}", event.name, probe.label));
            Ok(())
        }))
    });

    invoke(&node, "onClick", &[json!("ignored")]).await.expect("dispatch");
    assert_eq!(journal.entries(), vec!["onClick:probe"]);
}

/// Declared events without a handler and unknown names are reported, not failed.
#[tokio::test]
async fn test_detached_and_unknown_events() {
    let node = WidgetNode::new(Probe::new("bare"));
    let detached = invoke(&node, "on_click", &[]).await.expect("dispatch");
    assert_eq!(detached.reason(), Some(NotHandled::Detached));

    let unknown = invoke(&node, "on_hover", &[]).await.expect("dispatch");
    assert_eq!(unknown.reason(), Some(NotHandled::UnknownEvent));
}

/// Upload delegates are not reachable as plain events.
#[tokio::test]
async fn test_upload_is_not_a_plain_event() {
    let node = probe_with(|p| {
        p.on_file = Some(UploadHandler::new(|_, _, _| async { Ok(()) }));
    });
    let dispatch = invoke(&node, "on_file", &[]).await.expect("dispatch");
    assert_eq!(dispatch.reason(), Some(NotHandled::UnknownEvent));
}

/// A handler error surfaces as an error, not as "not handled".
#[tokio::test]
async fn test_handler_error_propagates() {
    let node = probe_with(|p| {
        p.on_click = Some(EventHandler::sync(|_| anyhow::bail!("save failed")));
    });
    let error = invoke(&node, "on_click", &[]).await.expect_err("handler fails");
    assert_eq!(error.to_string(), "save failed");
}

/// Uploads stream their chunks to the delegate.
#[tokio::test]
async fn test_upload_streams_body() {
    let journal = Journal::default();
    let log = journal.clone();
    let node = probe_with(|p| {
        p.on_file = Some(UploadHandler::new(move |meta, mut stream, cancel| {
            let log = log.clone();
            async move {
                let bytes = read_to_end(&mut stream, &cancel).await?;
                log.push(format!("{}={}", meta.name, String::from_utf8_lossy(&bytes)));
                Ok(())
            }
        }));
    });

    let meta = FileMetadata {
        name: "notes.txt".to_string(),
        content_type: Some("text/plain".to_string()),
        size: Some(11),
    };
    let stream = stream_from_chunks(vec![&b"hello "[..], &b"world"[..]]);
    let dispatch = invoke_upload(&node, "on_file", meta, stream, CancellationToken::new())
        .await
        .expect("upload");
    assert!(dispatch.is_handled());
    assert_eq!(journal.entries(), vec!["notes.txt=hello world"]);
}
