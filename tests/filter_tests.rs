#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Before/after filter ordering against shared state.

mod common;

use brrtdispatch::router::SUPPORTED_METHODS;
use brrtdispatch::{App, Request};
use common::engine::{call, freeze};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_after_filters_run_after_routes() {
    let invoked = Arc::new(AtomicI64::new(0));
    let mut app = App::new();

    let before = Arc::clone(&invoked);
    app.before(move |_| {
        before.fetch_add(2, Ordering::SeqCst);
        Ok(())
    });
    let after = Arc::clone(&invoked);
    app.after(move |_| {
        let current = after.load(Ordering::SeqCst);
        after.store(current * 2, Ordering::SeqCst);
        Ok(())
    });
    let handler = Arc::clone(&invoked);
    app.any("/after", move |_| {
        Ok(json!(handler.load(Ordering::SeqCst).to_string()))
    });
    let engine = freeze(app);

    let post_handler = ["2", "6", "14", "30", "62"];
    let post_after = [4, 12, 28, 60, 124];
    for (i, method) in SUPPORTED_METHODS.iter().take(5).enumerate() {
        let res = call(
            &engine,
            Request::new(method.clone(), "/after?foo=bar&bat=true"),
        );
        assert_eq!(res.status, 200);
        assert_eq!(res.body_str(), post_handler[i]);
        assert_eq!(invoked.load(Ordering::SeqCst), post_after[i]);
    }
}

#[test]
fn test_filters_run_in_registration_order() {
    let trail = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    for name in ["before-1", "before-2"] {
        let trail = Arc::clone(&trail);
        app.before(move |_| {
            trail.lock().unwrap().push(name);
            Ok(())
        });
    }
    for name in ["after-1", "after-2"] {
        let trail = Arc::clone(&trail);
        app.after(move |_| {
            trail.lock().unwrap().push(name);
            Ok(())
        });
    }
    let handler_trail = Arc::clone(&trail);
    app.get("/", move |_| {
        handler_trail.lock().unwrap().push("handler");
        Ok(json!("ok"))
    });
    let engine = freeze(app);

    call(&engine, Request::get("/"));
    assert_eq!(
        *trail.lock().unwrap(),
        vec!["before-1", "before-2", "handler", "after-1", "after-2"]
    );

    // unmatched requests run no filters
    trail.lock().unwrap().clear();
    let res = call(&engine, Request::get("/nowhere"));
    assert_eq!(res.status, 404);
    assert!(trail.lock().unwrap().is_empty());
}

#[test]
fn test_before_filter_state_does_not_leak() {
    let mut app = App::new();
    app.before(|ctx| {
        if let Some(user) = ctx.request_header("x_user").map(str::to_owned) {
            ctx.params_mut().insert("user".into(), json!(user));
        }
        Ok(())
    });
    app.get("/whoami", |ctx| Ok(json!(ctx.param("user").unwrap_or("anonymous"))));
    let engine = freeze(app);

    let res = call(&engine, Request::get("/whoami").with_header("X-User", "rex"));
    assert_eq!(res.body_str(), "rex");
    let res = call(&engine, Request::get("/whoami"));
    assert_eq!(res.body_str(), "anonymous");
}
