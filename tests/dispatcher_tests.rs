#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end tests for the dispatch pipeline through a frozen engine.
//!
//! # Test Coverage
//!
//! - Route resolution with path params across methods, and 404s
//! - Redirects
//! - Request header lookup by snake_cased name
//! - Response header isolation between requests
//! - Handler and filter failures mapped to 500s

mod common;

use brrtdispatch::router::SUPPORTED_METHODS;
use brrtdispatch::{App, ContentType, Request};
use common::engine::{call, freeze, get};
use http::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_every_method_reaches_its_route() {
    let mut app = App::new();
    for method in SUPPORTED_METHODS {
        let name = method.as_str().to_lowercase();
        app.route(method, "/", move |_| Ok(json!(name.clone())));
    }
    let engine = freeze(app);

    for method in SUPPORTED_METHODS {
        let res = call(&engine, Request::new(method.clone(), "/"));
        assert_eq!(res.status, 200);
        assert_eq!(res.get_header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(res.body_str(), method.as_str().to_lowercase());
    }
}

#[test]
fn test_pattern_params_for_get_post_put() {
    let mut app = App::new();
    app.content_type(ContentType::Json);
    for method in [Method::GET, Method::POST, Method::PUT] {
        app.route(method, "/:foo/things/:bar", |ctx| {
            Ok(Value::Object(ctx.params().clone()))
        });
    }
    let engine = freeze(app);

    for method in [Method::GET, Method::POST, Method::PUT] {
        let res = call(&engine, Request::new(method, "/some/things/are_good"));
        assert_eq!(res.status, 200);
        assert_eq!(res.json().unwrap(), json!({"foo": "some", "bar": "are_good"}));
    }

    let res = get(&engine, "/bad/monkey");
    assert_eq!(res.status, 404);
    assert_eq!(res.json().unwrap(), json!({"error": "Not Found"}));

    let res = call(&engine, Request::new(Method::DELETE, "/some/things/are_good"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_redirect() {
    let mut app = App::new();
    app.get("/", |_| Ok(json!("home")));
    app.get("/redirect", |ctx| Ok(ctx.redirect("/")));
    let after_runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&after_runs);
    app.after(move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx.set_header("x-after", "ran");
        Ok(())
    });
    let engine = freeze(app);

    let res = get(&engine, "/redirect");
    assert_eq!(res.status, 301);
    assert_eq!(res.get_header("Location"), Some("/"));
    assert_eq!(res.get_header("content-length"), Some("0"));
    assert_eq!(res.get_header("x-after"), Some("ran"));
    assert_eq!(after_runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_request_header_matches_snake_cased_names() {
    let mut app = App::new();
    app.content_type(ContentType::Json);
    app.get("/rh", |ctx| {
        let values: Vec<Value> = ["hk_1", "hk_2", "hk_3"]
            .iter()
            .map(|key| {
                let header = ctx.param(key).unwrap_or_default();
                json!(ctx.request_header(header))
            })
            .collect();
        Ok(json!({ "values": values }))
    });
    let engine = freeze(app);

    let req = Request::get("/rh?hk_1=foo_bar&hk_2=x_http_mozilla_ie_safari_puke&hk_3=authorization")
        .with_header("Foo-BAR", "abcdef")
        .with_header("X-HTTP-Mozilla-IE-Safari-PuKe", "ghijkl")
        .with_header("Authorization", "Bearer oauth_token_hi");
    let res = call(&engine, req);
    assert_eq!(
        res.json().unwrap(),
        json!({"values": ["abcdef", "ghijkl", "Bearer oauth_token_hi"]})
    );
}

#[test]
fn test_headers_do_not_carry_over_between_requests() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut app = App::new();
    let handler_count = Arc::clone(&count);
    app.put("/incr", move |ctx| {
        if handler_count.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            ctx.set_header("X-Http-Angelo-Server", "catbutt");
        }
        Ok(json!(""))
    });
    let engine = freeze(app);

    for i in 0..6 {
        let res = call(&engine, Request::new(Method::PUT, "/incr"));
        let expected = if i % 2 == 0 { Some("catbutt") } else { None };
        assert_eq!(res.get_header("x-http-angelo-server"), expected, "request {i}");
    }
}

#[test]
fn test_set_header_last_value_wins() {
    let mut app = App::new();
    app.get("/h", |ctx| {
        ctx.set_header("x-stage", "handler-1");
        ctx.set_headers([("X-Stage", "handler-2"), ("x-other", "1")]);
        Ok(Value::Null)
    });
    app.after(|ctx| {
        ctx.set_header("x-stage", "after");
        Ok(())
    });
    let engine = freeze(app);

    let res = get(&engine, "/h");
    assert_eq!(res.get_header("x-stage"), Some("after"));
    assert_eq!(res.get_header("x-other"), Some("1"));
    let stage_headers = res
        .headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("x-stage"))
        .count();
    assert_eq!(stage_headers, 1);
}

#[test]
fn test_handler_panic_returns_500_and_runs_after_filters() {
    let after_runs = Arc::new(AtomicUsize::new(0));
    let mut app = App::new();
    app.content_type(ContentType::Json);
    app.get("/panic", |_| -> anyhow::Result<Value> { panic!("handler blew up") });
    app.get("/error", |_| Err(anyhow::anyhow!("no such pet")));
    app.get("/ok", |_| Ok(json!({"ok": true})));
    let counter = Arc::clone(&after_runs);
    app.after(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let engine = freeze(app);

    let res = get(&engine, "/panic");
    assert_eq!(res.status, 500);
    assert_eq!(res.json().unwrap(), json!({"error": "Internal Server Error"}));

    let res = get(&engine, "/error");
    assert_eq!(res.status, 500);

    // the engine keeps serving after a panic
    let res = get(&engine, "/ok");
    assert_eq!(res.status, 200);
    assert_eq!(after_runs.load(Ordering::SeqCst), 3);
}

#[test]
fn test_before_filter_failure_skips_handler() {
    let handled = Arc::new(AtomicUsize::new(0));
    let mut app = App::new();
    let seen = Arc::clone(&handled);
    app.get("/guarded", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(json!("secret"))
    });
    app.before(|ctx| {
        if ctx.request_header("authorization").is_none() {
            anyhow::bail!("missing credentials");
        }
        Ok(())
    });
    app.before(|ctx| {
        ctx.set_header("x-second-before", "ran");
        Ok(())
    });
    app.after(|ctx| {
        ctx.set_header("x-after", "ran");
        Ok(())
    });
    let engine = freeze(app);

    let res = get(&engine, "/guarded");
    assert_eq!(res.status, 500);
    assert_eq!(res.body_str(), "Internal Server Error");
    assert_eq!(res.get_header("x-second-before"), None);
    assert_eq!(res.get_header("x-after"), Some("ran"));
    assert_eq!(handled.load(Ordering::SeqCst), 0);

    let res = call(
        &engine,
        Request::get("/guarded").with_header("Authorization", "Bearer t"),
    );
    assert_eq!(res.status, 200);
    assert_eq!(res.body_str(), "secret");
    assert_eq!(handled.load(Ordering::SeqCst), 1);
}

#[test]
fn test_after_filter_failure_is_a_500() {
    let mut app = App::new();
    app.get("/", |_| Ok(json!("fine")));
    app.after(|_| Err(anyhow::anyhow!("audit log unavailable")));
    let engine = freeze(app);

    let res = get(&engine, "/");
    assert_eq!(res.status, 500);
    assert_eq!(res.body_str(), "Internal Server Error");
}

#[test]
fn test_reregistration_replaces_handler() {
    let mut app = App::new();
    app.get("/v", |_| Ok(json!("one")));
    app.post("/v", |_| Ok(json!("post")));
    app.get("/v", |_| Ok(json!("two")));
    let engine = freeze(app);

    assert_eq!(get(&engine, "/v").body_str(), "two");
    assert_eq!(call(&engine, Request::post("/v")).body_str(), "post");
    assert_eq!(engine.routes().len(), 2);
}

#[test]
fn test_serve_delivers_to_sink() {
    let mut app = App::new();
    app.get("/pets/:id", |ctx| Ok(json!(format!("pet {}", ctx.param("id").unwrap_or("?")))));
    let engine = freeze(app);

    let (tx, rx) = may::sync::mpsc::channel();
    let handle = engine
        .serve(Request::get("/pets/42"), brrtdispatch::server::channel_sink(tx))
        .unwrap();
    handle.join().unwrap();
    let res = rx.recv().unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body_str(), "pet 42");
    assert!(res.get_header("x-request-id").is_some());
}
