use brrtdispatch::runtime_config::RuntimeConfig;
use brrtdispatch::{App, ContentType, Dispatcher, Request};
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::{json, Value};
use std::hint::black_box;

fn zoo_app() -> App {
    let mut app = App::new();
    app.content_type(ContentType::Json);
    app.get("/", |_| Ok(json!("root")));
    app.get("/zoo/animals", |_| Ok(json!([])));
    app.post("/zoo/animals", |ctx| Ok(Value::Object(ctx.params().clone())));
    app.get("/zoo/animals/:id", |ctx| Ok(json!({ "id": ctx.param("id") })));
    app.put("/zoo/animals/:id", |ctx| Ok(Value::Object(ctx.params().clone())));
    app.get("/zoo/animals/:id/toys/:toy_id", |ctx| {
        Ok(Value::Object(ctx.params().clone()))
    });
    app.get(
        "/zoo/:category/animals/:id/habitats/:habitat_id/sections/:section_id",
        |ctx| Ok(Value::Object(ctx.params().clone())),
    );
    app.post(
        "/inventory/:warehouse_id/feeds/:feed_id/items/:item_id/batches/:batch_id",
        |ctx| Ok(Value::Object(ctx.params().clone())),
    );
    app.get("/complex/:a/:b/:c/:d/:e/:f/:g/:h/:i", |ctx| {
        Ok(Value::Object(ctx.params().clone()))
    });
    app.before(|ctx| {
        ctx.set_header("x-bench", "1");
        Ok(())
    });
    app
}

fn requests() -> Vec<Request> {
    vec![
        Request::get("/zoo/animals/123"),
        Request::get("/zoo/animals/123/toys/456?color=red"),
        Request::get("/zoo/cats/animals/123/habitats/88/sections/5"),
        Request::new(Method::POST, "/inventory/1/feeds/2/items/3/batches/4")
            .with_content_type("application/json")
            .with_body(r#"{"qty": 12, "note": "fresh"}"#),
        Request::get("/complex/1/2/3/4/5/6/7/8/9"),
        Request::get("/not/registered"),
    ]
}

fn bench_dispatch(c: &mut Criterion) {
    let dispatcher: Dispatcher = zoo_app().into_dispatcher().expect("app should freeze");
    let reqs = requests();
    c.bench_function("dispatch_inline", |b| {
        b.iter(|| {
            for req in &reqs {
                black_box(dispatcher.handle(req.clone()));
            }
        })
    });
}

fn bench_scheduled(c: &mut Criterion) {
    let engine = zoo_app()
        .freeze_with_config(RuntimeConfig::with_workers(4))
        .expect("app should freeze");
    let reqs = requests();
    c.bench_function("dispatch_scheduled", |b| {
        b.iter(|| {
            let handles: Vec<_> = reqs
                .iter()
                .map(|req| engine.call(req.clone()).expect("spawn"))
                .collect();
            for handle in handles {
                black_box(handle.join().expect("join"));
            }
        })
    });
}

criterion_group!(benches, bench_dispatch, bench_scheduled);
criterion_main!(benches);
