#![allow(dead_code)]

pub mod test_runtime {
    use brrtdispatch::runtime_config::RuntimeConfig;
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    /// Worker count used by every integration test binary.
    pub const TEST_WORKERS: usize = 4;

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            RuntimeConfig::with_workers(TEST_WORKERS).apply();
        });
    }

    pub fn config() -> RuntimeConfig {
        setup_may_runtime();
        RuntimeConfig::with_workers(TEST_WORKERS)
    }
}

pub mod engine {
    use brrtdispatch::{App, Engine, Request, Response};

    /// Freeze `app` with the shared test runtime configuration.
    pub fn freeze(app: App) -> Engine {
        app.freeze_with_config(super::test_runtime::config())
            .expect("app should freeze")
    }

    /// Dispatch through the scheduler and wait for the response.
    pub fn call(engine: &Engine, request: Request) -> Response {
        engine
            .call(request)
            .expect("task should spawn")
            .join()
            .expect("task should not panic")
    }

    pub fn get(engine: &Engine, target: &str) -> Response {
        call(engine, Request::get(target))
    }
}
