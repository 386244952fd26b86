//! Logging initialisation for Parley processes.
//!
//! Call [`init_tracing`] once at startup.  Session lifecycle, tool dispatch and
//! store appends are all logged through `tracing`; this wires them to the
//! console and, optionally, to an OTLP collector.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `PARLEY_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | When set, spans are also exported over OTLP/HTTP. |
//!
//! # Example
//!
//! ```rust,no_run
//! // Call before building the Tokio runtime and hold the guard until the
//! // runtime has been dropped.
//! let _guard = parley_runtime::telemetry::init_tracing("parley");
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async { /* sessions */ });
//! drop(runtime);
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Console output is compact text unless `PARLEY_LOG_FORMAT=json`.  A second
/// call in the same process leaves the first subscriber in place.
///
/// Call it outside any Tokio runtime.  The returned [`TracerProviderGuard`]
/// must be held until exit; dropping it (again outside the runtime) flushes
/// pending spans.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
    });
    let use_json = std::env::var("PARLEY_LOG_FORMAT").as_deref() == Ok("json");

    let provider = build_provider(
        service_name,
        std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
    );
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("parley")));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer)
        .with(use_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!use_json).then(|| tracing_subscriber::fmt::layer().compact()))
        .try_init();
    if let Err(e) = installed {
        eprintln!("[parley] tracing subscriber already installed: {e}");
    }

    TracerProviderGuard(provider)
}

/// Shuts the OTel provider down (flushing spans) on drop.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// `true` when spans are being exported over OTLP.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[parley] OpenTelemetry provider shutdown error: {e}");
        }
    }
}

/// `None` without an endpoint or when the exporter cannot be built (reported
/// on stderr; console logging still works).
fn build_provider(service_name: &str, endpoint: Option<String>) -> Option<SdkTracerProvider> {
    let endpoint = endpoint?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[parley] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // The batch processor exports from its own thread, so spans closed on
    // runtime workers never run the blocking HTTP client in async context.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::Tracer as _;

    #[test]
    fn no_provider_without_endpoint() {
        assert!(build_provider("parley-test", None).is_none());
    }

    #[test]
    fn init_twice_does_not_panic() {
        // SAFETY: no other test in this crate touches this variable.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        let first = init_tracing("parley-test");
        let second = init_tracing("parley-test");
        assert!(!first.is_exporting());
        assert!(!second.is_exporting());
    }

    #[test]
    fn spans_closed_inside_runtime_export_without_panicking() {
        // Nothing listens on the discard port; export fails quietly.
        let provider = build_provider("parley-test", Some("http://127.0.0.1:9/v1/traces".into()))
            .expect("exporter builds without connecting");
        let guard = TracerProviderGuard(Some(provider.clone()));
        assert!(guard.is_exporting());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let tracer = provider.tracer("parley-test");
            tokio::spawn(async move { tracer.in_span("turn", |_cx| {}) })
                .await
                .unwrap();
        });
        drop(runtime);
        drop(guard);
    }
}
