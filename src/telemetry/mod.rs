//! Logging and optional OTLP export for job runs.
//!
//! Progress events always reach a fmt layer on stdout. With an OTLP endpoint,
//! the `job.run` span tree and the run metrics are exported too.

pub mod metrics;
pub mod run;

use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::config::Config;
use crate::error::{Error, Result};

const SERVICE_NAME: &str = "stateful-processor";

pub struct TelemetryConfig {
    /// OTLP gRPC collector, e.g. `http://localhost:4317`.
    pub endpoint: Option<String>,
    pub service_name: String,
    /// Filter applied when `RUST_LOG` is unset.
    pub log_level: String,
}

impl TelemetryConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.otel_endpoint.clone(),
            service_name: SERVICE_NAME.to_string(),
            log_level: config.log_level.clone(),
        }
    }
}

/// Exporting providers, present only when an endpoint was configured.
struct Exporters {
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
}

/// Keeps the export pipelines alive for one job. Dropping it shuts them
/// down, which flushes the last batch; drop it before the process exits.
pub struct TelemetryGuard {
    exporters: Option<Exporters>,
}

impl TelemetryGuard {
    pub fn is_exporting(&self) -> bool {
        self.exporters.is_some()
    }

    pub fn force_flush(&self) {
        if let Some(ref exporters) = self.exporters {
            let _ = exporters.tracer.force_flush();
            let _ = exporters.meter.force_flush();
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(exporters) = self.exporters.take() {
            let _ = exporters.meter.shutdown();
            let _ = exporters.tracer.shutdown();
        }
    }
}

/// Install the global subscriber for this process.
///
/// # Errors
///
/// [`Error::Config`] when an exporter cannot be built or a global subscriber
/// is already set.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    use opentelemetry::trace::TracerProvider as _;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber_err = |e: tracing_subscriber::util::TryInitError| {
        Error::Config(format!("failed to init tracing subscriber: {e}"))
    };

    let Some(endpoint) = config.endpoint else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(subscriber_err)?;
        return Ok(TelemetryGuard { exporters: None });
    };

    let exporters = build_exporters(&endpoint, config.service_name)?;
    opentelemetry::global::set_meter_provider(exporters.meter.clone());
    let run_spans =
        tracing_opentelemetry::layer().with_tracer(exporters.tracer.tracer(SERVICE_NAME));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .with(run_spans)
        .try_init()
        .map_err(subscriber_err)?;

    Ok(TelemetryGuard {
        exporters: Some(exporters),
    })
}

fn build_exporters(endpoint: &str, service_name: String) -> Result<Exporters> {
    use opentelemetry_otlp::WithExportConfig as _;

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name)
        .build();

    let spans = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| Error::Config(format!("OTLP span exporter for {endpoint}: {e}")))?;
    let tracer = SdkTracerProvider::builder()
        .with_batch_exporter(spans)
        .with_resource(resource.clone())
        .build();

    let readings = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| Error::Config(format!("OTLP metric exporter for {endpoint}: {e}")))?;
    let meter = SdkMeterProvider::builder()
        .with_periodic_exporter(readings)
        .with_resource(resource)
        .build();

    Ok(Exporters { tracer, meter })
}
