use std::env;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

pub const DEFAULT_METRICS_PORT: u16 = 9101;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_port(port_env: &str, default_port: u16) -> u16 {
    env::var(port_env)
        .ok()
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .unwrap_or(default_port)
}

/// Installs the global Prometheus recorder and serves it on
/// `0.0.0.0:<port>`, the port taken from `port_env` or `default_port`.
///
/// Must be called from within the tokio runtime. Later calls return the
/// handle of the first successful installation.
pub fn init_metrics(port_env: &str, default_port: u16) -> Option<&'static PrometheusHandle> {
    if let Some(existing) = PROMETHEUS_HANDLE.get() {
        return Some(existing);
    }

    let port = metrics_port(port_env, default_port);
    let (recorder, exporter) = match PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .build()
    {
        Ok(parts) => parts,
        Err(err) => {
            warn!(error = %err, metrics_port = port, "failed to build prometheus exporter");
            return None;
        }
    };

    let handle = recorder.handle();
    if metrics::set_global_recorder(recorder).is_err() {
        warn!(metrics_port = port, "a metrics recorder is already installed");
        return PROMETHEUS_HANDLE.get();
    }

    tokio::spawn(async move {
        if let Err(err) = exporter.await {
            // `ExporterError` implements neither `Debug` nor `Display` in
            // metrics-exporter-prometheus 0.15, so it cannot be logged.
            let _ = err;
            warn!("prometheus exporter stopped");
        }
    });

    let _ = PROMETHEUS_HANDLE.set(handle);
    info!(metrics_port = port, "started prometheus exporter");
    PROMETHEUS_HANDLE.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn metrics_port_falls_back_to_default() {
        let _guard = ENV_GUARD.lock().unwrap();

        env::set_var("ECO_TEST_METRICS_PORT", "9300");
        assert_eq!(metrics_port("ECO_TEST_METRICS_PORT", DEFAULT_METRICS_PORT), 9300);

        env::set_var("ECO_TEST_METRICS_PORT", "not-a-port");
        assert_eq!(metrics_port("ECO_TEST_METRICS_PORT", DEFAULT_METRICS_PORT), 9101);

        env::remove_var("ECO_TEST_METRICS_PORT");
        assert_eq!(metrics_port("ECO_TEST_METRICS_PORT", 9200), 9200);
    }
}
