use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the
    /// feed revalidation interval as a static gauge.
    pub fn init(revalidate_secs: u64) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")
            })?
            .clone();

        describe_counter!("resolve_hops_total", "Pages fetched while following jump pages.");
        describe_counter!("resolve_outcome_total", "Finished resolutions by outcome.");
        describe_counter!("extract_failures_total", "Articles that fell back to the placeholder.");
        describe_counter!("inference_requests_total", "Requests accepted by the inference worker.");
        describe_counter!("inference_errors_total", "Inference requests that failed.");
        describe_histogram!("inference_latency_ms", "Inference request latency in milliseconds.");

        gauge!("feed_revalidate_secs").set(revalidate_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
