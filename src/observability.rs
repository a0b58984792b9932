use std::net::SocketAddr;

/// Installs the Prometheus exporter when `LISTING_METRICS_ADDR` is set;
/// otherwise metrics stay no-op recorders.
pub fn init_metrics() {
    let raw = match std::env::var("LISTING_METRICS_ADDR") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return,
    };
    let addr: SocketAddr = match raw.parse() {
        Ok(addr) => addr,
        Err(e) => {
            println!("[metrics] Invalid LISTING_METRICS_ADDR '{}': {}", raw, e);
            return;
        }
    };
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    println!("[metrics] Attempting to install Prometheus exporter on {}", addr);
    match builder.install() {
        Ok(()) => {
            println!(
                "[metrics] Prometheus exporter installed and listening on http://{}/metrics",
                addr
            );
        }
        Err(e) => {
            println!(
                "[metrics] Prometheus exporter install failed (possibly already installed): {}",
                e
            );
        }
    }
}
