use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

use oauth2_core::ErrorKind;

/// Prometheus counters for the authorization and token flows.
///
/// Cloning is cheap; every clone shares the same underlying counters.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,
    pub transactions_started_total: IntCounter,
    pub transactions_resumed_total: IntCounter,
    pub decisions_total: IntCounterVec,
    pub exchanges_total: IntCounterVec,
    pub errors_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let transactions_started_total = IntCounter::with_opts(Opts::new(
            "oauth2_transactions_started_total",
            "Authorization transactions persisted to await a decision",
        ))?;
        let transactions_resumed_total = IntCounter::with_opts(Opts::new(
            "oauth2_transactions_resumed_total",
            "Persisted transactions resumed",
        ))?;
        let decisions_total = IntCounterVec::new(
            Opts::new("oauth2_decisions_total", "Authorization decisions by outcome"),
            &["outcome"],
        )?;
        let exchanges_total = IntCounterVec::new(
            Opts::new("oauth2_exchanges_total", "Token exchanges by grant type"),
            &["grant_type"],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new("oauth2_errors_total", "Errors surfaced by kind"),
            &["kind"],
        )?;

        registry.register(Box::new(transactions_started_total.clone()))?;
        registry.register(Box::new(transactions_resumed_total.clone()))?;
        registry.register(Box::new(decisions_total.clone()))?;
        registry.register(Box::new(exchanges_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            registry,
            transactions_started_total,
            transactions_resumed_total,
            decisions_total,
            exchanges_total,
            errors_total,
        })
    }

    pub fn record_decision(&self, allow: bool) {
        let outcome = if allow { "allow" } else { "deny" };
        self.decisions_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_exchange(&self, grant_type: &str) {
        self.exchanges_total.with_label_values(&[grant_type]).inc();
    }

    pub fn record_error(&self, kind: ErrorKind) {
        let kind = match kind {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Token => "token",
            ErrorKind::Server => "server",
        };
        self.errors_total.with_label_values(&[kind]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode_prometheus_text;

    #[test]
    fn counters_are_exported() {
        let metrics = Metrics::new().unwrap();
        metrics.transactions_started_total.inc();
        metrics.record_decision(true);
        metrics.record_decision(false);
        metrics.record_exchange("authorization_code");
        metrics.record_error(ErrorKind::Authorization);

        let text = String::from_utf8(encode_prometheus_text(&metrics.registry).unwrap()).unwrap();
        assert!(text.contains("oauth2_transactions_started_total 1"));
        assert!(text.contains("oauth2_decisions_total{outcome=\"allow\"} 1"));
        assert!(text.contains("oauth2_decisions_total{outcome=\"deny\"} 1"));
        assert!(text.contains("oauth2_exchanges_total{grant_type=\"authorization_code\"} 1"));
        assert!(text.contains("oauth2_errors_total{kind=\"authorization\"} 1"));
    }

    #[test]
    fn clones_share_counters() {
        let metrics = Metrics::new().unwrap();
        let clone = metrics.clone();
        clone.transactions_resumed_total.inc();
        assert_eq!(metrics.transactions_resumed_total.get(), 1);
    }
}
