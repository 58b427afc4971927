//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cleanwatch_http_requests_total", "Total number of HTTP requests"),
        &["method", "status"]
    ).expect("metric can be created");

    // Overdue check Metrics
    pub static ref OVERDUE_CHECK_RUNS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cleanwatch_overdue_check_runs_total", "Total number of overdue check runs"),
        &["trigger", "status"]
    ).expect("metric can be created");
    pub static ref OVERDUE_CHECK_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "cleanwatch_overdue_check_duration_seconds",
            "Overdue check run duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["trigger"]
    ).expect("metric can be created");
    pub static ref WASHROOM_EVALUATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cleanwatch_washroom_evaluations_total", "Washroom evaluations by resulting status"),
        &["status"]
    ).expect("metric can be created");

    // Email Metrics
    pub static ref EMAILS_SENT_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cleanwatch_emails_sent_total", "Total number of alert emails attempted"),
        &["outcome"]
    ).expect("metric can be created");

    // Application Metrics
    pub static ref CLEANING_LOGS_RECORDED_TOTAL: IntCounter = IntCounter::new(
        "cleanwatch_cleaning_logs_recorded_total",
        "Total number of cleaning logs recorded"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cleanwatch_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; registration only happens on the first call.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
            .expect("HTTP_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(OVERDUE_CHECK_RUNS_TOTAL.clone()))
            .expect("OVERDUE_CHECK_RUNS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(OVERDUE_CHECK_DURATION_SECONDS.clone()))
            .expect("OVERDUE_CHECK_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(WASHROOM_EVALUATIONS_TOTAL.clone()))
            .expect("WASHROOM_EVALUATIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(EMAILS_SENT_TOTAL.clone()))
            .expect("EMAILS_SENT_TOTAL can be registered");
        REGISTRY
            .register(Box::new(CLEANING_LOGS_RECORDED_TOTAL.clone()))
            .expect("CLEANING_LOGS_RECORDED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Record the outcome and duration of one overdue check run.
pub fn observe_overdue_check(trigger: &str, status: &str, elapsed: Duration) {
    OVERDUE_CHECK_RUNS_TOTAL
        .with_label_values(&[trigger, status])
        .inc();
    OVERDUE_CHECK_DURATION_SECONDS
        .with_label_values(&[trigger])
        .observe(elapsed.as_secs_f64());
}
