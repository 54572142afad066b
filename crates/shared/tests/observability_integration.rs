//! 可观测性模块集成测试
//!
//! 测试 metrics、middleware 和配置的核心功能。

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use loyalty_shared::observability::metrics::{
        record_fraud_evaluation, record_http_request, record_qr_verification,
        record_redemption, record_transaction,
    };

    #[test]
    fn test_record_http_request() {
        record_http_request("POST", "/api/v1/scan", 200, 0.05);
        record_http_request("POST", "/api/v1/redemptions", 409, 0.02);
        record_http_request("GET", "/api/v1/members/1/points", 404, 0.01);
        record_http_request("POST", "/api/v1/transactions", 500, 0.25);
    }

    #[test]
    fn test_record_pipeline_outcomes() {
        record_transaction("committed", 0.08);
        record_transaction("duplicate", 0.01);
        record_transaction("blocked", 0.03);
        record_redemption("committed", 0.04);
        record_redemption("out_of_stock", 0.01);
    }

    #[test]
    fn test_record_security_signals() {
        for level in ["LOW", "MEDIUM", "HIGH"] {
            record_fraud_evaluation(level);
        }
        for result in ["valid", "INTEGRITY_FAILURE", "EXPIRED", "FUTURE_ISSUED"] {
            record_qr_verification(result);
        }
    }

    #[test]
    fn test_metrics_with_edge_cases() {
        record_http_request("GET", "", 0, 0.0);
        record_transaction("", f64::MAX);
        record_redemption("committed", -1.0);
    }
}

// ============================================================================
// 中间件测试
// ============================================================================

mod middleware_tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use loyalty_shared::observability::middleware::http_tracing;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_http_tracing_passes_response_through() {
        let app = Router::new()
            .route("/ok", get(|| async { "OK" }))
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .layer(middleware::from_fn(http_tracing));

        let ok = app
            .clone()
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let teapot = app
            .oneshot(Request::builder().uri("/teapot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(teapot.status(), StatusCode::IM_A_TEAPOT);
    }
}

// ============================================================================
// 配置测试
// ============================================================================

mod config_tests {
    use loyalty_shared::observability::{ObservabilityConfig, ObservabilityGuard};

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.service_name, "unknown-service");
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_config_from_env() {
        let config = ObservabilityConfig::from_env("loyalty-service");
        assert_eq!(config.service_name, "loyalty-service");
    }

    #[test]
    fn test_empty_guard() {
        let guard = ObservabilityGuard::empty();
        drop(guard);
    }
}
