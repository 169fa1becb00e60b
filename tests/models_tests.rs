// Model wire-format tests (Actuator payloads in, camelCase snapshots out)

use actuator_monitor::models::*;

#[test]
fn test_health_parses_components_and_unknown_status() {
    let h: Health = serde_json::from_str(
        r#"{"status":"UP","components":{"db":{"status":"UP","details":{"database":"PostgreSQL"}},"diskSpace":{"status":"UP"}}}"#,
    )
    .unwrap();
    assert!(h.is_up());
    assert_eq!(h.components.as_ref().map(|c| c.len()), Some(2));

    let odd: Health = serde_json::from_str(r#"{"status":"PARTIAL"}"#).unwrap();
    assert_eq!(odd.status, HealthStatus::Unknown);
    assert!(!odd.is_up());

    let oos: Health = serde_json::from_str(r#"{"status":"OUT_OF_SERVICE"}"#).unwrap();
    assert_eq!(oos.status, HealthStatus::OutOfService);
}

#[test]
fn test_metric_descriptor_camel_case_and_lookups() {
    let d: MetricDescriptor = serde_json::from_str(
        r#"{"name":"http.server.requests","baseUnit":"seconds",
            "measurements":[{"statistic":"COUNT","value":12.0},{"statistic":"TOTAL_TIME","value":0.6}],
            "availableTags":[{"tag":"uri","values":["/a","/b"]},{"tag":"method","values":["GET"]}]}"#,
    )
    .unwrap();
    assert_eq!(d.base_unit.as_deref(), Some("seconds"));
    assert_eq!(d.measurement(statistic::COUNT), Some(12.0));
    assert_eq!(d.measurement(statistic::MAX), None);
    assert_eq!(d.measurement_or_zero(statistic::MAX), 0.0);
    assert_eq!(d.tag_values("uri").map(|v| v.len()), Some(2));
    assert!(d.tag_values("status").is_none());
}

#[test]
fn test_endpoint_metric_accepts_partial_payload() {
    let e: EndpointMetric =
        serde_json::from_str(r#"{"endpoint":"/x","method":"GET","requestCount":9}"#).unwrap();
    assert_eq!(e.request_count, 9);
    assert_eq!(e.error_count, 0);
    assert!(e.status_code_distribution.is_empty());
}

#[test]
fn test_traffic_overview_from_endpoints() {
    let endpoints = vec![
        EndpointMetric {
            endpoint: "/a".into(),
            method: "GET".into(),
            request_count: 10,
            error_count: 1,
            avg_response_time: 100.0,
            ..Default::default()
        },
        EndpointMetric {
            endpoint: "/b".into(),
            method: "GET".into(),
            request_count: 30,
            error_count: 3,
            avg_response_time: 300.0,
            ..Default::default()
        },
    ];
    let o = TrafficOverview::from_endpoints(&endpoints);
    assert_eq!(o.total_requests, 40);
    assert_eq!(o.total_errors, 4);
    assert_eq!(o.error_rate, 10.0);
    assert_eq!(o.avg_response_time, 200.0);
    assert_eq!(TrafficOverview::from_endpoints(&[]), TrafficOverview::default());
}

#[test]
fn test_snapshot_serialization_flattens_overview_and_skips_missing_sections() {
    let snapshot = ProjectSnapshot {
        project_id: "project-1".into(),
        timestamp: 1,
        health: Health::down(),
        overview: ProjectOverview {
            score: 0,
            traffic: TrafficOverview {
                total_requests: 5,
                ..Default::default()
            },
        },
        endpoints_source: EndpointsSource::Estimated,
        ..Default::default()
    };
    let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["projectId"], "project-1");
    assert_eq!(json["health"]["status"], "DOWN");
    assert_eq!(json["overview"]["totalRequests"], 5);
    assert_eq!(json["overview"]["score"], 0);
    assert_eq!(json["endpointsSource"], "estimated");
    assert!(json.get("jvmMemory").is_none());
    assert!(json.get("system").is_none());
    assert_eq!(json["externalServices"], serde_json::json!([]));
}

#[test]
fn test_monitoring_records_tolerate_missing_fields() {
    let s: SystemMetric = serde_json::from_str(r#"{"jvm":{"memoryUsed":10.0}}"#).unwrap();
    assert_eq!(s.jvm.memory_used, 10.0);
    assert_eq!(s.database, DatabaseSection::default());

    let log: LogEntry =
        serde_json::from_str(r#"{"level":"ERROR","message":"boom","correlationId":"c-1"}"#).unwrap();
    assert_eq!(log.level, LogLevel::Error);
    assert_eq!(log.correlation_id.as_deref(), Some("c-1"));

    let alert: Alert = serde_json::from_str(r#"{"id":"a1","severity":"CRITICAL"}"#).unwrap();
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert!(!alert.resolved);
}

#[test]
fn test_project_serializes_camel_case() {
    let p = Project {
        id: "project-1".into(),
        name: "Billing".into(),
        api_url: "http://billing".into(),
        description: None,
        color: Some("#3b82f6".into()),
        enabled: true,
    };
    let json = serde_json::to_string(&p).unwrap();
    assert!(json.contains("\"apiUrl\""));
    assert!(!json.contains("description"));
}
