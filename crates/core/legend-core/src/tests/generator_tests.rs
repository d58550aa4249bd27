//! Tests for the full expansion and output rendering

use crate::assemble::NotificationRef;
use crate::generator::DashboardGenerator;
use crate::spec::InputSpec;
use crate::LegendError;
use tempfile::TempDir;

const SPEC: &str = r#"
service: payments
description: Payments API
tags: [payments, tier-1]
references:
  - title: Runbook
    url: https://runbooks.local/payments
alert_channels:
  - name: payments-oncall
components:
  http:
    dimensions:
      - job: payments-api
    panels:
      - title: 5xx Errors
        alert_config:
          rule:
            for: 2m
      - title: Saturation
        targets:
          - expr: process_open_fds
            legendFormat: fds
  sqs:
    hide: true
    dimensions:
      - QueueName: payment-events
"#;

fn notifications() -> Vec<NotificationRef> {
    vec![NotificationRef { uid: "oncall".into() }]
}

#[test]
fn test_assemble_full_spec() {
    let spec = InputSpec::from_yaml(SPEC).unwrap();
    let dashboard = DashboardGenerator::default().assemble(&spec, &notifications()).unwrap();

    assert_eq!(dashboard.dashboard_uid, "payments");
    assert_eq!(dashboard.metric.keys().collect::<Vec<_>>(), vec!["http", "sqs"]);

    let http = &dashboard.metric["http"][0];
    let titles: Vec<&str> = http.panels.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Request Rate", "5xx Errors", "Latency", "Saturation"]);

    // override merged into the library alert, library condition kept
    let errors = &http.panels[1];
    let alert = errors.alert_config.as_ref().unwrap();
    assert_eq!(alert.rule["for"], "2m");
    assert_eq!(alert.conditions.len(), 1);
    assert!(errors.alertrender.contains(r#"forDuration="2m""#));
    assert!(errors.alertrender.contains(r#"notifications=[{"uid":"oncall"}]"#));

    // custom panel renders with the template's datasource
    assert!(http.panels[3].targets[0].render.starts_with("prometheus.target("));

    assert_eq!(dashboard.component_desc.keys().collect::<Vec<_>>(), vec!["http", "sqs"]);

    let rows = &dashboard.assemble_panels;
    assert_eq!(rows.len(), 2);
    assert!(!rows[0].collapsed);
    assert!(rows[0].description.is_some());
    assert!(rows[1].collapsed);
    assert!(rows[1].description.is_none());
    assert_eq!(rows[1].title, "SQS: payment-events");
}

#[test]
fn test_generate_renders_grafonnet_document() {
    let spec = InputSpec::from_yaml(SPEC).unwrap();
    let document = DashboardGenerator::default().generate(&spec, &notifications()).unwrap();
    let jsonnet = &document.jsonnet;

    assert!(jsonnet.contains("local grafana = import 'grafonnet/grafana.libsonnet';"));
    assert!(jsonnet.contains(r#"dashboard.new(
  "payments","#));
    assert!(jsonnet.contains(r#"uid="payments""#));
    assert!(jsonnet.contains(r#"tags=["payments","tier-1"]"#));
    assert!(jsonnet.contains(r#"url="https://runbooks.local/payments""#));
    assert!(jsonnet.contains(r#"row.new(title="HTTP: payments-api", collapse=false)"#));
    assert!(jsonnet.contains(r#"row.new(title="SQS: payment-events", collapse=true)"#));
    assert!(jsonnet.contains("text.new("));
    assert!(jsonnet.contains("graphPanel.new("));
    assert!(jsonnet.contains(r#""Saturation","#));
    assert!(jsonnet.contains(".addTarget("));
    assert!(jsonnet.contains(".addAlert("));
    assert!(jsonnet.contains("alertCondition.new("));
    assert!(jsonnet.contains("cloudwatch.target("));
    assert!(jsonnet.contains("gridPos: {"));
    assert!(jsonnet.contains(r#""w":24"#));
}

#[test]
fn test_spec_without_alert_channels_still_alerts() {
    let spec = InputSpec::from_yaml(
        r#"
service: rds-only
components:
  rds:
    dimensions:
      - DBInstanceIdentifier: main
"#,
    )
    .unwrap();
    let document = DashboardGenerator::default().generate(&spec, &[]).unwrap();
    assert!(document.jsonnet.contains("notifications=[]"));
    assert!(document.jsonnet.contains(r#"service: "rds-only""#));
}

#[test]
fn test_unknown_component_fails_generation() {
    let spec = InputSpec::from_yaml("service: x\ncomponents:\n  kafka: {}\n").unwrap();
    let err = DashboardGenerator::default().generate(&spec, &[]).unwrap_err();
    assert!(matches!(err, LegendError::UnknownComponent(_)));
}

#[test]
fn test_write_jsonnet_uses_unique_names() {
    let dir = TempDir::new().unwrap();
    let spec = InputSpec::from_yaml(SPEC).unwrap();
    let document = DashboardGenerator::default().generate(&spec, &[]).unwrap();

    let first = document.write_jsonnet(dir.path()).unwrap();
    let second = document.write_jsonnet(dir.path()).unwrap();
    assert_ne!(first, second);

    let name = first.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("legend-"));
    assert!(name.ends_with(".jsonnet"));
    assert_eq!(std::fs::read_to_string(&first).unwrap(), document.jsonnet);
}
