//! Common fixtures for legend-core integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// A spec touching every built-in component
pub const FULL_SPEC: &str = r#"
service: storefront
description: Storefront backend
uid: storefront-backend
tags: [storefront]
grafana_folder: Storefront
components:
  http:
    dimensions:
      - job: storefront
    panels_in_row: 3
  redis:
    dimensions:
      - instance: cache-1:6379
  rds:
    dimensions:
      - DBInstanceIdentifier: storefront-db
        region: eu-west-1
  elb:
    hide: true
    dimensions:
      - LoadBalancerName: storefront-lb
  sqs:
    dimensions:
      - QueueName: storefront-orders
    panels:
      - title: Messages Visible
        alert_config:
          priority: P2
          rule:
            for: 15m
          condition_query: OR,max,1,15m,now,gt,5000
"#;

/// Write `spec` into `dir` and return its path
pub fn write_spec(dir: &Path, spec: &str) -> PathBuf {
    let path = dir.join("dashboard.yaml");
    fs::write(&path, spec).unwrap();
    path
}

/// Shell script standing in for `jsonnet`; echoes its arguments and the
/// size of the input file as JSON.
#[cfg(unix)]
pub fn fake_jsonnet(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("jsonnet");
    let script = r#"#!/bin/sh
input="$3"
if [ "$1" != "-J" ] || [ ! -f "$input" ]; then
  echo "usage: jsonnet -J <lib> <file>" >&2
  exit 2
fi
printf '{"library": "%s", "bytes": %s}\n' "$2" "$(wc -c < "$input" | tr -d ' ')"
"#;
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
