//! Property-based tests using proptest
//!
//! These tests verify query filter omission, pagination termination and
//! record flattening using randomized inputs.

use async_trait::async_trait;
use hcso_provider::cloud::auth::{validate_project_id, validate_region};
use hcso_provider::pipeline::{ListRequest, MarkerPager, QueryFilter, Transport};
use hcso_provider::resource::vpc_routes::ROUTE_MAPPER;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Generate an arbitrary filter value, empty or not
fn arb_filter_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(json!("")),
        Just(json!([])),
        Just(json!({})),
        "[a-z0-9./-]{1,20}".prop_map(Value::String),
        any::<i32>().prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
        prop::collection::vec("[a-z0-9-]{1,10}", 1..4).prop_map(|v| json!(v)),
    ]
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Generate an arbitrary route record with optional fields missing
fn arb_route() -> impl Strategy<Value = Value> {
    (
        "[a-f0-9]{8}",
        prop::option::of(prop_oneof!["peering", "ecs", "eni", "vip"]),
        prop::option::of("[a-f0-9]{8}"),
        prop::option::of("10\\.[0-9]{1,3}\\.0\\.0/16"),
        "[a-z_]{1,10}",
    )
        .prop_map(|(id, route_type, vpc_id, destination, extra)| {
            let mut record = json!({ "id": id });
            record[format!("x_{}", extra)] = json!("unmapped");
            if let Some(t) = route_type {
                record["type"] = json!(t);
            }
            if let Some(v) = vpc_id {
                record["vpc_id"] = json!(v);
            }
            if let Some(d) = destination {
                record["destination"] = json!(d);
            }
            record
        })
}

/// Serves the same page forever, counting requests
struct Repeating {
    page: Value,
    requests: AtomicUsize,
}

#[async_trait]
impl Transport for Repeating {
    async fn get(&self, _service: &str, _path: &str, _query: &[(String, String)]) -> hcso_provider::Result<Value> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.page.clone())
    }
}

fn ids(n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({ "id": format!("r{}", i) })).collect()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

mod filter_tests {
    use super::*;

    proptest! {
        /// Empty values never reach the query string; everything else does
        #[test]
        fn test_remove_nil_keeps_only_non_empty(
            candidates in prop::collection::btree_map("[a-z_]{1,12}", arb_filter_value(), 0..10)
        ) {
            let filter = QueryFilter::remove_nil(candidates.clone());
            let expected: BTreeMap<&String, &Value> =
                candidates.iter().filter(|(_, v)| !is_empty(v)).collect();

            prop_assert_eq!(filter.len(), expected.len());
            for (key, value) in &candidates {
                if is_empty(value) {
                    prop_assert!(filter.get(key).is_none());
                } else {
                    prop_assert_eq!(filter.get(key), Some(value));
                }
            }
        }

        /// Query pairs come out sorted by key
        #[test]
        fn test_pairs_sorted(
            candidates in prop::collection::btree_map("[a-z_]{1,12}", arb_filter_value(), 0..10)
        ) {
            let pairs = QueryFilter::remove_nil(candidates).to_pairs();
            let keys: Vec<&String> = pairs.iter().map(|(k, _)| k).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(keys, sorted);
            prop_assert!(pairs.iter().all(|(_, v)| !v.is_empty()));
        }

        /// Zero and false are real values
        #[test]
        fn test_zero_and_false_are_kept(key in "[a-z_]{1,12}") {
            let filter = QueryFilter::new().with(&key, json!(0));
            prop_assert_eq!(filter.to_pairs(), vec![(key.clone(), "0".to_string())]);
            let filter = QueryFilter::new().with(&key, json!(false));
            prop_assert_eq!(filter.to_pairs(), vec![(key, "false".to_string())]);
        }
    }
}

mod pagination_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// A page shorter than the page size is always the last one
        #[test]
        fn test_short_page_is_last(n in 1usize..50, extra in 1usize..20) {
            let transport = Repeating { page: json!({ "routes": ids(n) }), requests: AtomicUsize::new(0) };
            let pager = MarkerPager::new("routes", "id", "marker").page_size("limit", n + extra);
            let request = ListRequest::get("vpc", "/v2.0/vpc/routes");

            let items = block_on(pager.collect(&transport, &request)).unwrap();
            prop_assert_eq!(items.as_array().unwrap().len(), n);
            prop_assert_eq!(transport.requests.load(Ordering::SeqCst), 1);
        }

        /// A server that ignores the marker cannot loop the pager
        #[test]
        fn test_repeated_marker_terminates(n in 1usize..50) {
            let transport = Repeating { page: json!({ "routes": ids(n) }), requests: AtomicUsize::new(0) };
            let pager = MarkerPager::new("routes", "id", "marker").max_pages(1000);
            let request = ListRequest::get("vpc", "/v2.0/vpc/routes");

            prop_assert!(block_on(pager.collect(&transport, &request)).is_ok());
            prop_assert_eq!(transport.requests.load(Ordering::SeqCst), 2);
        }
    }
}

mod flatten_tests {
    use super::*;

    proptest! {
        /// Every mapped row has exactly the declared attributes
        #[test]
        fn test_rows_have_declared_attributes(records in prop::collection::vec(arb_route(), 0..20)) {
            let rows = ROUTE_MAPPER.map_all(&Value::Array(records.clone())).unwrap();
            prop_assert_eq!(rows.len(), records.len());

            let declared: Vec<&str> = ROUTE_MAPPER.fields().iter().map(|f| f.attribute).collect();
            for (row, record) in rows.iter().zip(&records) {
                let mut keys: Vec<&str> = row.keys().map(String::as_str).collect();
                let mut want = declared.clone();
                keys.sort_unstable();
                want.sort_unstable();
                prop_assert_eq!(keys, want);
                prop_assert_eq!(&row["id"], &record["id"]);
                prop_assert!(row.values().all(|v| v.is_string()));
            }
        }
    }
}

mod validation_tests {
    use super::*;

    proptest! {
        /// Project IDs are 32 lowercase hex characters
        #[test]
        fn test_valid_project_ids(id in "[0-9a-f]{32}") {
            prop_assert!(validate_project_id(&id));
        }

        #[test]
        fn test_invalid_project_ids(id in "[0-9a-f]{0,31}|[0-9a-f]{33,40}|[G-Z]{32}") {
            prop_assert!(!validate_project_id(&id));
        }

        /// Region names with spaces or slashes are rejected
        #[test]
        fn test_invalid_regions(region in "[a-z]{1,5}[ /][a-z]{1,5}") {
            prop_assert!(!validate_region(&region));
        }
    }
}
