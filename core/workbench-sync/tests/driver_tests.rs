use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use workbench_client::{ClientError, ClientResult, HttpResponse, HttpTransport, Method};
use workbench_fields::{FieldWarning, NoTermLookup};
use workbench_idmap::{DumpFilter, IdentityMapStore};
use workbench_sync::{BatchDriver, RowOutcome, RunSummary, SyncError, read_rows_from};
use workbench_types::{FieldDefinition, RemoteId, Row, TargetType, WorkbenchConfig};

/// In-memory stand-in for the remote node API.
struct FakeRemote {
    next_nid: RefCell<u64>,
    nodes: RefCell<HashMap<u64, Value>>,
    requests: RefCell<Vec<(Method, String, Option<Value>)>>,
    /// Titles whose creation the server rejects.
    reject_titles: Vec<String>,
}

impl FakeRemote {
    fn new(first_nid: u64) -> Self {
        Self {
            next_nid: RefCell::new(first_nid),
            nodes: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
            reject_titles: Vec::new(),
        }
    }

    fn with_node(self, nid: u64, node: Value) -> Self {
        self.nodes.borrow_mut().insert(nid, node);
        self
    }

    fn bodies(&self, method: Method) -> Vec<Value> {
        self.requests
            .borrow()
            .iter()
            .filter(|(m, _, _)| *m == method)
            .filter_map(|(_, _, body)| body.clone())
            .collect()
    }

    fn count(&self, method: Method) -> usize {
        self.requests.borrow().iter().filter(|(m, _, _)| *m == method).count()
    }

    fn node_id(path: &str) -> Option<u64> {
        path.strip_prefix("/node/")?.split('?').next()?.parse().ok()
    }
}

impl HttpTransport for FakeRemote {
    fn issue_request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<HttpResponse> {
        self.requests
            .borrow_mut()
            .push((method, path.to_string(), body.cloned()));
        let mut nodes = self.nodes.borrow_mut();
        let response = match (method, Self::node_id(path)) {
            (Method::Post, None) => {
                let body = body.cloned().unwrap_or(Value::Null);
                let title = body.pointer("/title/0/value").and_then(Value::as_str).unwrap_or("");
                if self.reject_titles.iter().any(|t| t == title) {
                    return Ok(HttpResponse::new(422, "rejected"));
                }
                let mut next = self.next_nid.borrow_mut();
                let nid = *next;
                *next += 1;
                nodes.insert(nid, body);
                HttpResponse::new(201, json!({ "nid": [{ "value": nid }] }).to_string())
            }
            (Method::Get, Some(nid)) => match nodes.get(&nid) {
                Some(node) => HttpResponse::new(200, node.to_string()),
                None => HttpResponse::new(404, ""),
            },
            (Method::Patch, Some(nid)) if nodes.contains_key(&nid) => {
                let patch = body.and_then(Value::as_object).cloned().unwrap_or_default();
                if let Some(Value::Object(node)) = nodes.get_mut(&nid) {
                    node.extend(patch);
                }
                HttpResponse::new(200, "{}")
            }
            (Method::Delete, Some(nid)) => match nodes.remove(&nid) {
                Some(_) => HttpResponse::new(204, ""),
                None => HttpResponse::new(404, ""),
            },
            (Method::Head, Some(nid)) => {
                HttpResponse::new(if nodes.contains_key(&nid) { 200 } else { 404 }, "")
            }
            _ => return Err(ClientError::Network(format!("unrouted {method} {path}"))),
        };
        Ok(response)
    }
}

fn definitions() -> BTreeMap<String, FieldDefinition> {
    BTreeMap::from([
        ("title".to_string(), FieldDefinition::title(255)),
        ("field_description".to_string(), FieldDefinition::new("string_long", 1)),
        ("field_coordinates".to_string(), FieldDefinition::new("geolocation", 2)),
        (
            "field_subject".to_string(),
            FieldDefinition::new("entity_reference", -1)
                .with_target_type(TargetType::TaxonomyTerm)
                .with_vocabularies(["subject"]),
        ),
        (
            "field_member_of".to_string(),
            FieldDefinition::new("entity_reference", -1).with_target_type(TargetType::Node),
        ),
    ])
}

fn config(extra: &str) -> WorkbenchConfig {
    WorkbenchConfig::from_yaml_str(&format!("host: http://localhost\n{extra}"), "create.yml").unwrap()
}

fn rows(config: &WorkbenchConfig, csv: &str) -> Vec<Row> {
    read_rows_from(csv.as_bytes(), config).unwrap()
}

fn run(
    config: &WorkbenchConfig,
    remote: &FakeRemote,
    store: &IdentityMapStore,
    input: &[Row],
    resume_from: Option<u64>,
) -> RunSummary {
    let defs = definitions();
    let driver = BatchDriver::new(config, &defs, remote, &NoTermLookup, store);
    driver.run(input, resume_from.map(RemoteId::from)).unwrap()
}

// ── create ───────────────────────────────────────────────────────

#[test]
fn create_builds_payloads_and_records_mappings() {
    let config = config("");
    let remote = FakeRemote::new(100);
    let store = IdentityMapStore::open_in_memory().unwrap();
    let input = rows(
        &config,
        "id,parent_id,title,field_description,field_coordinates\n\
         a,,Collection,Top level,\n\
         b,a,Child,First|Second,\"49.16667,-123.93333\"\n",
    );

    let summary = run(&config, &remote, &store, &input, None);
    assert_eq!((summary.created, summary.failed), (2, 0));
    assert_eq!(
        summary.outcomes[1],
        RowOutcome::Created {
            row_id: "b".into(),
            remote_id: RemoteId::from(101_u64)
        }
    );

    let posts = remote.bodies(Method::Post);
    assert_eq!(
        posts[0],
        json!({
            "type": [{"target_id": "islandora_object", "target_type": "node_type"}],
            "status": [{"value": true}],
            "title": [{"value": "Collection"}],
            "field_description": [{"value": "Top level"}],
        })
    );
    assert_eq!(posts[1]["field_member_of"], json!([{"target_id": 100, "target_type": "node_type"}]));
    assert_eq!(posts[1]["field_description"], json!([{"value": "First"}]));
    assert_eq!(posts[1]["field_coordinates"], json!([{"lat": "49.16667", "lng": "-123.93333"}]));

    // The singular description overflowed on row b.
    assert!(matches!(
        &summary.warnings[..],
        [FieldWarning::CardinalityViolation { field, row_id, limit: 1, .. }]
            if field == "field_description" && row_id == "b"
    ));

    let records = store.dump(&DumpFilter::all()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].csv_id, "b");
    assert_eq!(records[1].parent_csv_id.as_deref(), Some("a"));
    assert_eq!(records[1].parent_node_id, Some(RemoteId::from(100_u64)));
    assert_eq!(records[1].config_file, "create.yml");
}

#[test]
fn row_without_title_fails_alone() {
    let config = config("");
    let remote = FakeRemote::new(1);
    let store = IdentityMapStore::open_in_memory().unwrap();
    let input = rows(&config, "id,title\n1,\n2,Has title\n");

    let summary = run(&config, &remote, &store, &input, None);
    assert_eq!((summary.created, summary.failed), (1, 1));
    assert!(matches!(&summary.outcomes[0], RowOutcome::Failed { row_id, reason }
        if row_id == "1" && reason.contains("title")));
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn rejected_create_is_not_mapped() {
    let config = config("");
    let mut remote = FakeRemote::new(1);
    remote.reject_titles.push("Bad".to_string());
    let store = IdentityMapStore::open_in_memory().unwrap();
    let input = rows(&config, "id,title\n1,Bad\n2,Good\n");

    let summary = run(&config, &remote, &store, &input, None);
    assert_eq!((summary.created, summary.failed), (1, 1));
    assert_eq!(store.lookup_remote_id("create.yml", "1").unwrap(), None);
    assert_eq!(store.lookup_remote_id("create.yml", "2").unwrap(), Some(RemoteId::from(1_u64)));
}

#[test]
fn unpublished_nodes_and_text_formats() {
    let mut defs = definitions();
    defs.insert("field_abstract".to_string(), FieldDefinition::new("text_long", 1));
    let config = config("published: false\nfield_text_format_ids:\n  field_abstract: full_html\n");
    let remote = FakeRemote::new(1);
    let store = IdentityMapStore::open_in_memory().unwrap();
    let input = rows(&config, "id,title,field_abstract\n1,A,<p>Hi</p>\n");

    let driver = BatchDriver::new(&config, &defs, &remote, &NoTermLookup, &store);
    driver.run(&input, None).unwrap();

    let post = &remote.bodies(Method::Post)[0];
    assert_eq!(post["status"], json!([{"value": false}]));
    assert_eq!(post["field_abstract"], json!([{"value": "<p>Hi</p>", "format": "full_html"}]));
}

#[test]
fn children_of_a_failed_parent_fail_too() {
    let config = config("");
    let mut remote = FakeRemote::new(200);
    remote.reject_titles.push("Bad".to_string());
    let store = IdentityMapStore::open_in_memory().unwrap();
    // Left over from an earlier run of the same config.
    store.insert("create.yml", "1", &RemoteId::from(50_u64), None, None).unwrap();
    let input = rows(&config, "id,parent_id,title\n1,,Bad\n2,1,Child\n3,4,Orphan\n4,,Late\n");

    let summary = run(&config, &remote, &store, &input, None);
    assert_eq!((summary.created, summary.failed), (1, 3));
    assert!(matches!(&summary.outcomes[1], RowOutcome::Failed { row_id, reason }
        if row_id == "2" && reason.contains("parent record 1")));
    assert!(matches!(&summary.outcomes[2], RowOutcome::Failed { row_id, .. } if row_id == "3"));
    // Only "Bad" and "Late" reached the server.
    assert_eq!(remote.count(Method::Post), 2);
    assert!(remote.bodies(Method::Post).iter().all(|b| b.get("field_member_of").is_none()));
}

#[test]
fn parents_outside_the_input_come_from_the_map_only_when_enabled() {
    let store = IdentityMapStore::open_in_memory().unwrap();
    store.insert("create.yml", "a", &RemoteId::from(50_u64), None, None).unwrap();

    let config = config("");
    let remote = FakeRemote::new(200);
    let input = rows(&config, "id,parent_id,title\n2,a,Child\n");
    let summary = run(&config, &remote, &store, &input, None);
    assert_eq!((summary.created, summary.failed), (0, 1));
    assert_eq!(remote.count(Method::Post), 0);

    let config = self::config("query_csv_id_to_node_id_map_for_parents: true\n");
    let summary = run(&config, &remote, &store, &input, None);
    assert_eq!(summary.created, 1);
    assert_eq!(
        remote.bodies(Method::Post)[0]["field_member_of"],
        json!([{"target_id": 50, "target_type": "node_type"}])
    );
    assert_eq!(
        store.dump(&DumpFilter::all().csv_id("2")).unwrap()[0].parent_node_id,
        Some(RemoteId::from(50_u64))
    );
}

/// Drops the identity map table as soon as the first node is created.
struct MapLostAfterFirstCreate {
    remote: FakeRemote,
    db_path: PathBuf,
}

impl HttpTransport for MapLostAfterFirstCreate {
    fn issue_request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<HttpResponse> {
        let response = self.remote.issue_request(method, path, body)?;
        if method == Method::Post {
            rusqlite::Connection::open(&self.db_path)
                .unwrap()
                .execute_batch("DROP TABLE csv_id_to_node_id_map")
                .unwrap();
        }
        Ok(response)
    }
}

#[test]
fn identity_map_failure_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("map.db");
    let store = IdentityMapStore::open(&db_path).unwrap();
    let transport = MapLostAfterFirstCreate {
        remote: FakeRemote::new(1),
        db_path,
    };
    let config = config("");
    let defs = definitions();
    let input = rows(&config, "id,title\n1,A\n2,B\n3,C\n");

    let driver = BatchDriver::new(&config, &defs, &transport, &NoTermLookup, &store);
    let err = driver.run(&input, None).unwrap_err();
    assert!(matches!(err, SyncError::IdMap(_)));
    assert_eq!(transport.remote.count(Method::Post), 1);
}

// ── recovery ─────────────────────────────────────────────────────

/// Rows 1..3 were created as 100..102 before the run was interrupted.
fn interrupted_store() -> IdentityMapStore {
    let store = IdentityMapStore::open_in_memory().unwrap();
    for i in 1..=3_u64 {
        store
            .insert("create.yml", &i.to_string(), &RemoteId::from(99 + i), None, None)
            .unwrap();
    }
    store
}

#[test]
fn resumed_run_skips_mapped_rows_and_links_to_skipped_parents() {
    let config = config("");
    let remote = FakeRemote::new(200);
    let store = interrupted_store();
    let input = rows(&config, "id,parent_id,title\n1,,A\n2,1,B\n3,1,C\n4,2,D\n5,,E\n");

    let summary = run(&config, &remote, &store, &input, Some(102));
    assert_eq!((summary.skipped, summary.created, summary.failed), (3, 2, 0));
    assert_eq!(remote.count(Method::Post), 2);

    let posts = remote.bodies(Method::Post);
    assert_eq!(posts[0]["field_member_of"], json!([{"target_id": 101, "target_type": "node_type"}]));
    assert_eq!(store.lookup_remote_id("create.yml", "4").unwrap(), Some(RemoteId::from(200_u64)));
    assert_eq!(store.count().unwrap(), 5);
}

#[test]
fn full_rerun_creates_nothing() {
    let config = config("");
    let remote = FakeRemote::new(200);
    let store = interrupted_store();
    let input = rows(&config, "id,title\n1,A\n2,B\n3,C\n");

    let summary = run(&config, &remote, &store, &input, Some(102));
    assert_eq!((summary.skipped, summary.created), (3, 0));
    assert_eq!(remote.count(Method::Post), 0);
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn unknown_parent_fails_only_that_row() {
    let config = config("");
    let remote = FakeRemote::new(200);
    let store = interrupted_store();
    let input = rows(&config, "id,parent_id,title\n1,,A\n4,nowhere,D\n5,1,E\n");

    let summary = run(&config, &remote, &store, &input, Some(100));
    assert_eq!((summary.skipped, summary.created, summary.failed), (1, 1, 1));
    assert!(matches!(&summary.outcomes[1], RowOutcome::Failed { row_id, reason }
        if row_id == "4" && reason.contains("nowhere")));
    assert_eq!(store.lookup_remote_id("create.yml", "4").unwrap(), None);
}

#[test]
fn other_config_files_do_not_trigger_skips() {
    let config = WorkbenchConfig::from_yaml_str("host: http://localhost\n", "other.yml").unwrap();
    let remote = FakeRemote::new(200);
    let store = interrupted_store();
    let input = rows(&config, "id,title\n1,A\n");

    let summary = run(&config, &remote, &store, &input, Some(102));
    assert_eq!((summary.skipped, summary.created), (0, 1));
}

// ── update / delete ──────────────────────────────────────────────

fn existing_node() -> Value {
    json!({
        "nid": [{"value": 7}],
        "title": [{"value": "Old title"}],
        "field_description": [{"value": "Old description"}],
        "field_subject": [{"target_id": 70, "target_type": "taxonomy_term", "url": "/taxonomy/term/70"}],
    })
}

#[test]
fn append_update_merges_with_existing_values() {
    let config = config("task: update\nupdate_mode: append\n");
    let remote = FakeRemote::new(1).with_node(7, existing_node());
    let store = IdentityMapStore::open_in_memory().unwrap();
    let input = rows(&config, "id,node_id,field_subject,field_description\n1,7,72|73,New\n");

    let summary = run(&config, &remote, &store, &input, None);
    assert_eq!(summary.updated, 1);

    let patch = &remote.bodies(Method::Patch)[0];
    assert_eq!(
        patch["field_subject"],
        json!([
            {"target_id": 70, "target_type": "taxonomy_term"},
            {"target_id": 72, "target_type": "taxonomy_term"},
            {"target_id": 73, "target_type": "taxonomy_term"},
        ])
    );
    // Singular fields are replaced even when appending.
    assert_eq!(patch["field_description"], json!([{"value": "New"}]));
    assert_eq!(patch.get("status"), None);
}

#[test]
fn replace_update_leaves_blank_cells_alone() {
    let config = config("task: update\n");
    let remote = FakeRemote::new(1).with_node(7, existing_node());
    let store = IdentityMapStore::open_in_memory().unwrap();
    let input = rows(&config, "id,node_id,title,field_subject\n1,7,New title,\n");

    run(&config, &remote, &store, &input, None);
    let patch = &remote.bodies(Method::Patch)[0];
    assert_eq!(patch["title"], json!([{"value": "New title"}]));
    assert_eq!(patch.get("field_subject"), None);
}

#[test]
fn delete_mode_empties_named_fields_but_keeps_title() {
    let config = config("task: update\nupdate_mode: delete\n");
    let remote = FakeRemote::new(1).with_node(7, existing_node());
    let store = IdentityMapStore::open_in_memory().unwrap();
    let input = rows(&config, "id,node_id,title,field_subject\n1,7,,\n");

    run(&config, &remote, &store, &input, None);
    let patch = &remote.bodies(Method::Patch)[0];
    assert_eq!(patch["field_subject"], json!([]));
    assert_eq!(patch.get("title"), None);
}

#[test]
fn update_of_missing_node_fails_the_row() {
    let config = config("task: update\n");
    let remote = FakeRemote::new(1);
    let store = IdentityMapStore::open_in_memory().unwrap();
    let input = rows(&config, "id,node_id,title\n1,99,A\n2,,B\n");

    let summary = run(&config, &remote, &store, &input, None);
    assert_eq!(summary.failed, 2);
    assert_eq!(remote.count(Method::Patch), 0);
}

#[test]
fn delete_task_removes_nodes() {
    let config = config("task: delete\n");
    let remote = FakeRemote::new(1)
        .with_node(7, existing_node())
        .with_node(8, existing_node());
    let store = IdentityMapStore::open_in_memory().unwrap();
    let input = rows(&config, "id,node_id\n1,7\n2,8\n3,9\n");

    let summary = run(&config, &remote, &store, &input, None);
    assert_eq!((summary.deleted, summary.failed), (2, 1));
    assert!(remote.nodes.borrow().is_empty());
}

// ── pre-flight checks ────────────────────────────────────────────

#[test]
fn check_reports_problems_without_requests() {
    let config = config("");
    let remote = FakeRemote::new(1);
    let store = IdentityMapStore::open_in_memory().unwrap();
    let defs = definitions();
    let input = rows(
        &config,
        "id,parent_id,title,field_coordinates,field_bogus\n1,,A,not a point,x\n2,1,,,\n",
    );

    let driver = BatchDriver::new(&config, &defs, &remote, &NoTermLookup, &store);
    let issues = driver.check(&input);
    let described: Vec<String> = issues.iter().map(ToString::to_string).collect();

    assert!(described.iter().any(|m| m.contains("record 1, field field_coordinates")));
    assert!(described.iter().any(|m| m.contains("field field_bogus")));
    assert!(described.iter().any(|m| m.contains("record 2, field title")));
    assert!(!described.iter().any(|m| m.contains("field parent_id") || m.contains("field id:")));
    assert!(remote.requests.borrow().is_empty());
}
