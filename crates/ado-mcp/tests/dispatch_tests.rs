//! Dispatcher integration tests
//!
//! Every test runs a full tool invocation against a scripted transport and
//! checks what went over the wire, what came back and what was reported.

use std::sync::Arc;

use ado_core::request::CONTENT_TYPE_JSON_PATCH;
use ado_core::{Error, ErrorKind, HttpMethod, TelemetryEvent};
use ado_mcp::Dispatcher;
use ado_test_utils::{MockTransport, RecordingSink, TEST_PROJECT, query_pairs, query_param, test_executor};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn dispatcher(transport: MockTransport) -> (Dispatcher, Arc<MockTransport>, Arc<RecordingSink>) {
    let transport = Arc::new(transport);
    let (executor, sink) = test_executor(transport.clone());
    (Dispatcher::new(executor), transport, sink)
}

fn completion(sink: &RecordingSink) -> (bool, Option<ErrorKind>) {
    let completions = sink.completions();
    assert_eq!(completions.len(), 1, "exactly one completion per invocation");
    match &completions[0] {
        TelemetryEvent::ToolCompleted {
            success, error_kind, ..
        } => (*success, *error_kind),
        other => panic!("unexpected event {other:?}"),
    }
}

// ==========================================================================
// Work item mutations
// ==========================================================================

#[tokio::test]
async fn create_sends_title_then_custom_fields() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Patch,
        "/wit/workitems/$Bug",
        200,
        json!({"id": 101, "rev": 1, "fields": {"System.Title": "Fix crash"}, "url": "u", "_links": {}}),
    ));

    let result = dispatcher
        .dispatch(
            "create_work_item",
            json!({"type": "Bug", "title": "Fix crash", "fields": {"Custom.Severity": "High"}}),
        )
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({"id": 101, "rev": 1, "fields": {"System.Title": "Fix crash"}, "url": "u"})
    );

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.method, HttpMethod::Patch);
    assert_eq!(sent.header("Content-Type"), Some(CONTENT_TYPE_JSON_PATCH));
    assert_eq!(
        sent.body,
        Some(json!([
            {"op": "add", "path": "/fields/System.Title", "value": "Fix crash"},
            {"op": "add", "path": "/fields/Custom.Severity", "value": "High"}
        ]))
    );
}

#[tokio::test]
async fn create_with_description_and_spaced_type() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Patch,
        "/wit/workitems/$User%20Story",
        200,
        json!({"id": 5}),
    ));

    dispatcher
        .dispatch(
            "create_work_item",
            json!({
                "type": "User Story",
                "title": "Checkout",
                "description": "As a buyer",
                "fields": {"System.AreaPath": "Web", "Custom.Risk": 2}
            }),
        )
        .await
        .unwrap();

    let body = transport.last_request().unwrap().body.unwrap();
    let paths: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|op| op["path"].as_str().unwrap())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/fields/System.Title",
            "/fields/System.Description",
            "/fields/System.AreaPath",
            "/fields/Custom.Risk"
        ]
    );
}

#[tokio::test]
async fn update_removes_relation_matched_after_normalization() {
    let (dispatcher, transport, sink) = dispatcher(
        MockTransport::new()
            .respond(
                HttpMethod::Get,
                "/wit/workitems/42",
                200,
                json!({
                    "id": 42,
                    "relations": [
                        {"rel": "Related", "url": "a"},
                        {"rel": "ArtifactLink", "url": "https://dev.azure.com/org/_git/1/"},
                        {"rel": "Related", "url": "b"}
                    ]
                }),
            )
            .respond(
                HttpMethod::Patch,
                "/wit/workitems/42",
                200,
                json!({"id": 42, "rev": 3, "relations": []}),
            ),
    );

    dispatcher
        .dispatch(
            "update_work_item",
            json!({
                "workItemId": 42,
                "fields": {},
                "removeLinks": ["https://dev.azure.com/org/_git/1"]
            }),
        )
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(query_param(&requests[0], "$expand").as_deref(), Some("relations"));
    assert_eq!(
        requests[1].body,
        Some(json!([{"op": "remove", "path": "/relations/1"}]))
    );
    assert_eq!(sink.dependencies().len(), 2);
}

#[tokio::test]
async fn update_orders_replace_remove_add() {
    let (dispatcher, transport, _) = dispatcher(
        MockTransport::new()
            .respond(
                HttpMethod::Get,
                "/wit/workitems/9",
                200,
                json!({"relations": [
                    {"rel": "Related", "url": "https://x/a"},
                    {"rel": "Related", "url": "https://x/b"},
                    {"rel": "Related", "url": "https://x/c"}
                ]}),
            )
            .respond(HttpMethod::Patch, "/wit/workitems/9", 200, json!({"id": 9})),
    );

    dispatcher
        .dispatch(
            "update_work_item",
            json!({
                "workItemId": 9,
                "fields": {"System.State": "Active"},
                "links": [{"rel": "System.LinkTypes.Related", "url": "https://x/d"}],
                "removeLinks": ["HTTPS://X/A/", "https://x/c", "https://x/missing"]
            }),
        )
        .await
        .unwrap();

    assert_eq!(
        transport.last_request().unwrap().body,
        Some(json!([
            {"op": "replace", "path": "/fields/System.State", "value": "Active"},
            {"op": "remove", "path": "/relations/2"},
            {"op": "remove", "path": "/relations/0"},
            {"op": "add", "path": "/relations/-", "value": {"rel": "System.LinkTypes.Related", "url": "https://x/d"}}
        ]))
    );
}

#[tokio::test]
async fn update_without_removals_skips_read_back() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Patch,
        "/wit/workitems/3",
        200,
        json!({"id": 3}),
    ));

    dispatcher
        .dispatch("update_work_item", json!({"workItemId": 3, "fields": {"System.Title": "t"}}))
        .await
        .unwrap();

    assert_eq!(transport.request_count(), 1);
    assert_eq!(transport.last_request().unwrap().method, HttpMethod::Patch);
}

#[tokio::test]
async fn failed_read_back_skips_removal_but_keeps_fields() {
    let (dispatcher, transport, _) = dispatcher(
        MockTransport::new()
            .respond(HttpMethod::Get, "/wit/workitems/11", 500, json!({"message": "boom"}))
            .respond(HttpMethod::Patch, "/wit/workitems/11", 200, json!({"id": 11})),
    );

    dispatcher
        .dispatch(
            "update_work_item",
            json!({
                "workItemId": 11,
                "fields": {"System.State": "Closed"},
                "removeLinks": ["https://x/a"]
            }),
        )
        .await
        .unwrap();

    assert_eq!(
        transport.last_request().unwrap().body,
        Some(json!([{"op": "replace", "path": "/fields/System.State", "value": "Closed"}]))
    );
}

#[tokio::test]
async fn empty_update_is_rejected_without_network() {
    let (dispatcher, transport, sink) = dispatcher(MockTransport::new());

    let err = dispatcher
        .dispatch("update_work_item", json!({"workItemId": 5, "fields": {}}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidParams);
    assert_eq!(transport.request_count(), 0);
    assert!(sink.dependencies().is_empty());
    assert_eq!(completion(&sink), (false, Some(ErrorKind::InvalidParams)));
}

// ==========================================================================
// Validation
// ==========================================================================

#[tokio::test]
async fn unknown_tool_is_method_not_found() {
    let (dispatcher, transport, sink) = dispatcher(MockTransport::new());

    let err = dispatcher.dispatch("drop_database", json!({})).await.unwrap_err();

    assert!(matches!(err, Error::UnknownTool(_)));
    assert_eq!(transport.request_count(), 0);
    assert_eq!(completion(&sink), (false, Some(ErrorKind::InvalidParams)));
}

#[rstest]
#[case("get_repo", json!({}))]
#[case("get_pull_request", json!({"repo": "web"}))]
#[case("search_code", json!({"repo": "web"}))]
#[case("query_work_items", json!({"$top": 5}))]
#[case("get_test_plan", json!({"planId": "abc"}))]
#[tokio::test]
async fn missing_or_malformed_arguments_fail_fast(#[case] tool: &str, #[case] arguments: Value) {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new());

    let err = dispatcher.dispatch(tool, arguments).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidParams, "{tool}: {err}");
    assert_eq!(transport.request_count(), 0);
}

// ==========================================================================
// Telemetry
// ==========================================================================

#[tokio::test]
async fn telemetry_is_reported_once_per_invocation() {
    let (dispatcher, _, sink) = dispatcher(
        MockTransport::new()
            .respond(HttpMethod::Post, "/wit/wiql", 200, json!({"workItems": [{"id": 1}, {"id": 2}]}))
            .respond(
                HttpMethod::Get,
                "/wit/workitems",
                200,
                json!({"count": 2, "value": [{"id": 1, "fields": {}}, {"id": 2, "fields": {}}]}),
            ),
    );

    let result = dispatcher
        .dispatch("query_work_items", json!({"wiql": "SELECT [System.Id] FROM WorkItems"}))
        .await
        .unwrap();
    assert_eq!(result["count"], 2);

    let events = sink.events();
    let invoked = events
        .iter()
        .filter(|e| matches!(e, TelemetryEvent::ToolInvoked { .. }))
        .count();
    assert_eq!(invoked, 1);
    assert_eq!(sink.dependencies().len(), 2);
    assert_eq!(completion(&sink), (true, None));
    assert!(matches!(
        events.last(),
        Some(TelemetryEvent::ToolCompleted { tool, project, .. }) if tool == "query_work_items" && project == TEST_PROJECT
    ));
}

#[tokio::test]
async fn failed_invocation_completes_unsuccessfully() {
    let (dispatcher, _, sink) = dispatcher(MockTransport::new().fail(
        HttpMethod::Get,
        "/git/repositories",
        "dns error: no such host",
    ));

    let err = dispatcher.dispatch("list_repos", json!({})).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InternalError);
    assert_eq!(completion(&sink), (false, Some(ErrorKind::InternalError)));
}

// ==========================================================================
// Error classification
// ==========================================================================

#[tokio::test]
async fn expired_token_carries_remediation() {
    let (dispatcher, _, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Get,
        "/wit/workitems/1",
        401,
        json!({"message": "The Personal Access Token used has expired"}),
    ));

    let err = dispatcher
        .dispatch("get_work_item", json!({"workItemId": 1}))
        .await
        .unwrap_err();

    let diagnosis = err.diagnosis();
    assert_eq!(diagnosis.kind, ErrorKind::ExpiredCredential);
    assert_eq!(diagnosis.http_status, Some(401));
    let remediation = diagnosis.remediation.unwrap();
    assert!(remediation.contains("https://dev.azure.com/contoso/_usersSettings/tokens"));
    assert!(remediation.contains("AZURE_DEVOPS_PAT"));
}

#[tokio::test]
async fn unrelated_401_is_upstream_error() {
    let (dispatcher, _, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Get,
        "/wit/workitems/1",
        401,
        json!({"message": "resource not found"}),
    ));

    let err = dispatcher
        .dispatch("get_work_item", json!({"workItemId": 1}))
        .await
        .unwrap_err();

    let diagnosis = err.diagnosis();
    assert_eq!(diagnosis.kind, ErrorKind::UpstreamError);
    assert!(diagnosis.message.contains("401"));
    assert!(diagnosis.message.contains("resource not found"));
    assert!(diagnosis.remediation.is_none());
}

// ==========================================================================
// Request shaping
// ==========================================================================

#[tokio::test]
async fn project_argument_overrides_default() {
    let (dispatcher, transport, sink) = dispatcher(MockTransport::new().respond(
        HttpMethod::Get,
        "/pipelines",
        200,
        json!({"count": 0, "value": []}),
    ));

    dispatcher
        .dispatch("list_pipelines", json!({"project": "Tailspin"}))
        .await
        .unwrap();

    let sent = transport.last_request().unwrap();
    assert!(sent.url.contains("/contoso/Tailspin/_apis/pipelines"), "{}", sent.url);
    assert_eq!(query_param(&sent, "$top").as_deref(), Some("10"));
    assert!(matches!(
        &sink.events()[0],
        TelemetryEvent::ToolInvoked { project, .. } if project == "Tailspin"
    ));
}

#[tokio::test]
async fn empty_wiql_result_short_circuits() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Post,
        "/wit/wiql",
        200,
        json!({"workItems": []}),
    ));

    let result = dispatcher
        .dispatch("query_work_items", json!({"wiql": "SELECT [System.Id] FROM WorkItems"}))
        .await
        .unwrap();

    assert_eq!(result, json!({"count": 0, "workItems": []}));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn wiql_ids_are_truncated_to_top() {
    let (dispatcher, transport, _) = dispatcher(
        MockTransport::new()
            .respond(
                HttpMethod::Post,
                "/wit/wiql",
                200,
                json!({"workItems": [{"id": 7}, {"id": 8}, {"id": 9}]}),
            )
            .respond(HttpMethod::Get, "/wit/workitems", 200, json!({"count": 2, "value": []})),
    );

    dispatcher
        .dispatch("query_work_items", json!({"wiql": "q", "$top": 2}))
        .await
        .unwrap();

    let sent = transport.last_request().unwrap();
    assert_eq!(query_param(&sent, "ids").as_deref(), Some("7,8"));
    assert_eq!(query_param(&sent, "$expand").as_deref(), Some("all"));
}

#[tokio::test]
async fn repo_file_defaults_to_main_branch_and_returns_text() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond_text(
        HttpMethod::Get,
        "/git/repositories/web/items",
        200,
        "pub fn hello() {}\n",
    ));

    let result = dispatcher
        .dispatch("get_repo_file", json!({"repo": "web", "path": "/src/lib.rs"}))
        .await
        .unwrap();

    assert_eq!(result, json!({"path": "/src/lib.rs", "content": "pub fn hello() {}\n"}));
    let sent = transport.last_request().unwrap();
    assert_eq!(query_param(&sent, "versionDescriptor.version").as_deref(), Some("main"));
    assert_eq!(query_param(&sent, "download").as_deref(), Some("true"));
}

#[tokio::test]
async fn repo_file_path_with_reserved_characters_is_sent_intact() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond_text(
        HttpMethod::Get,
        "/git/repositories/api/items",
        200,
        "# Intro\n",
    ));

    let result = dispatcher
        .dispatch("get_repo_file", json!({"repo": "api", "path": "docs/C#/intro?.md"}))
        .await
        .unwrap();

    assert_eq!(result["path"], "/docs/C#/intro?.md");
    let sent = transport.last_request().unwrap();
    assert!(!sent.url.contains('#'), "{}", sent.url);
    assert_eq!(query_param(&sent, "path").as_deref(), Some("/docs/C#/intro?.md"));
    assert_eq!(query_param(&sent, "download").as_deref(), Some("true"));
}

#[tokio::test]
async fn repository_name_is_encoded_as_one_segment() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Get,
        "/git/repositories/team%2Fweb%20app%23/refs",
        200,
        json!({"count": 0, "value": []}),
    ));

    dispatcher
        .dispatch("list_repo_branches", json!({"repo": "team/web app#"}))
        .await
        .unwrap();

    assert_eq!(transport.request_count(), 1);
    let sent = transport.last_request().unwrap();
    assert!(sent.url.contains("/git/repositories/team%2Fweb%20app%23/refs?"), "{}", sent.url);
}

#[tokio::test]
async fn wiki_search_escapes_single_quotes() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Get,
        "/wiki/wikis/Fabrikam.wiki/pages",
        200,
        json!({"count": 0, "value": []}),
    ));

    dispatcher
        .dispatch("search_wiki_pages", json!({"query": "O'Brien"}))
        .await
        .unwrap();

    let sent = transport.last_request().unwrap();
    assert_eq!(
        query_param(&sent, "$filter").as_deref(),
        Some("contains(path, 'O''Brien')")
    );
}

#[tokio::test]
async fn branches_drop_ref_prefix() {
    let (dispatcher, _, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Get,
        "/git/repositories/web/refs",
        200,
        json!({"count": 1, "value": [{"name": "refs/heads/feature/login", "objectId": "abc", "url": "u"}]}),
    ));

    let result = dispatcher
        .dispatch("list_repo_branches", json!({"repo": "web"}))
        .await
        .unwrap();

    assert_eq!(result["branches"][0]["name"], "feature/login");
}

#[tokio::test]
async fn pull_request_listing_flattens_creator() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Get,
        "/git/repositories/web/pullrequests",
        200,
        json!({"count": 1, "value": [{
            "pullRequestId": 12,
            "title": "Add login",
            "status": "active",
            "createdBy": {"displayName": "Sam", "id": "x"},
            "creationDate": "2024-01-01T00:00:00Z",
            "url": "u"
        }]}),
    ));

    let result = dispatcher
        .dispatch("list_pull_requests", json!({"repo": "web"}))
        .await
        .unwrap();

    assert_eq!(result["pullRequests"][0]["createdBy"], "Sam");
    let sent = transport.last_request().unwrap();
    assert_eq!(query_param(&sent, "searchCriteria.status").as_deref(), Some("active"));
}

#[tokio::test]
async fn generic_call_returns_body_verbatim() {
    let body = json!({"count": 1, "value": [{"id": "p1", "name": "Fabrikam", "state": "wellFormed"}]});
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Get,
        "/projects",
        200,
        body.clone(),
    ));

    let result = dispatcher
        .dispatch(
            "ado_api_call",
            json!({"endpoint": "/projects", "method": "get", "params": {"$top": 1, "api-version": "5.0"}}),
        )
        .await
        .unwrap();

    assert_eq!(result, body);
    let sent = transport.last_request().unwrap();
    assert_eq!(query_param(&sent, "api-version").as_deref(), Some("7.1"));
    assert_eq!(query_param(&sent, "$top").as_deref(), Some("1"));
}

#[tokio::test]
async fn generic_call_cannot_smuggle_api_version_in_endpoint() {
    let (dispatcher, transport, _) = dispatcher(MockTransport::new().respond(
        HttpMethod::Get,
        "/git/repositories",
        200,
        json!({"count": 0, "value": []}),
    ));

    dispatcher
        .dispatch("ado_api_call", json!({"endpoint": "/git/repositories?api-version=5.0&includeHidden=true"}))
        .await
        .unwrap();

    let sent = transport.last_request().unwrap();
    assert_eq!(
        query_pairs(&sent),
        vec![
            ("api-version".to_string(), "7.1".to_string()),
            ("includeHidden".to_string(), "true".to_string()),
        ]
    );
}
