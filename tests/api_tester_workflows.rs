//! End-to-end workflows: list routes, call them in process, read history.

use armature_api_tester::prelude::*;
use armature_api_tester::{FormattedResult, IndexPayload};
use armature_core::{Authenticate, HttpMethod, HttpResponse, Principal, Route, UploadedFile};
use armature_testing::{
    Fault, FaultyKernel, MockUserProvider, RecordingTerminator, TestApp, TestAppBuilder,
    TestRequestBuilder, assert_status,
};
use serde_json::{Value, json};
use std::sync::Arc;

const USERS_DOC: &str = r#"
/**
 * Store a user.
 *
 * @SWG\Parameter(
 *     name="name",
 *     in="formData",
 *     type="string",
 *     required=true,
 * )
 * @SWG\Parameter(
 *     name="avatar",
 *     in="formData",
 *     type="file",
 * )
 */
"#;

fn host_app() -> TestAppBuilder {
    TestAppBuilder::new()
        .alias_middleware("auth", Authenticate)
        .route(Route::get("/api/users", |_req| async {
            HttpResponse::json(&json!({ "data": [{ "id": 1, "name": "Ada" }] }))
        }))
        .route(
            Route::post("/api/users", |req| async move {
                let name = req.form_value("name").cloned().unwrap_or_default();
                let avatar = req.file("avatar").map(|f| f.original_name.clone());
                HttpResponse::created().with_json(&json!({
                    "message": format!("created {}", name),
                    "avatar": avatar,
                }))
            })
            .name("users.store")
            .action("UserController@store"),
        )
        .route(
            Route::get("/api/me", |req| async move {
                let user = req.user().map(|u| u.id.clone()).unwrap_or_default();
                HttpResponse::json(&json!({ "id": user }))
            })
            .middleware("auth"),
        )
        .route(Route::get("/api/echo-auth", |req| async move {
            Ok(HttpResponse::text(req.header("authorization").cloned().unwrap_or_default()))
        }))
        .route(Route::get("/web/dashboard", |_req| async {
            Ok(HttpResponse::html("<h1>Dashboard</h1>"))
        }))
        .document("UserController", "store", Some(USERS_DOC))
}

fn tester(app: &TestApp) -> ApiTester {
    ApiTester::new(app.app.clone(), ApiTesterConfig::default())
}

#[tokio::test]
async fn test_undocumented_route_is_listed_and_callable() {
    let app = host_app().build();
    let tester = tester(&app);

    let routes = tester.routes(None);
    let users = routes
        .iter()
        .find(|r| r.uri == "api/users" && r.method == HttpMethod::GET)
        .unwrap();
    assert!(users.parameters.is_empty());
    assert_eq!(users.action, "Closure");
    assert!(routes.iter().all(|r| r.uri.starts_with("api")));

    let result = tester.execute(&Invocation::new("GET", "/api/users")).await.unwrap();
    assert_eq!(result.status.code, 200);
    assert_eq!(result.status.text, "OK");
    assert_eq!(result.message, "success");
    assert_eq!(result.language, "json");
    assert!(result.content.contains("\n    \"data\": [\n"));
}

#[tokio::test]
async fn test_documented_route_parameters() {
    let app = host_app().build();
    let routes = tester(&app).routes(Some("name"));

    let store = routes.iter().find(|r| r.name.as_deref() == Some("users.store")).unwrap();
    let names: Vec<&str> = store.parameters.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["name", "avatar"]);
    assert_eq!(store.parameters[0].get("required"), Some("true"));
    assert_eq!(store.accent, "primary");
}

#[tokio::test]
async fn test_post_with_form_and_upload() {
    let app = host_app().build();
    let invocation = Invocation::new("POST", "/api/users")
        .param("name", "Ada")
        .file("avatar", UploadedFile::new("ada.png", vec![0x89, 0x50]));

    let result = tester(&app).execute(&invocation).await.unwrap();
    assert_eq!(result.status.code, 201);
    assert_eq!(result.message, "created Ada");

    let body: Value = serde_json::from_str(&result.content).unwrap();
    assert_eq!(body["avatar"], "ada.png");
}

#[tokio::test]
async fn test_basic_auth_reaches_handler() {
    let app = host_app().build();
    let invocation = Invocation::new("GET", "/api/echo-auth").auth(AuthMode::BasicAuth {
        username: "a".into(),
        password: "b".into(),
    });

    let result = tester(&app).execute(&invocation).await.unwrap();
    assert_eq!(result.content, "Basic YTpi");
}

#[tokio::test]
async fn test_impersonation_through_guard_provider() {
    let provider = MockUserProvider::new().with_user(Principal::new("7").with_name("Ada"));
    let app = host_app().guard("api", provider.clone()).build();
    let tester = tester(&app);

    let result = tester
        .execute(&Invocation::new("GET", "/api/me").acting_as("7"))
        .await
        .unwrap();
    assert_eq!(result.status.code, 200);
    assert!(result.content.contains("\"id\": \"7\""));
    assert!(provider.was_called_with("7"));

    // without a principal the auth middleware rejects the call; the exception handler renders it
    let result = tester.execute(&Invocation::new("GET", "/api/me")).await.unwrap();
    assert_eq!(result.status.code, 401);
    assert_eq!(result.message, "Unauthenticated.");
}

#[tokio::test]
async fn test_failed_impersonation_runs_unauthenticated() {
    let provider = MockUserProvider::new().failing_on("13");
    let app = host_app().guard("api", provider.clone()).build();

    let result = tester(&app)
        .execute(&Invocation::new("GET", "/api/me").acting_as("13"))
        .await
        .unwrap();
    assert_eq!(result.status.code, 401);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_user_retriever_hook() {
    let app = host_app().build();
    let config = ApiTesterConfig::default()
        .with_user_retriever(|id: &str| Some(Principal::new(format!("retrieved-{}", id))));

    let result = ApiTester::new(app.app.clone(), config)
        .execute(&Invocation::new("GET", "/api/me").acting_as("3"))
        .await
        .unwrap();
    assert!(result.content.contains("retrieved-3"));
}

#[tokio::test]
async fn test_terminate_runs_after_every_call() {
    let terminator = RecordingTerminator::new();
    let app = host_app().terminator(terminator.clone()).build();
    let tester = tester(&app);

    tester.execute(&Invocation::new("GET", "/api/users")).await.unwrap();
    tester.execute(&Invocation::new("GET", "/api/missing")).await.unwrap();

    assert_eq!(
        terminator.seen(),
        vec![("/api/users".to_string(), 200), ("/api/missing".to_string(), 404)]
    );
}

#[tokio::test]
async fn test_faulting_targets_never_raise() {
    for fault in [
        Fault::Error("database unreachable".into()),
        Fault::Panic("index out of bounds".into()),
    ] {
        let kernel = FaultyKernel::new(fault);
        let app = TestAppBuilder::new().kernel(kernel.clone()).build();

        let result = tester(&app)
            .execute(&Invocation::new("DELETE", "/api/users/1"))
            .await
            .unwrap();

        assert_eq!(result.status.code, 500);
        assert_eq!(result.status.text, "Internal Server Error");
        assert_eq!(result.message, "Server Error");
        assert_eq!(kernel.terminated(), 1);
    }
}

#[tokio::test]
async fn test_html_response_passes_through() {
    let app = host_app().build();
    let tester = ApiTester::new(app.app.clone(), ApiTesterConfig::default().with_prefix("web"));

    assert_eq!(tester.routes(None).len(), 1);
    let result = tester.execute(&Invocation::new("GET", "/web/dashboard")).await.unwrap();
    assert_eq!(result.language, "html");
    assert_eq!(result.content, "<h1>Dashboard</h1>");
}

fn controller_app(controller: &ApiTesterController) -> TestApp {
    let app = controller
        .routes()
        .into_iter()
        .fold(host_app(), |builder, route| builder.route(route))
        .build();
    controller.bind(app.app.clone());
    app
}

#[tokio::test]
async fn test_controller_handle_endpoint() {
    let controller = ApiTesterController::new(ApiTesterConfig::default());
    let app = controller_app(&controller);

    let request = TestRequestBuilder::new(HttpMethod::POST, "/api-tester/handle")
        .form("method", "POST")
        .form("uri", "/api/users")
        .form("key[1]", "")
        .form("val[1]", "ignored")
        .form("key[0]", "name")
        .form("val[0]", "Grace")
        .form("auth_type", "no_auth")
        .build();
    let response = app.client().send(request).await;

    assert_status(&response, 200);
    let result: Value = response.body_json().unwrap();
    assert_eq!(result["status"]["code"], 201);
    assert_eq!(result["message"], "created Grace");
}

#[tokio::test]
async fn test_controller_rejects_incomplete_form() {
    let controller = ApiTesterController::new(ApiTesterConfig::default());
    let app = controller_app(&controller);

    let request = TestRequestBuilder::new(HttpMethod::POST, "/api-tester/handle")
        .form("method", "GET")
        .build();
    let response = app.client().send_rendered(request).await;

    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_controller_index_with_history() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FileLedger::new(dir.path().join("api-tester.json")));
    let controller = ApiTesterController::new(ApiTesterConfig::default()).with_ledger(ledger);
    let app = controller_app(&controller);

    let form = |uri: &str| {
        vec![
            ("method".to_string(), "GET".to_string()),
            ("uri".to_string(), uri.to_string()),
            ("key[0]".to_string(), "page".to_string()),
            ("val[0]".to_string(), "2".to_string()),
        ]
    };
    let first: FormattedResult = controller.handle(&form("/api/users")).await.unwrap();
    assert_eq!(first.status.code, 200);
    controller.handle(&form("/api/echo-auth")).await.unwrap();

    let request = TestRequestBuilder::new(HttpMethod::GET, "/api-tester")
        .query("_sort", "method")
        .build();
    let response = app.client().send(request).await;
    assert_status(&response, 200);

    let index: Value = response.body_json().unwrap();
    let uris: Vec<&str> = index["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["uri"].as_str().unwrap())
        .collect();
    assert_eq!(uris, vec!["/api/echo-auth", "/api/users"]);
    assert_eq!(index["logs"][0]["parameters"], json!([{ "name": "page", "defaultValue": "2" }]));
    assert_eq!(index["auth_types"][0]["value"], "no_auth");

    let methods: Vec<&str> = index["routes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|route| route["method"].as_str().unwrap())
        .collect();
    let mut sorted = methods.clone();
    sorted.sort();
    assert_eq!(methods, sorted);

    let payload: IndexPayload = controller.index(None).await.unwrap();
    assert_eq!(payload.logs.len(), 2);
}
