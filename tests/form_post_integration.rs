use form_post_rust::build_state;
use form_post_rust::config::AppConfig;
use form_post_rust::routes::create_router;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    /// Start a server with seed data on an ephemeral port
    async fn start() -> Self {
        let mut config = AppConfig::default();
        config.repository.load_seed_data = true;
        config.repository.max_property_length = 64;

        let app = create_router().with_state(build_state(&config));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let address = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{}", address),
        }
    }

    async fn post_form(&self, item_kind: &str, item_id: &str, json: Value) -> reqwest::Response {
        self.client
            .post(&format!(
                "{}/api/{}/{}/formprocessor",
                self.base_url,
                urlencoding::encode(item_kind),
                urlencoding::encode(item_id)
            ))
            .json(&json)
            .send()
            .await
            .expect("Form post failed")
    }

    async fn get_node(&self, node_ref: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/api/node", self.base_url))
            .query(&[("nodeRef", node_ref)])
            .send()
            .await
            .expect("Node lookup failed")
    }
}

#[tokio::test]
async fn test_health() {
    let client = TestClient::start().await;
    let response = client
        .client
        .get(&format!("{}/health", client.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn test_create_document_and_extract_metadata() {
    let client = TestClient::start().await;

    // Step 1: create a document in Company Home
    let response = client
        .post_form(
            "type",
            "cm:content",
            json!({
                "prop_cm_name": "budget.txt",
                "alf_destination": "workspace://SpacesStore/company-home",
                "prop_cm_content": "Title: Budget 2024\nAuthor: Finance\nKeywords: finance, budget\nsys:enableStringTagging: true\n\nFigures follow.",
                "alf_redirect": "/share/page/repository"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        json!("Successfully persisted form for item [type] cm:content")
    );
    assert_eq!(body["redirect"], json!("/share/page/repository"));
    let node_ref = body["persistedObject"].as_str().unwrap().to_string();
    assert!(node_ref.starts_with("workspace://SpacesStore/"));

    // Step 2: the new node carries the extracted metadata
    let node: Value = client.get_node(&node_ref).await.json().await.unwrap();
    assert_eq!(node["properties"]["cm:name"], json!("budget.txt"));
    assert_eq!(node["properties"]["cm:title"], json!("Budget 2024"));
    assert_eq!(node["properties"]["cm:author"], json!("Finance"));
    assert_eq!(node["tags"], json!(["budget", "finance"]));
    assert!(node["properties"].get("alf:redirect").is_none());

    // Step 3: a property-only update leaves the extracted title alone
    let response = client
        .post_form("node", &node_ref, json!({"prop_cm_description": "Draft"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["persistedObject"], json!(node_ref));
    assert!(body.get("redirect").is_none());

    let node: Value = client.get_node(&node_ref).await.json().await.unwrap();
    assert_eq!(node["properties"]["cm:description"], json!("Draft"));
    assert_eq!(node["properties"]["cm:title"], json!("Budget 2024"));
}

#[tokio::test]
async fn test_bare_id_is_qualified_with_default_store() {
    let client = TestClient::start().await;

    let response = client
        .post_form(
            "node",
            "welcome-txt",
            json!({"prop_cm_content": "Title: Hello\n\nUpdated welcome text."}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["persistedObject"], json!("workspace://SpacesStore/welcome-txt"));
    assert_eq!(
        body["message"],
        json!("Successfully persisted form for item [node] welcome-txt")
    );

    let node: Value = client
        .get_node("workspace://SpacesStore/welcome-txt")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(node["properties"]["cm:title"], json!("Hello"));
    assert_eq!(node["version_label"], json!("1.1"));
}

#[tokio::test]
async fn test_error_statuses() {
    let client = TestClient::start().await;

    // No body at all
    let response = client
        .client
        .post(&format!("{}/api/node/welcome-txt/formprocessor", client.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("No JSON body"));

    // Unknown item kind
    let response = client.post_form("widget", "1", json!({"prop_cm_title": "x"})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("FormNotFoundException"));

    // Value over the configured maximum length
    let response = client
        .post_form("node", "welcome-txt", json!({"prop_cm_title": "x".repeat(65)}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("PropertyValueSizeIsMoreMaxLengthException"));
}
