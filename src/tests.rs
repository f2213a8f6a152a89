//! Integration tests for the SplitLedger backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Create config
        let config = Config {
            api_psk: psk.clone(),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, user: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-user-email", user)
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str, user: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-user-email", user)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, path: &str, user: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .header("x-user-email", user)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// Create a currency and a category for the user, returning their ids.
    async fn seed_catalog(&self, user: &str) -> (i64, i64) {
        let resp = self
            .post("/api/currencies", user, json!({"name": "CAD"}))
            .await;
        assert_eq!(resp.status(), 200);
        let currency: Value = resp.json().await.unwrap();
        let currency_id = currency["data"]["id"].as_i64().unwrap();

        let resp = self
            .post("/api/categories", user, json!({"name": "Groceries"}))
            .await;
        assert_eq!(resp.status(), 200);
        let category: Value = resp.json().await.unwrap();
        let category_id = category["data"]["id"].as_i64().unwrap();

        (currency_id, category_id)
    }

    /// Create a group owned by the user and return its id.
    async fn seed_group(&self, user: &str) -> i64 {
        let (currency_id, category_id) = self.seed_catalog(user).await;
        let resp = self
            .post(
                "/api/transaction-groups",
                user,
                json!({
                    "name": "Household",
                    "splitType": "EQUAL",
                    "currencyId": currency_id,
                    "categoryId": category_id,
                }),
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_i64().unwrap()
    }

    /// Fetch the user's groups and return the one with the given id.
    async fn get_group(&self, user: &str, group_id: i64) -> Value {
        let resp = self.get("/api/transaction-groups", user).await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|g| g["id"].as_i64() == Some(group_id))
            .cloned()
            .expect("group not found in listing")
    }

    /// Fetch the user's transactions and return the one with the given id.
    async fn get_transaction(&self, user: &str, transaction_id: i64) -> Value {
        let resp = self.get("/api/transactions", user).await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"].as_i64() == Some(transaction_id))
            .cloned()
            .expect("transaction not found in listing")
    }
}

fn member_emails(group: &Value) -> Vec<String> {
    group["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["email"].as_str().unwrap().to_string())
        .collect()
}

fn member<'a>(group: &'a Value, email: &str) -> &'a Value {
    group["members"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["email"].as_str() == Some(email))
        .expect("member not found")
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::new().await;

    // Client without the default api key header
    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/transaction-groups"))
        .header("x-user-email", "alice@x.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_missing_user_email_header() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/transaction-groups"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_create_group_creator_is_joined_member() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let group = fixture.get_group("alice@x.com", group_id).await;
    assert_eq!(group["name"], "Household");
    assert_eq!(group["splitType"], "EQUAL");
    assert_eq!(group["originalCurrency"], "CAD");
    assert_eq!(group["hidden"], false);

    let members = group["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["email"], "alice@x.com");
    assert_eq!(members[0]["joined"], true);
    assert!(members[0].get("splitValue").is_none());
}

#[tokio::test]
async fn test_create_group_foreign_currency_fails() {
    let fixture = TestFixture::new().await;
    let (foreign_currency_id, _) = fixture.seed_catalog("bob@x.com").await;
    let (_, category_id) = fixture.seed_catalog("alice@x.com").await;

    let resp = fixture
        .post(
            "/api/transaction-groups",
            "alice@x.com",
            json!({
                "name": "Household",
                "splitType": "EQUAL",
                "currencyId": foreign_currency_id,
                "categoryId": category_id,
            }),
        )
        .await;
    assert_eq!(resp.status(), 403);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "OWNERSHIP_ERROR");

    // Nothing was created
    let resp = fixture.get("/api/transaction-groups", "alice@x.com").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_group_unknown_category_fails() {
    let fixture = TestFixture::new().await;
    let (currency_id, _) = fixture.seed_catalog("alice@x.com").await;

    let resp = fixture
        .post(
            "/api/transaction-groups",
            "alice@x.com",
            json!({
                "name": "Household",
                "splitType": "SHARES",
                "currencyId": currency_id,
                "categoryId": 9999,
            }),
        )
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_membership_reconciliation_end_to_end() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;
    let path = format!("/api/transaction-groups/{}", group_id);

    // Add bob with weight 2
    let resp = fixture
        .put(
            &path,
            "alice@x.com",
            json!({
                "members": [
                    {"email": "alice@x.com"},
                    {"email": "bob@x.com", "splitValue": 2},
                ]
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let group = fixture.get_group("alice@x.com", group_id).await;
    assert_eq!(
        member_emails(&group),
        vec!["alice@x.com".to_string(), "bob@x.com".to_string()]
    );
    assert_eq!(member(&group, "bob@x.com")["joined"], false);
    assert_eq!(member(&group, "bob@x.com")["splitValue"], 2);
    assert_eq!(member(&group, "alice@x.com")["joined"], true);

    // Dropping bob succeeds while he has not joined
    let resp = fixture
        .put(
            &path,
            "alice@x.com",
            json!({"members": [{"email": "alice@x.com"}]}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let group = fixture.get_group("alice@x.com", group_id).await;
    assert_eq!(member_emails(&group), vec!["alice@x.com".to_string()]);

    // Re-add bob, let him accept, then try to drop him again
    let resp = fixture
        .put(
            &path,
            "alice@x.com",
            json!({
                "members": [
                    {"email": "alice@x.com"},
                    {"email": "bob@x.com", "splitValue": 2},
                ]
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .post(
            &format!("/api/transaction-groups/{}/join", group_id),
            "bob@x.com",
            json!({"name": "Bob"}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .put(
            &path,
            "alice@x.com",
            json!({"members": [{"email": "alice@x.com"}]}),
        )
        .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVARIANT_VIOLATION");

    // The rejected update rolled back: bob is still a joined member
    let group = fixture.get_group("alice@x.com", group_id).await;
    let bob = member(&group, "bob@x.com");
    assert_eq!(bob["joined"], true);
    assert_eq!(bob["name"], "Bob");
}

#[tokio::test]
async fn test_update_group_all_unset_is_noop() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let before = fixture.get_group("alice@x.com", group_id).await;

    let resp = fixture
        .put(
            &format!("/api/transaction-groups/{}", group_id),
            "alice@x.com",
            json!({}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let after = fixture.get_group("alice@x.com", group_id).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_update_group_not_a_member() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .put(
            &format!("/api/transaction-groups/{}", group_id),
            "charlie@x.com",
            json!({"name": "Hijacked"}),
        )
        .await;
    assert_eq!(resp.status(), 403);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_A_MEMBER");

    let group = fixture.get_group("alice@x.com", group_id).await;
    assert_eq!(group["name"], "Household");
}

#[tokio::test]
async fn test_update_group_unknown_id() {
    let fixture = TestFixture::new().await;
    fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .put(
            "/api/transaction-groups/9999",
            "alice@x.com",
            json!({"name": "Ghost"}),
        )
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_idempotent_member_upsert() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;
    let path = format!("/api/transaction-groups/{}", group_id);

    let patch = json!({
        "members": [
            {"email": "alice@x.com"},
            {"email": "bob@x.com", "splitValue": 5},
        ]
    });

    let resp = fixture.put(&path, "alice@x.com", patch.clone()).await;
    assert_eq!(resp.status(), 200);
    let first = fixture.get_group("alice@x.com", group_id).await;

    let resp = fixture.put(&path, "alice@x.com", patch).await;
    assert_eq!(resp.status(), 200);
    let second = fixture.get_group("alice@x.com", group_id).await;

    assert_eq!(first, second);
    assert_eq!(member(&second, "bob@x.com")["splitValue"], 5);
}

#[tokio::test]
async fn test_relisting_member_without_weight_keeps_it() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;
    let path = format!("/api/transaction-groups/{}", group_id);

    let resp = fixture
        .put(
            &path,
            "alice@x.com",
            json!({
                "members": [
                    {"email": "alice@x.com"},
                    {"email": "bob@x.com", "splitValue": 5},
                ]
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    // Re-list bob with his weight omitted: unset means no change
    let resp = fixture
        .put(
            &path,
            "alice@x.com",
            json!({
                "members": [
                    {"email": "alice@x.com"},
                    {"email": "bob@x.com"},
                ]
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let group = fixture.get_group("alice@x.com", group_id).await;
    assert_eq!(member(&group, "bob@x.com")["splitValue"], 5);

    // An explicit null does clear it
    let resp = fixture
        .put(
            &path,
            "alice@x.com",
            json!({
                "members": [
                    {"email": "alice@x.com"},
                    {"email": "bob@x.com", "splitValue": null},
                ]
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let group = fixture.get_group("alice@x.com", group_id).await;
    assert!(member(&group, "bob@x.com").get("splitValue").is_none());
}

#[tokio::test]
async fn test_duplicate_member_emails_rejected() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .put(
            &format!("/api/transaction-groups/{}", group_id),
            "alice@x.com",
            json!({
                "members": [
                    {"email": "alice@x.com"},
                    {"email": "bob@x.com", "splitValue": 1},
                    {"email": "bob@x.com", "splitValue": 2},
                ]
            }),
        )
        .await;
    assert_eq!(resp.status(), 409);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVARIANT_VIOLATION");
}

#[tokio::test]
async fn test_update_group_scalar_fields_and_clear() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .put(
            &format!("/api/transaction-groups/{}", group_id),
            "alice@x.com",
            json!({
                "name": "Flat share",
                "splitType": "PERCENTAGE",
                "hidden": true,
                "categoryId": null,
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let group = fixture.get_group("alice@x.com", group_id).await;
    assert_eq!(group["name"], "Flat share");
    assert_eq!(group["splitType"], "PERCENTAGE");
    assert_eq!(group["hidden"], true);
    // Cleared category is gone, untouched currency stays
    assert!(group.get("categoryId").is_none());
    assert!(group.get("currencyId").is_some());
}

#[tokio::test]
async fn test_create_transaction_with_override() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .post(
            "/api/transactions",
            "alice@x.com",
            json!({
                "amount": 1250,
                "currencyId": 1,
                "receiverAmount": 1250,
                "receiverCurrencyId": 1,
                "date": "2026-01-15T10:00:00Z",
                "note": "groceries",
                "groupedData": {
                    "transactionGroupId": group_id,
                    "splitOverride": {
                        "splitType": "EXACT_AMOUNT",
                        "members": [
                            {"email": "alice@x.com", "splitValue": 1000},
                            {"email": "bob@x.com", "splitValue": 250},
                        ]
                    }
                }
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let transaction_id = body["data"]["id"].as_i64().unwrap();

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    assert_eq!(transaction["amount"], 1250);
    assert_eq!(transaction["note"], "groceries");

    let grouped = &transaction["groupedData"];
    assert_eq!(grouped["transactionGroupId"].as_i64(), Some(group_id));
    assert_eq!(grouped["triggeredByOwner"], true);
    assert_eq!(grouped["splitOverride"]["splitType"], "EXACT_AMOUNT");
    assert_eq!(
        grouped["splitOverride"]["members"].as_array().unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_create_transaction_unknown_group_rolls_back() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post(
            "/api/transactions",
            "alice@x.com",
            json!({
                "amount": 100,
                "currencyId": 1,
                "receiverAmount": 100,
                "receiverCurrencyId": 1,
                "date": "2026-01-15T10:00:00Z",
                "groupedData": {"transactionGroupId": 9999}
            }),
        )
        .await;
    assert_eq!(resp.status(), 404);

    // The transaction row was rolled back together with the attachment
    let resp = fixture.get("/api/transactions", "alice@x.com").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_clear_grouped_data_removes_override_rows() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .post(
            "/api/transactions",
            "alice@x.com",
            json!({
                "amount": 500,
                "currencyId": 1,
                "receiverAmount": 500,
                "receiverCurrencyId": 1,
                "date": "2026-02-01T08:00:00Z",
                "groupedData": {
                    "transactionGroupId": group_id,
                    "splitOverride": {
                        "splitType": "SHARES",
                        "members": [{"email": "alice@x.com", "splitValue": 3}]
                    }
                }
            }),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let transaction_id = body["data"]["id"].as_i64().unwrap();

    let resp = fixture
        .put(
            &format!("/api/transactions/{}", transaction_id),
            "alice@x.com",
            json!({"groupedData": null}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    assert!(transaction.get("groupedData").is_none());

    // Re-attaching shows no stale member values
    let resp = fixture
        .put(
            &format!("/api/transactions/{}", transaction_id),
            "alice@x.com",
            json!({
                "groupedData": {
                    "transactionGroupId": group_id,
                    "splitOverride": {"splitType": "SHARES", "members": []}
                }
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    let members = transaction["groupedData"]["splitOverride"]["members"]
        .as_array()
        .unwrap();
    assert!(members.is_empty());
}

#[tokio::test]
async fn test_override_value_reconciliation() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .post(
            "/api/transactions",
            "alice@x.com",
            json!({
                "amount": 900,
                "currencyId": 1,
                "receiverAmount": 900,
                "receiverCurrencyId": 1,
                "date": "2026-03-01T12:00:00Z",
                "groupedData": {
                    "transactionGroupId": group_id,
                    "splitOverride": {
                        "splitType": "PERCENTAGE",
                        "members": [
                            {"email": "alice@x.com", "splitValue": 60},
                            {"email": "bob@x.com", "splitValue": 40},
                        ]
                    }
                }
            }),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let transaction_id = body["data"]["id"].as_i64().unwrap();

    // Drop bob, add carol, change alice's value
    let resp = fixture
        .put(
            &format!("/api/transactions/{}", transaction_id),
            "alice@x.com",
            json!({
                "groupedData": {
                    "splitOverride": {
                        "members": [
                            {"email": "alice@x.com", "splitValue": 30},
                            {"email": "carol@x.com", "splitValue": 70},
                        ]
                    }
                }
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    let override_data = &transaction["groupedData"]["splitOverride"];
    // Split type was not in the patch and is untouched
    assert_eq!(override_data["splitType"], "PERCENTAGE");

    let members = override_data["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["email"], "alice@x.com");
    assert_eq!(members[0]["splitValue"], 30);
    assert_eq!(members[1]["email"], "carol@x.com");
    assert_eq!(members[1]["splitValue"], 70);
}

#[tokio::test]
async fn test_override_unset_members_keeps_values() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .post(
            "/api/transactions",
            "alice@x.com",
            json!({
                "amount": 300,
                "currencyId": 1,
                "receiverAmount": 300,
                "receiverCurrencyId": 1,
                "date": "2026-04-01T12:00:00Z",
                "groupedData": {
                    "transactionGroupId": group_id,
                    "splitOverride": {
                        "splitType": "SHARES",
                        "members": [{"email": "alice@x.com", "splitValue": 2}]
                    }
                }
            }),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let transaction_id = body["data"]["id"].as_i64().unwrap();

    // Only the split type changes; stored member values stay
    let resp = fixture
        .put(
            &format!("/api/transactions/{}", transaction_id),
            "alice@x.com",
            json!({"groupedData": {"splitOverride": {"splitType": "EXACT_AMOUNT"}}}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    let override_data = &transaction["groupedData"]["splitOverride"];
    assert_eq!(override_data["splitType"], "EXACT_AMOUNT");
    assert_eq!(override_data["members"][0]["splitValue"], 2);
}

#[tokio::test]
async fn test_update_transaction_scalar_patch() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post(
            "/api/transactions",
            "alice@x.com",
            json!({
                "amount": 100,
                "currencyId": 1,
                "receiverAmount": 100,
                "receiverCurrencyId": 1,
                "categoryId": 4,
                "date": "2026-05-01T09:00:00Z",
                "note": "lunch",
            }),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let transaction_id = body["data"]["id"].as_i64().unwrap();

    let resp = fixture
        .put(
            &format!("/api/transactions/{}", transaction_id),
            "alice@x.com",
            json!({"amount": 150, "categoryId": null}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    assert_eq!(transaction["amount"], 150);
    assert!(transaction.get("categoryId").is_none());
    // Unset fields are untouched
    assert_eq!(transaction["note"], "lunch");
    assert_eq!(transaction["currencyId"], 1);
}

#[tokio::test]
async fn test_update_transaction_not_found() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .put("/api/transactions/9999", "alice@x.com", json!({"amount": 1}))
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_triggered_by_owner_derived_from_acting_user() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .post(
            "/api/transactions",
            "alice@x.com",
            json!({
                "amount": 800,
                "currencyId": 1,
                "receiverAmount": 800,
                "receiverCurrencyId": 1,
                "date": "2026-06-01T10:00:00Z",
                "groupedData": {"transactionGroupId": group_id}
            }),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let transaction_id = body["data"]["id"].as_i64().unwrap();

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    assert_eq!(transaction["groupedData"]["triggeredByOwner"], true);

    // A participant's update is tagged as not coming from the owner
    let resp = fixture
        .put(
            &format!("/api/transactions/{}", transaction_id),
            "bob@x.com",
            json!({
                "groupedData": {
                    "splitOverride": {
                        "splitType": "SHARES",
                        "members": [{"email": "bob@x.com", "splitValue": 1}]
                    }
                }
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    assert_eq!(transaction["groupedData"]["triggeredByOwner"], false);
}

#[tokio::test]
async fn test_non_owner_scalar_patch_ignored() {
    let fixture = TestFixture::new().await;
    let group_id = fixture.seed_group("alice@x.com").await;

    let resp = fixture
        .post(
            "/api/transactions",
            "alice@x.com",
            json!({
                "amount": 400,
                "currencyId": 1,
                "receiverAmount": 400,
                "receiverCurrencyId": 1,
                "date": "2026-06-10T10:00:00Z",
                "groupedData": {"transactionGroupId": group_id}
            }),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let transaction_id = body["data"]["id"].as_i64().unwrap();

    let resp = fixture
        .put(
            &format!("/api/transactions/{}", transaction_id),
            "bob@x.com",
            json!({"amount": 1}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    // Scalar fields are owner-scoped; bob's patch did not change the amount
    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    assert_eq!(transaction["amount"], 400);
}

#[tokio::test]
async fn test_financial_income_patch() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post(
            "/api/transactions",
            "alice@x.com",
            json!({
                "amount": 2000,
                "currencyId": 1,
                "receiverAmount": 2000,
                "receiverCurrencyId": 1,
                "date": "2026-07-01T10:00:00Z",
                "financialIncome": {"relatedCurrencyId": 2}
            }),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let transaction_id = body["data"]["id"].as_i64().unwrap();

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    assert_eq!(transaction["financialIncome"]["relatedCurrencyId"], 2);

    let resp = fixture
        .put(
            &format!("/api/transactions/{}", transaction_id),
            "alice@x.com",
            json!({"financialIncome": null}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let transaction = fixture.get_transaction("alice@x.com", transaction_id).await;
    assert!(transaction.get("financialIncome").is_none());
}
