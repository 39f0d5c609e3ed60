use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use larder_core::models::{GuestIdentity, NewPantryEntry, PantryRecord, PantryUpdate};
use larder_core::remote::PantryRemote;

use crate::config::RemoteConfig;

const OWNER_HEADER: &str = "x-user-id";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// `PantryRemote` over the pantry backend's JSON API.
pub struct HttpPantryRemote {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct GuestResponse {
    user: GuestUser,
}

#[derive(Deserialize)]
struct GuestUser {
    id: RawId,
}

/// Owner ids are opaque; some deployments hand out numeric ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Deserialize)]
struct Ack {
    #[serde(default)]
    success: bool,
}

#[derive(serde::Serialize)]
struct CreateBody<'a> {
    ingredients: &'a [NewPantryEntry],
}

impl HttpPantryRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "larder-cli/{} (pantry client)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder, what: &str) -> Result<T> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("Failed to reach pantry API ({what})"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or(body);
            bail!("{what} failed with HTTP {status}: {message}");
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse {what} response"))
    }

    async fn send_ack(&self, req: reqwest::RequestBuilder, what: &str) -> Result<()> {
        let ack: Ack = self.send(req, what).await?;
        if !ack.success {
            bail!("{what} was not acknowledged");
        }
        Ok(())
    }
}

#[async_trait]
impl PantryRemote for HttpPantryRemote {
    async fn issue_guest_identity(&self) -> Result<GuestIdentity> {
        let req = self.client.post(self.url("/api/auth/guest"));
        let resp: GuestResponse = self.send(req, "guest login").await?;
        Ok(GuestIdentity {
            id: resp.user.id.into_string(),
        })
    }

    async fn list_pantry(&self, owner_id: &str) -> Result<Vec<PantryRecord>> {
        let req = self
            .client
            .get(self.url("/api/ingredients"))
            .header(OWNER_HEADER, owner_id);
        self.send(req, "list pantry").await
    }

    async fn create_pantry_entries(
        &self,
        owner_id: &str,
        entries: &[NewPantryEntry],
        idempotency_key: Option<&str>,
    ) -> Result<Vec<PantryRecord>> {
        let mut req = self
            .client
            .post(self.url("/api/ingredients"))
            .header(OWNER_HEADER, owner_id)
            .json(&CreateBody {
                ingredients: entries,
            });
        if let Some(key) = idempotency_key {
            req = req.header(IDEMPOTENCY_HEADER, key);
        }
        self.send(req, "create pantry entries").await
    }

    async fn update_pantry_entry(
        &self,
        owner_id: &str,
        id: &str,
        update: &PantryUpdate,
    ) -> Result<PantryRecord> {
        let req = self
            .client
            .put(self.url(&format!("/api/ingredients/{id}")))
            .header(OWNER_HEADER, owner_id)
            .json(update);
        self.send(req, "update pantry entry").await
    }

    async fn delete_pantry_entry(&self, owner_id: &str, id: &str) -> Result<()> {
        let req = self
            .client
            .delete(self.url(&format!("/api/ingredients/{id}")))
            .header(OWNER_HEADER, owner_id);
        self.send_ack(req, "delete pantry entry").await
    }

    async fn delete_all_pantry_entries(&self, owner_id: &str) -> Result<()> {
        let req = self
            .client
            .delete(self.url("/api/ingredients"))
            .header(OWNER_HEADER, owner_id);
        self.send_ack(req, "clear pantry").await
    }
}

/// Stand-in used with `--offline`: every call fails, so the engine keeps the
/// session local-only and marks edits as unsynced.
pub struct OfflineRemote;

#[async_trait]
impl PantryRemote for OfflineRemote {
    async fn issue_guest_identity(&self) -> Result<GuestIdentity> {
        bail!("offline mode")
    }

    async fn list_pantry(&self, _owner_id: &str) -> Result<Vec<PantryRecord>> {
        bail!("offline mode")
    }

    async fn create_pantry_entries(
        &self,
        _owner_id: &str,
        _entries: &[NewPantryEntry],
        _idempotency_key: Option<&str>,
    ) -> Result<Vec<PantryRecord>> {
        bail!("offline mode")
    }

    async fn update_pantry_entry(
        &self,
        _owner_id: &str,
        _id: &str,
        _update: &PantryUpdate,
    ) -> Result<PantryRecord> {
        bail!("offline mode")
    }

    async fn delete_pantry_entry(&self, _owner_id: &str, _id: &str) -> Result<()> {
        bail!("offline mode")
    }

    async fn delete_all_pantry_entries(&self, _owner_id: &str) -> Result<()> {
        bail!("offline mode")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{post, put};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn header(headers: &HeaderMap, name: &str) -> String {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string()
    }

    fn row(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "user_id": "u-1",
            "name": name,
            "quantity": 1,
            "unit": "个",
            "purchase_date": "2024-06-01",
            "expiry_date": "2024-06-08",
            "created_at": "2024-06-01T10:00:00Z",
            "updated_at": "2024-06-01T10:00:00Z"
        })
    }

    fn require_owner(headers: &HeaderMap) -> Result<String, Response> {
        match headers.get(OWNER_HEADER).and_then(|v| v.to_str().ok()) {
            Some("broken") => Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "relation \"ingredients\" does not exist" })),
            )
                .into_response()),
            Some(owner) => Ok(owner.to_string()),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "User ID required" })),
            )
                .into_response()),
        }
    }

    async fn guest(State(log): State<Log>) -> Json<Value> {
        log.lock().unwrap().push("POST guest".to_string());
        Json(json!({ "user": { "id": 42, "name": "Guest User" } }))
    }

    async fn list(State(log): State<Log>, headers: HeaderMap) -> Response {
        let owner = match require_owner(&headers) {
            Ok(o) => o,
            Err(r) => return r,
        };
        log.lock().unwrap().push(format!("GET list {owner}"));
        Json(json!([row("r1", "牛奶"), row("r2", "鸡蛋")])).into_response()
    }

    async fn create(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
        let owner = match require_owner(&headers) {
            Ok(o) => o,
            Err(r) => return r,
        };
        log.lock().unwrap().push(format!(
            "POST create {owner} key={}",
            header(&headers, IDEMPOTENCY_HEADER)
        ));
        let rows: Vec<Value> = body["ingredients"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| row(&format!("n{i}"), item["name"].as_str().unwrap_or("")))
                    .collect()
            })
            .unwrap_or_default();
        Json(Value::Array(rows)).into_response()
    }

    async fn update(
        State(log): State<Log>,
        Path(id): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        let owner = match require_owner(&headers) {
            Ok(o) => o,
            Err(r) => return r,
        };
        log.lock().unwrap().push(format!("PUT {id} {owner}"));
        let mut r = row(&id, body["name"].as_str().unwrap_or("?"));
        r["category"] = body["category"].clone();
        Json(r).into_response()
    }

    async fn delete_one(State(log): State<Log>, Path(id): Path<String>, headers: HeaderMap) -> Response {
        let owner = match require_owner(&headers) {
            Ok(o) => o,
            Err(r) => return r,
        };
        log.lock().unwrap().push(format!("DELETE {id} {owner}"));
        Json(json!({ "success": true })).into_response()
    }

    async fn delete_all(State(log): State<Log>, headers: HeaderMap) -> Response {
        let owner = match require_owner(&headers) {
            Ok(o) => o,
            Err(r) => return r,
        };
        log.lock().unwrap().push(format!("DELETE all {owner}"));
        Json(json!({ "success": true })).into_response()
    }

    async fn spawn_backend() -> (HttpPantryRemote, Log) {
        let log: Log = Arc::default();
        let app = Router::new()
            .route("/api/auth/guest", post(guest))
            .route(
                "/api/ingredients",
                post(create).get(list).delete(delete_all),
            )
            .route("/api/ingredients/{id}", put(update).delete(delete_one))
            .with_state(log.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let remote = HttpPantryRemote::new(&RemoteConfig {
            base_url: format!("http://{addr}/"),
            ..RemoteConfig::default()
        })
        .unwrap();
        (remote, log)
    }

    fn entry(name: &str) -> NewPantryEntry {
        NewPantryEntry {
            name: name.to_string(),
            category: Some("蔬菜".to_string()),
            icon: None,
        }
    }

    #[tokio::test]
    async fn test_guest_identity_accepts_numeric_id() {
        let (remote, log) = spawn_backend().await;
        let guest = remote.issue_guest_identity().await.unwrap();
        assert_eq!(guest.id, "42");
        assert_eq!(*log.lock().unwrap(), ["POST guest"]);
    }

    #[tokio::test]
    async fn test_list_sends_owner_and_parses_rows() {
        let (remote, log) = spawn_backend().await;
        let rows = remote.list_pantry("u-1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "r1");
        assert_eq!(rows[0].name, "牛奶");
        assert_eq!(rows[0].unit.as_deref(), Some("个"));
        assert_eq!(rows[0].category, None);
        assert_eq!(*log.lock().unwrap(), ["GET list u-1"]);
    }

    #[tokio::test]
    async fn test_create_with_and_without_idempotency_key() {
        let (remote, log) = spawn_backend().await;
        let rows = remote
            .create_pantry_entries("u-1", &[entry("土豆"), entry("葱")], Some("migrate-abc"))
            .await
            .unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["土豆", "葱"]);

        remote
            .create_pantry_entries("u-1", &[entry("姜")], None)
            .await
            .unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["POST create u-1 key=migrate-abc", "POST create u-1 key=-"]
        );
    }

    #[tokio::test]
    async fn test_update_and_deletes() {
        let (remote, log) = spawn_backend().await;
        let update = PantryUpdate {
            name: Some("西红柿".to_string()),
            category: Some("蔬菜".to_string()),
            icon: None,
        };
        let rec = remote.update_pantry_entry("u-1", "r7", &update).await.unwrap();
        assert_eq!(rec.id, "r7");
        assert_eq!(rec.name, "西红柿");
        assert_eq!(rec.category.as_deref(), Some("蔬菜"));

        remote.delete_pantry_entry("u-1", "r7").await.unwrap();
        remote.delete_all_pantry_entries("u-1").await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["PUT r7 u-1", "DELETE r7 u-1", "DELETE all u-1"]
        );
    }

    #[tokio::test]
    async fn test_error_status_carries_server_message() {
        let (remote, _log) = spawn_backend().await;
        let err = remote.list_pantry("broken").await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("500"), "{msg}");
        assert!(msg.contains("does not exist"), "{msg}");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let remote = HttpPantryRemote::new(&RemoteConfig {
            base_url: format!("http://{addr}"),
            ..RemoteConfig::default()
        })
        .unwrap();
        let err = remote.issue_guest_identity().await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to reach pantry API"));
    }
}
