//! OpenSearch / Elasticsearch REST client.

use explorer_index_common::EngineConnection;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use url::Url;

use super::{AliasAction, IndexedDocument, ReindexSummary, SearchEngine};
use crate::error::EngineError;

const SCROLL_PAGE_SIZE: usize = 100;
const SCROLL_KEEP_ALIVE: &str = "5m";

#[derive(Debug, Deserialize)]
struct ScrollPage {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: ScrollHits,
}

#[derive(Debug, Deserialize)]
struct ScrollHits {
    #[serde(default)]
    hits: Vec<IndexedDocument>,
}

#[derive(Debug, Clone)]
pub struct OpenSearchClient {
    http: reqwest::Client,
    base: String,
    user: Option<String>,
    password: Option<String>,
}

impl OpenSearchClient {
    /// Build a client for the configured engine. No request timeout is set:
    /// a reindex waits for completion however long it takes.
    pub fn connect(connection: &EngineConnection) -> Result<Self, EngineError> {
        let parsed = Url::parse(&connection.url).map_err(|source| EngineError::InvalidUrl {
            url: connection.url.clone(),
            source,
        })?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(EngineError::Client)?;
        debug!(url = %parsed, "Search engine client ready.");
        Ok(Self {
            http,
            base: parsed.as_str().trim_end_matches('/').to_string(),
            user: connection.user.clone(),
            password: connection.password.clone(),
        })
    }

    /// Underlying HTTP client, shareable with other fetchers of the run.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base, path.trim_start_matches('/'));
        let builder = self.http.request(method, url);
        match self.user.as_deref() {
            Some(user) if !user.is_empty() => builder.basic_auth(user, self.password.as_deref()),
            _ => builder,
        }
    }

    async fn send(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<Response, EngineError> {
        let response = builder
            .send()
            .await
            .map_err(|source| EngineError::Transport { operation, source })?;
        if response.status().is_success() {
            debug!(operation, status = %response.status(), "Search engine request succeeded.");
            return Ok(response);
        }
        Err(status_error(operation, response).await)
    }

    async fn clear_scroll(&self, scroll_id: &str) {
        let builder = self
            .request(Method::DELETE, "_search/scroll")
            .json(&json!({ "scroll_id": [scroll_id] }));
        if let Err(err) = self.send("clear scroll", builder).await {
            debug!(error = %err, "Scroll context not cleared, it will expire.");
        }
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T, EngineError> {
    response
        .json()
        .await
        .map_err(|source| EngineError::Decode { operation, source })
}

async fn status_error(operation: &'static str, response: Response) -> EngineError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    warn!(operation, status, "Search engine rejected request.");
    EngineError::Status {
        operation,
        status,
        body,
    }
}

impl SearchEngine for OpenSearchClient {
    async fn create_index(&self, index: &str, mapping: &Value) -> Result<(), EngineError> {
        let builder = self.request(Method::PUT, index).json(mapping);
        self.send("create index", builder).await?;
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), EngineError> {
        let builder = self.request(Method::DELETE, index);
        self.send("delete index", builder).await?;
        Ok(())
    }

    async fn alias_targets(&self, alias: &str) -> Result<Vec<String>, EngineError> {
        let operation = "get alias";
        let response = self
            .request(Method::GET, &format!("_alias/{alias}"))
            .send()
            .await
            .map_err(|source| EngineError::Transport { operation, source })?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(alias, "Alias not found.");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(status_error(operation, response).await);
        }
        let body: Map<String, Value> = response
            .json()
            .await
            .map_err(|source| EngineError::Decode { operation, source })?;
        Ok(body.into_iter().map(|(index, _)| index).collect())
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), EngineError> {
        let builder = self
            .request(Method::POST, "_aliases")
            .json(&json!({ "actions": actions }));
        self.send("update aliases", builder).await?;
        Ok(())
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<ReindexSummary, EngineError> {
        let operation = "reindex";
        let body = json!({
            "source": { "index": source, "query": { "match_all": {} } },
            "dest": { "index": dest },
        });
        let builder = self
            .request(Method::POST, "_reindex?wait_for_completion=true")
            .json(&body);
        decode(operation, self.send(operation, builder).await?).await
    }

    async fn scan_documents(&self, index: &str) -> Result<Vec<IndexedDocument>, EngineError> {
        let operation = "scan documents";
        let builder = self
            .request(
                Method::POST,
                &format!("{index}/_search?scroll={SCROLL_KEEP_ALIVE}"),
            )
            .json(&json!({ "size": SCROLL_PAGE_SIZE, "query": { "match_all": {} } }));
        let mut page: ScrollPage = decode(operation, self.send(operation, builder).await?).await?;

        let mut documents = Vec::new();
        loop {
            let ScrollPage { scroll_id, hits } = page;
            let exhausted = hits.hits.is_empty();
            documents.extend(hits.hits);
            let Some(scroll_id) = scroll_id else {
                break;
            };
            if exhausted {
                self.clear_scroll(&scroll_id).await;
                break;
            }
            let builder = self
                .request(Method::POST, "_search/scroll")
                .json(&json!({ "scroll": SCROLL_KEEP_ALIVE, "scroll_id": scroll_id }));
            page = decode(operation, self.send(operation, builder).await?).await?;
        }
        debug!(index, documents = documents.len(), "Index scanned.");
        Ok(documents)
    }

    async fn delete_document(
        &self,
        index: &str,
        id: &str,
        routing: &str,
    ) -> Result<(), EngineError> {
        let builder = self.request(
            Method::DELETE,
            &format!("{index}/_doc/{id}?routing={routing}"),
        );
        self.send("delete document", builder).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenSearchClient {
        OpenSearchClient::connect(&EngineConnection {
            url: format!("{}/", server.uri()),
            user: Some("admin".to_string()),
            password: Some("s3cret".to_string()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_index_sends_mapping_with_credentials() {
        let server = MockServer::start().await;
        let mapping = json!({ "mappings": { "properties": { "name": { "type": "text" } } } });

        Mock::given(method("PUT"))
            .and(path("/p-blog-20240305140709"))
            .and(header("authorization", "Basic YWRtaW46czNjcmV0"))
            .and(body_json(&mapping))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .create_index("p-blog-20240305140709", &mapping)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_engine_rejection_keeps_status_and_payload() {
        let server = MockServer::start().await;
        let payload = json!({
            "error": { "type": "resource_already_exists_exception" },
            "status": 400
        });

        Mock::given(method("PUT"))
            .and(path("/p-blog"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&payload))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_index("p-blog", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.payload(), Some(&payload));
    }

    #[tokio::test]
    async fn test_missing_alias_resolves_to_no_index() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_alias/latest-p-blog"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "alias [latest-p-blog] missing",
                "status": 404
            })))
            .mount(&server)
            .await;

        let targets = client_for(&server).alias_targets("latest-p-blog").await.unwrap();
        assert!(targets.is_empty());
    }

    #[tokio::test]
    async fn test_alias_targets_lists_indices() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_alias/latest-p-blog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "p-blog-20240101000000": { "aliases": { "latest-p-blog": {} } }
            })))
            .mount(&server)
            .await;

        let targets = client_for(&server).alias_targets("latest-p-blog").await.unwrap();
        assert_eq!(targets, vec!["p-blog-20240101000000".to_string()]);
    }

    #[tokio::test]
    async fn test_alias_lookup_server_error_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_alias/latest-p-blog"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .alias_targets("latest-p-blog")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.payload(), Some(&Value::String("unavailable".to_string())));
    }

    #[tokio::test]
    async fn test_update_aliases_sends_single_batch() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/_aliases"))
            .and(body_json(json!({
                "actions": [
                    { "add": { "index": "new", "alias": "latest-p-blog" } },
                    { "remove": { "index": "old", "alias": "latest-p-blog" } }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .update_aliases(&[
                AliasAction::add("new", "latest-p-blog"),
                AliasAction::remove("old", "latest-p-blog"),
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reindex_waits_for_completion_and_reads_summary() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/_reindex"))
            .and(query_param("wait_for_completion", "true"))
            .and(body_json(json!({
                "source": { "index": "old", "query": { "match_all": {} } },
                "dest": { "index": "new" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "took": 1520,
                "timed_out": false,
                "total": 42,
                "created": 42,
                "failures": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = client_for(&server).reindex("old", "new").await.unwrap();
        assert_eq!(summary.took, 1520);
        assert_eq!(summary.total, 42);
        assert_eq!(summary.copied(), 42);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn test_scan_documents_follows_scroll_until_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/p-blog/_search"))
            .and(query_param("scroll", "5m"))
            .and(body_json(json!({ "size": 100, "query": { "match_all": {} } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "scroll-1",
                "hits": { "hits": [
                    { "_id": "1", "_source": { "assetId": "a", "application": "blog" } },
                    { "_id": "2", "_source": { "assetId": "a", "application": "blog" } }
                ] }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/_search/scroll"))
            .and(body_json(json!({ "scroll": "5m", "scroll_id": "scroll-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "scroll-2",
                "hits": { "hits": [
                    { "_id": "3", "_source": { "assetId": "b", "application": "blog" } }
                ] }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/_search/scroll"))
            .and(body_json(json!({ "scroll": "5m", "scroll_id": "scroll-2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "scroll-2",
                "hits": { "hits": [] }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/_search/scroll"))
            .and(body_json(json!({ "scroll_id": ["scroll-2"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "succeeded": true })))
            .expect(1)
            .mount(&server)
            .await;

        let documents = client_for(&server).scan_documents("p-blog").await.unwrap();
        let ids: Vec<&str> = documents.iter().map(|doc| doc.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(documents[2].source["assetId"], "b");
    }

    #[tokio::test]
    async fn test_delete_document_passes_routing() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/p-blog/_doc/42"))
            .and(query_param("routing", "blog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "deleted" })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .delete_document("p-blog", "42", "blog")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_index_without_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/p-blog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenSearchClient::connect(&EngineConnection {
            url: server.uri(),
            user: None,
            password: None,
        })
        .unwrap();
        client.delete_index("p-blog").await.unwrap();
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = OpenSearchClient::connect(&EngineConnection {
            url: "not a url".to_string(),
            user: None,
            password: None,
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidUrl { .. }));
    }
}
