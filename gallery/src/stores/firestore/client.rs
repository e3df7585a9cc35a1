//! Firestore REST client.
//!
//! Thin wrapper over the v1 REST surface. Fields go in and come out as plain
//! JSON objects; typed value encoding happens here.

use super::value::{from_firestore_fields, to_firestore, to_firestore_fields};
use crate::config::FirebaseConfig;
use crate::error::{GalleryError, Result};
use crate::providers::TokenCell;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Array field transform applied by [`FirestoreClient::transform_array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayTransform {
    /// Append the element unless an equal one is present.
    Append,
    /// Remove every element equal to the given one.
    Remove,
}

impl ArrayTransform {
    const fn field_name(self) -> &'static str {
        match self {
            Self::Append => "appendMissingElements",
            Self::Remove => "removeAllFromArray",
        }
    }
}

/// A stored document with its typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Document id (last path segment).
    pub id: String,
    /// Typed Firestore fields.
    pub fields: Map<String, Value>,
}

impl RawDocument {
    /// Decode the fields into plain JSON.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first field that fails to decode.
    pub fn to_json(&self) -> std::result::Result<Value, String> {
        from_firestore_fields(&self.fields).map(Value::Object)
    }
}

#[derive(Deserialize)]
struct DocumentResponse {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl From<DocumentResponse> for RawDocument {
    fn from(document: DocumentResponse) -> Self {
        let id = document
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            fields: document.fields,
        }
    }
}

#[derive(Deserialize)]
struct QueryResult {
    #[serde(default)]
    document: Option<DocumentResponse>,
}

/// Firestore REST client.
///
/// Requests carry the signed-in user's ID token when one is available.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    documents_path: String,
    tokens: Option<TokenCell>,
}

impl FirestoreClient {
    /// Create a client for a project.
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.firestore_base_url.trim_end_matches('/').to_string(),
            documents_path: config.documents_path(),
            tokens: None,
        }
    }

    /// Authenticate requests with the ID token in `tokens`.
    #[must_use]
    pub fn with_tokens(mut self, tokens: TokenCell) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Read a document. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::DocumentStore` if the request fails.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<RawDocument>> {
        let response = self.send(self.client.get(self.document_url(collection, id))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document: DocumentResponse = Self::read_json(response).await?;
        Ok(Some(document.into()))
    }

    /// Create a document with a generated id and return the id.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::DocumentStore` if the request fails.
    #[tracing::instrument(skip(self, fields))]
    pub async fn add(&self, collection: &str, fields: &Map<String, Value>) -> Result<String> {
        let url = format!("{}/{}/{collection}", self.base_url, self.documents_path);
        let request = self
            .client
            .post(url)
            .json(&json!({ "fields": to_firestore_fields(fields) }));
        let document: DocumentResponse = Self::read_json(self.send(request).await?).await?;
        Ok(RawDocument::from(document).id)
    }

    /// Create or overwrite a document.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::DocumentStore` if the request fails.
    #[tracing::instrument(skip(self, fields))]
    pub async fn set(&self, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let request = self
            .client
            .patch(self.document_url(collection, id))
            .json(&json!({ "fields": to_firestore_fields(fields) }));
        let _: DocumentResponse = Self::read_json(self.send(request).await?).await?;
        Ok(())
    }

    /// Overwrite the given fields of an existing document.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::NotFound` if the document does not exist and
    /// `GalleryError::DocumentStore` if the request fails.
    #[tracing::instrument(skip(self, fields))]
    pub async fn update(&self, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let mut query: Vec<(&str, &str)> = fields
            .keys()
            .map(|key| ("updateMask.fieldPaths", key.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let request = self
            .client
            .patch(self.document_url(collection, id))
            .query(&query)
            .json(&json!({ "fields": to_firestore_fields(fields) }));
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GalleryError::NotFound { what: "Document" });
        }
        let _: DocumentResponse = Self::read_json(response).await?;
        Ok(())
    }

    /// Documents of `collection` whose `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::DocumentStore` if the request fails.
    #[tracing::instrument(skip(self, value))]
    pub async fn query_equal(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<RawDocument>> {
        let url = format!("{}/{}:runQuery", self.base_url, self.documents_path);
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": to_firestore(value),
                    }
                }
            }
        });

        let results: Vec<QueryResult> =
            Self::read_json(self.send(self.client.post(url).json(&body)).await?).await?;
        Ok(results
            .into_iter()
            .filter_map(|result| result.document.map(RawDocument::from))
            .collect())
    }

    /// Atomically append to or remove from an array field.
    ///
    /// `element` is an already typed Firestore value. The write fails if the
    /// document does not exist.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::NotFound` if the document does not exist and
    /// `GalleryError::DocumentStore` if the request fails.
    #[tracing::instrument(skip(self, element))]
    pub async fn transform_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        transform: ArrayTransform,
        element: Value,
    ) -> Result<()> {
        let url = format!("{}/{}:commit", self.base_url, self.documents_path);
        let body = json!({
            "writes": [{
                "transform": {
                    "document": format!("{}/{collection}/{id}", self.documents_path),
                    "fieldTransforms": [{
                        "fieldPath": field,
                        (transform.field_name()): { "values": [element] },
                    }],
                },
                "currentDocument": { "exists": true },
            }]
        });

        let response = self.send(self.client.post(url).json(&body)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GalleryError::NotFound { what: "Document" });
        }
        let _: Value = Self::read_json(response).await?;
        Ok(())
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{collection}/{id}", self.base_url, self.documents_path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.tokens.as_ref().and_then(TokenCell::id_token) {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Document store request failed");
            GalleryError::DocumentStore(e.to_string())
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "Document store rejected request");
            return Err(GalleryError::DocumentStore(format!("HTTP {status}: {body}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| GalleryError::DocumentStore(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_come_from_the_resource_name() {
        let document = DocumentResponse {
            name: "projects/p/databases/(default)/documents/events/abc123".into(),
            fields: Map::new(),
        };
        assert_eq!(RawDocument::from(document).id, "abc123");
    }

    #[test]
    fn document_urls_are_rooted_at_the_default_database() {
        let client = FirestoreClient::new(&FirebaseConfig::new("k", "p").with_base_url("http://h"));
        assert_eq!(
            client.document_url("users", "u1"),
            "http://h/projects/p/databases/(default)/documents/users/u1"
        );
    }
}
