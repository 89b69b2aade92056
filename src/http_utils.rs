use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ErrorBody;

/// Default server address for `plantctl`.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Failures talking to the plantcare API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not reach server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
    #[error("not logged in")]
    NotLoggedIn,
}

impl ClientError {
    /// Whether the server rejected the session token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ClientError::Api { status, .. } if *status == StatusCode::UNAUTHORIZED.as_u16()
        ) || matches!(self, ClientError::NotLoggedIn)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// JSON client for the `/api` resources, optionally carrying a bearer token.
#[derive(Debug, Clone)]
pub struct PlantClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl PlantClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Sends `token` as `Authorization: Bearer` on every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Constructs a full API URL from a path
    pub fn api_url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/api/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Makes a GET request and handles the response
    pub async fn get<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let request = self.client.get(self.api_url(path));
        let response = self.authorized(request).send().await?;
        handle_response(response).await
    }

    /// Makes a GET request with query parameters
    pub async fn get_with_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.get(self.api_url(path)).query(query);
        let response = self.authorized(request).send().await?;
        handle_response(response).await
    }

    /// Makes a POST request with JSON body and handles the response
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.api_url(path)).json(body);
        let response = self.authorized(request).send().await?;
        handle_response(response).await
    }

    /// Makes a POST request without body and handles the response
    pub async fn post_empty<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let request = self.client.post(self.api_url(path));
        let response = self.authorized(request).send().await?;
        handle_response(response).await
    }

    /// Makes a PUT request with JSON body and handles the response
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.put(self.api_url(path)).json(body);
        let response = self.authorized(request).send().await?;
        handle_response(response).await
    }

    /// Makes a DELETE request (no body expected)
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let request = self.client.delete(self.api_url(path));
        let response = self.authorized(request).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Deserializes a success body or converts the response into a [`ClientError`].
async fn handle_response<T>(response: Response) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    ClientError::Api {
        status,
        message: error_message(&text),
    }
}

/// Extracts the `message` of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    if let Ok(ErrorBody { message }) = serde_json::from_str::<ErrorBody>(body) {
        return message;
    }
    if body.trim().is_empty() {
        "No error details".to_string()
    } else {
        body.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_rooted_at_api() {
        let client = PlantClient::new("http://localhost:5000/");
        assert_eq!(client.api_url("plants"), "http://localhost:5000/api/plants");
        assert_eq!(
            client.api_url("/plants/1/water"),
            "http://localhost:5000/api/plants/1/water"
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(error_message(r#"{"message":"plant not found"}"#), "plant not found");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(""), "No error details");
    }

    #[test]
    fn unauthorized_detection() {
        let err = ClientError::Api {
            status: 401,
            message: "token expired".to_string(),
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "token expired (HTTP 401)");
        assert!(
            !ClientError::Api {
                status: 404,
                message: "plant not found".to_string(),
            }
            .is_unauthorized()
        );
    }
}
