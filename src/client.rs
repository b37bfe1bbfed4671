use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUESTS, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS};
use crate::types::{
    GenerateContentRequest, GenerateContentResponse, GeneratedImage, ImagePredictRequest,
    ImagePredictResponse, Model,
};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const API_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the Gemini and Imagen REST APIs.
///
/// Construct it once at startup; a missing credential is reported here and
/// nowhere else.
#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Gemini {
    /// Create a new Gemini client.
    ///
    /// The API key can be provided directly or read from the GEMINI_API_KEY
    /// environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key.filter(|key| !key.is_empty()) {
            Some(key) => key,
            None => env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| {
                    Error::authentication(format!(
                        "API key not provided and {API_KEY_ENV} environment variable not set"
                    ))
                })?,
        };

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every successful response.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::authentication("API key contains invalid characters"))?;
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    /// URL of `method` on `model`, e.g. `models/gemini-2.5-flash:generateContent`.
    ///
    /// Model names that already carry a collection (`tunedModels/...`) are
    /// used as is.
    fn endpoint(&self, model: &Model, method: &str) -> Result<Url> {
        let model = model.to_string();
        let path = if model.contains('/') {
            format!("{model}:{method}")
        } else {
            format!("models/{model}:{method}")
        };
        Ok(self.base_url.join(&path)?)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        match response.text().await {
            Ok(body) => error_from_status(status_code, &body, retry_after),
            Err(e) => Error::http_client(
                format!("Failed to read error response: {}", e),
                Some(Box::new(e)),
            ),
        }
    }

    async fn post<B, R>(&self, url: Url, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.post_inner(url, body).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if result.is_err() {
            CLIENT_REQUEST_ERRORS.click();
        }
        result
    }

    async fn post_inner<B, R>(&self, url: Url, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .headers(self.default_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<R>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    /// Run one `generateContent` call.
    pub async fn generate_content(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model, "generateContent")?;
        let response: GenerateContentResponse = self.post(url, request).await?;
        if let Some(logger) = &self.logger {
            logger.log_chat_response(&response);
        }
        Ok(response)
    }

    /// Generate a single JPEG image from `prompt` with an Imagen model.
    pub async fn generate_image(&self, model: &Model, prompt: &str) -> Result<GeneratedImage> {
        let url = self.endpoint(model, "predict")?;
        let response: ImagePredictResponse =
            self.post(url, &ImagePredictRequest::single(prompt)).await?;
        let image = first_image(response)?;
        if let Some(logger) = &self.logger {
            logger.log_generated_image(prompt, &image);
        }
        Ok(image)
    }
}

impl fmt::Debug for Gemini {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gemini")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

fn first_image(response: ImagePredictResponse) -> Result<GeneratedImage> {
    let mut filtered = None;
    for prediction in response.predictions {
        if let Some(data) = prediction.bytes_base64_encoded {
            let mut image = GeneratedImage::jpeg(data);
            if let Some(mime_type) = prediction.mime_type {
                image.mime_type = mime_type;
            }
            return Ok(image);
        }
        filtered = filtered.or(prediction.rai_filtered_reason);
    }
    Err(match filtered {
        Some(reason) => Error::empty_response(format!("image was filtered: {reason}")),
        None => Error::empty_response("image model returned no predictions"),
    })
}

/// Maps an HTTP error status and body onto an [`Error`].
fn error_from_status(status_code: u16, body: &str, retry_after: Option<u64>) -> Error {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        status: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error);
    let status = detail.as_ref().and_then(|d| d.status.clone());
    let message = detail
        .and_then(|d| d.message)
        .unwrap_or_else(|| body.to_string());

    match status_code {
        400 => Error::bad_request(message),
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500 => Error::internal_server(message),
        502..=504 => Error::service_unavailable(message, retry_after),
        _ => Error::api(status_code, status, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImagePrediction, KnownModel};

    #[test]
    fn test_client_creation() {
        let client = Gemini::new(Some("test-key".to_string())).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.base_url.as_str(), DEFAULT_API_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = Gemini::with_options(
            Some("test-key".to_string()),
            Some("http://localhost:8080/v1beta".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "http://localhost:8080/v1beta/");
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = Gemini::new(Some("secret-key".to_string())).unwrap();
        assert!(!format!("{client:?}").contains("secret-key"));
    }

    #[test]
    fn test_bad_base_url() {
        let err = Gemini::with_options(
            Some("test-key".to_string()),
            Some("not a url".to_string()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn test_endpoints() {
        let client = Gemini::new(Some("test-key".to_string())).unwrap();
        let url = client
            .endpoint(&Model::Known(KnownModel::Gemini25Flash), "generateContent")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        let url = client
            .endpoint(&Model::Known(KnownModel::Imagen3Generate002), "predict")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/imagen-3.0-generate-002:predict"
        );
        let url = client
            .endpoint(&Model::Custom("tunedModels/helper".to_string()), "generateContent")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/tunedModels/helper:generateContent"
        );
    }

    #[test]
    fn test_error_mapping() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let err = error_from_status(400, body, None);
        assert!(err.is_bad_request());
        assert_eq!(err.to_string(), "Bad request: API key not valid.");

        let err = error_from_status(429, "slow down", Some(7));
        assert!(err.is_rate_limit());
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded: slow down (retry after 7 seconds)"
        );

        assert!(error_from_status(503, "", None).is_server_error());

        let body = r#"{"error":{"code":409,"message":"conflict","status":"ABORTED"}}"#;
        let err = error_from_status(409, body, None);
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(err.to_string(), "ABORTED (409): conflict");
    }

    #[test]
    fn test_first_image() {
        let response = ImagePredictResponse {
            predictions: vec![ImagePrediction {
                bytes_base64_encoded: Some("/9j/".to_string()),
                mime_type: Some("image/jpeg".to_string()),
                rai_filtered_reason: None,
            }],
        };
        assert_eq!(first_image(response).unwrap(), GeneratedImage::jpeg("/9j/"));

        let filtered = ImagePredictResponse {
            predictions: vec![ImagePrediction {
                bytes_base64_encoded: None,
                mime_type: None,
                rai_filtered_reason: Some("unsafe".to_string()),
            }],
        };
        let err = first_image(filtered).unwrap_err();
        assert!(err.is_empty_response());
        assert!(err.to_string().contains("unsafe"));

        let err = first_image(ImagePredictResponse { predictions: vec![] }).unwrap_err();
        assert!(err.is_empty_response());
    }

    #[tokio::test]
    #[ignore] // Ignore by default as this requires a real API key
    async fn test_generate_content_live() {
        let api_key = env::var(API_KEY_ENV).ok();
        if api_key.is_none() {
            println!("Skipping test_generate_content_live: {API_KEY_ENV} not set");
            return;
        }
        let client = Gemini::new(api_key).unwrap();
        let request = GenerateContentRequest::new(
            vec![crate::types::Content::user(vec![crate::types::Part::text(
                "Reply with the single word: pong",
            )])],
            None,
        );
        let response = client
            .generate_content(&Model::Known(KnownModel::Gemini25Flash), &request)
            .await
            .unwrap();
        assert!(response.text().is_some());
    }
}
