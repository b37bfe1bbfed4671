use serde::{Deserialize, Serialize};

/// Media type every generated image is requested in.
pub const IMAGE_OUTPUT_MIME_TYPE: &str = "image/jpeg";

/// One prompt instance for `models/{model}:predict`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInstance {
    /// Text prompt describing the image.
    pub prompt: String,
}

/// Output encoding options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    /// Requested media type of the generated image.
    pub mime_type: String,
}

/// Generation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageParameters {
    /// How many images to generate.
    pub sample_count: u32,

    /// Output encoding options.
    pub output_options: OutputOptions,
}

/// Request body for an Imagen `predict` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePredictRequest {
    /// The prompt instances; always exactly one.
    pub instances: Vec<ImageInstance>,

    /// Generation parameters.
    pub parameters: ImageParameters,
}

impl ImagePredictRequest {
    /// A request for a single JPEG image.
    pub fn single(prompt: impl Into<String>) -> Self {
        Self {
            instances: vec![ImageInstance {
                prompt: prompt.into(),
            }],
            parameters: ImageParameters {
                sample_count: 1,
                output_options: OutputOptions {
                    mime_type: IMAGE_OUTPUT_MIME_TYPE.to_string(),
                },
            },
        }
    }
}

/// One generated image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrediction {
    /// Base64-encoded image bytes; absent when filtered.
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,

    /// Media type of the image.
    #[serde(default)]
    pub mime_type: Option<String>,

    /// Set when the image was filtered by responsible-AI checks.
    #[serde(default)]
    pub rai_filtered_reason: Option<String>,
}

/// Response body for an Imagen `predict` call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImagePredictResponse {
    /// Generated images.
    #[serde(default)]
    pub predictions: Vec<ImagePrediction>,
}

/// An image produced by the backend, ready to be inlined in a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Base64-encoded image bytes.
    pub data: String,

    /// Media type of the image.
    pub mime_type: String,
}

impl GeneratedImage {
    /// A JPEG image from base64 data.
    pub fn jpeg(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: IMAGE_OUTPUT_MIME_TYPE.to_string(),
        }
    }

    /// Render the image as a `data:` URL.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_string(&ImagePredictRequest::single("a cat")).unwrap();
        let expected = r#"{"instances":[{"prompt":"a cat"}],"parameters":{"sampleCount":1,"outputOptions":{"mimeType":"image/jpeg"}}}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{"predictions":[{"bytesBase64Encoded":"/9j/4AAQ","mimeType":"image/jpeg"}]}"#;
        let response: ImagePredictResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.predictions[0].bytes_base64_encoded.as_deref(),
            Some("/9j/4AAQ")
        );
    }

    #[test]
    fn test_data_url() {
        let image = GeneratedImage::jpeg("/9j/4AAQ");
        assert_eq!(image.data_url(), "data:image/jpeg;base64,/9j/4AAQ");
    }
}
