use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::error::TransportError;
use crate::types::GenerationRequest;
use crate::util::is_local_endpoint_url;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Opens the streamed response body for one turn.
pub trait StreamProducer: Send + Sync {
    fn open_stream(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'static, Result<ByteStream, TransportError>>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }

    pub async fn create_stream(&self, request: &GenerationRequest) -> Result<ByteStream, TransportError> {
        let request_url = self.api_url.clone();
        if debug_payload_enabled() {
            emit_debug_payload(&request_url, request);
        }

        let mut builder = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("authorization", format!("Bearer {api_key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|error| map_request_error(error, &request_url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: request_url,
                status: status.as_u16(),
            });
        }
        if response.content_length() == Some(0) {
            return Err(TransportError::NoBody { url: request_url });
        }

        let stream_url = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| TransportError::Read {
                url: stream_url.clone(),
                message: error.to_string(),
            })
        });
        Ok(Box::pin(stream))
    }
}

impl StreamProducer for ApiClient {
    fn open_stream(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'static, Result<ByteStream, TransportError>> {
        let client = self.clone();
        Box::pin(async move { client.create_stream(&request).await })
    }
}

fn map_request_error(error: reqwest::Error, request_url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Status {
            url: request_url.to_string(),
            status: status.as_u16(),
        };
    }

    let message = if error.is_connect() && is_local_endpoint_url(request_url) {
        format!("{error}. Start your local server or update PANELSTREAM_API_URL.")
    } else if error.is_timeout() {
        format!("request timed out: {error}")
    } else {
        error.to_string()
    };
    TransportError::Connect {
        url: request_url.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> Config {
        Config {
            api_url: url.to_string(),
            api_key: None,
            system_prompt: None,
            context: None,
        }
    }

    #[test]
    fn test_client_reports_endpoint_locality() {
        assert!(ApiClient::new(&config("http://localhost:8000/v1/generate")).is_local_endpoint());
        assert!(!ApiClient::new(&config("https://api.example.com/v1/generate")).is_local_endpoint());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connect_error() {
        let client = ApiClient::new(&config("http://127.0.0.1:9/v1/generate"));
        let result = client.create_stream(&GenerationRequest::new("hi")).await;
        match result {
            Err(TransportError::Connect { url, message }) => {
                assert_eq!(url, "http://127.0.0.1:9/v1/generate");
                assert!(message.contains("PANELSTREAM_API_URL"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("port 9 should refuse connections"),
        }
    }
}
