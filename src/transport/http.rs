//! JSON-over-HTTP transport.
//!
//! `POST {endpoint}/invoke/{command}` with the argument bag as the JSON body.
//! The response body is decoded with `RawResponse::from_value`, so both the
//! enveloped and the legacy shapes are accepted.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::protocol::RawResponse;
use crate::transport::{Transport, TransportFault};

/// Transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, url::ParseError> {
        let mut endpoint = Url::parse(endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn command_url(&self, command: &str) -> Result<Url, TransportFault> {
        self.endpoint
            .join(&format!("invoke/{command}"))
            .map_err(|e| TransportFault::Opaque(format!("invalid command name '{command}': {e}")))
    }
}

fn network_fault(err: reqwest::Error) -> TransportFault {
    TransportFault::Network {
        message: err.to_string(),
        details: Some(format!("{err:?}")),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn invoke(&self, command: &str, args: Value) -> Result<RawResponse, TransportFault> {
        let url = self.command_url(command)?;
        let response = self
            .client
            .post(url)
            .json(&args)
            .send()
            .await
            .map_err(network_fault)?;

        let status = response.status();
        let body = response.bytes().await.map_err(network_fault)?;

        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Ok(RawResponse::from_value(value)),
            Err(_) if status.is_server_error() => Err(TransportFault::Network {
                message: format!("backend returned status {status}"),
                details: Some(String::from_utf8_lossy(&body).into_owned()),
            }),
            Err(_) => Err(TransportFault::Opaque(String::from_utf8_lossy(&body).into_owned())),
        }
    }
}
