//! Outbound HTTP capability.
//!
//! Transport failures come back as a response with `error` set and no
//! status code; HTTP error statuses are ordinary responses. Bodies are
//! truncated at [`MAX_BODY_SIZE`] without error.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use wasmtime::Linker;

use crate::plugin::PluginState;
use crate::wire::{HttpFetchRequest, HttpFetchResponse};

use super::convert::validation;
use super::{register_op, CallScope};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

pub(crate) fn register_http(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "http",
        "fetch",
        |scope: CallScope, req: HttpFetchRequest| {
            Box::pin(async move {
                let method = reqwest::Method::from_bytes(req.method.as_bytes())
                    .map_err(|_| validation(format!("invalid method: {}", req.method)))?;

                Ok(fetch(&scope.services.http, method, req).await)
            })
        },
    )
}

async fn fetch(
    client: &reqwest::Client,
    method: reqwest::Method,
    req: HttpFetchRequest,
) -> HttpFetchResponse {
    let timeout = if req.timeout_seconds > 0 {
        Duration::from_secs(req.timeout_seconds)
    } else {
        DEFAULT_TIMEOUT
    };

    let mut builder = client.request(method, req.url.as_str()).timeout(timeout);
    for (name, value) in &req.headers {
        builder = builder.header(name, value);
    }
    if let Some(body) = req.body {
        builder = builder.body(body);
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(err) => {
            return HttpFetchResponse {
                error: Some(err.to_string()),
                ..Default::default()
            };
        }
    };

    let status_code = response.status().as_u16();

    // Header names come back lowercased, giving the guest a
    // case-insensitive view.
    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_string(), value.to_string());
        }
    }

    match read_body_capped(response).await {
        Ok(body) => HttpFetchResponse {
            status_code: Some(status_code),
            headers,
            body,
            error: None,
        },
        Err(err) => HttpFetchResponse {
            status_code: Some(status_code),
            headers,
            body: Vec::new(),
            error: Some(err.to_string()),
        },
    }
}

/// Read at most [`MAX_BODY_SIZE`] bytes; longer bodies are cut, not failed.
async fn read_body_capped(mut response: reqwest::Response) -> reqwest::Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = MAX_BODY_SIZE - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
