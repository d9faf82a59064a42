//! Terminal operations: turning a builder into a request and a response.

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Method, StatusCode};
use std::collections::HashMap;
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;
use url::Url;

use crate::client::builder::RequestBuilder;
use crate::client::content_type::FORM_URLENCODED;
use crate::client::cookie::cookie_header;
use crate::client::error::{ClientError, ClientResult};
use crate::client::form::{encode_fields, FormFields};
use crate::observability::metrics::record_dispatch;
use crate::transport::{OutboundRequest, RequestBody, ResponseBody, TransportKind};

/// Response headers captured by the most recent dispatch.
///
/// Names are stored lowercased; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    values: HashMap<String, Vec<String>>,
}

impl ResponseHeaders {
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            values
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        Self { values }
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// A response whose body is read incrementally.
///
/// Owns its connection: draining the body or dropping the stream returns
/// the connection to the transport.
pub struct ResponseStream {
    status: StatusCode,
    body: ResponseBody,
}

impl ResponseStream {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Next body chunk, or `None` once the body is drained.
    pub async fn next_chunk(&mut self) -> Option<ClientResult<Bytes>> {
        self.body
            .next()
            .await
            .map(|chunk| chunk.map_err(ClientError::from))
    }

    /// Copy the remaining body into `sink`, returning the byte count.
    pub async fn write_to<W>(mut self, sink: &mut W) -> ClientResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.next_chunk().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }

    /// Read the remaining body into memory.
    pub async fn bytes(mut self) -> ClientResult<Bytes> {
        let mut collected = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await {
            collected.extend_from_slice(&chunk?);
        }
        Ok(collected.freeze())
    }

    pub fn into_stream(self) -> ResponseBody {
        self.body
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl RequestBuilder {
    /// Send the request and read the whole response body.
    ///
    /// Response headers and status are captured into the builder, replacing
    /// those of any earlier dispatch.
    pub async fn dispatch(&mut self, url: &str) -> ClientResult<Bytes> {
        let request = self.prepare(url)?;
        let kind = self.transport.kind();
        let method = request.method.clone();
        let start = Instant::now();
        debug!(transport = %kind, %method, url = %request.url, "dispatching request");

        match self.transport.execute_buffered(request).await {
            Ok(response) => {
                self.capture(response.status, &response.headers);
                finished(kind, &method, Some(response.status), start);
                Ok(response.body)
            }
            Err(err) => {
                self.reset_capture();
                finished(kind, &method, None, start);
                Err(err.into())
            }
        }
    }

    /// Send the request and hand back the body as a stream.
    ///
    /// Headers and status are captured as soon as they arrive.
    pub async fn dispatch_stream(&mut self, url: &str) -> ClientResult<ResponseStream> {
        let request = self.prepare(url)?;
        let kind = self.transport.kind();
        let method = request.method.clone();
        let start = Instant::now();
        debug!(transport = %kind, %method, url = %request.url, "dispatching streamed request");

        match self.transport.execute(request).await {
            Ok(response) => {
                self.capture(response.status, &response.headers);
                finished(kind, &method, Some(response.status), start);
                Ok(ResponseStream {
                    status: response.status,
                    body: response.body,
                })
            }
            Err(err) => {
                self.reset_capture();
                finished(kind, &method, None, start);
                Err(err.into())
            }
        }
    }

    /// Bare GET that ignores the builder's headers, cookies and body.
    ///
    /// Response headers are not captured; use [`RequestBuilder::dispatch`]
    /// when they are needed.
    pub async fn fast_get(&self, url: &str) -> ClientResult<Bytes> {
        self.fast_send(OutboundRequest::new(Method::GET, self.parse_url(url)?))
            .await
    }

    /// Form-encoded POST of `fields` that ignores the builder's state.
    ///
    /// Response headers are not captured.
    pub async fn fast_post(&self, url: &str, fields: &FormFields) -> ClientResult<Bytes> {
        let mut request = OutboundRequest::new(Method::POST, self.parse_url(url)?);
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
        request.body = RequestBody::Buffered(encode_fields(fields));
        self.fast_send(request).await
    }

    /// Headers of the most recent dispatch; empty before the first one.
    pub fn response_headers(&self) -> &ResponseHeaders {
        &self.response_headers
    }

    /// Status of the most recent successful dispatch.
    pub fn response_status(&self) -> Option<StatusCode> {
        self.response_status
    }

    async fn fast_send(&self, request: OutboundRequest) -> ClientResult<Bytes> {
        if let Some(err) = &self.pending_error {
            return Err(ClientError::Build(err.clone()));
        }
        let kind = self.transport.kind();
        let method = request.method.clone();
        let start = Instant::now();
        debug!(transport = %kind, %method, url = %request.url, "dispatching bare request");

        let result = self.transport.execute_buffered(request).await;
        finished(kind, &method, result.as_ref().ok().map(|r| r.status), start);
        Ok(result?.body)
    }

    fn prepare(&mut self, url: &str) -> ClientResult<OutboundRequest> {
        if let Some(err) = &self.pending_error {
            return Err(ClientError::Build(err.clone()));
        }

        let mut request = OutboundRequest::new(self.method.into(), self.parse_url(url)?);
        for (name, value) in &self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            request.headers.append(header_name, header_value);
        }

        if !self.cookies.is_empty() {
            let value = HeaderValue::from_str(&cookie_header(&self.cookies)).map_err(|e| {
                ClientError::InvalidHeader {
                    name: COOKIE.as_str().to_string(),
                    reason: e.to_string(),
                }
            })?;
            request.headers.append(COOKIE, value);
        }

        request.body = self.body.take_for_dispatch();
        Ok(request)
    }

    fn parse_url(&self, url: &str) -> ClientResult<Url> {
        Url::parse(url).map_err(|source| ClientError::InvalidUrl {
            url: url.to_string(),
            source,
        })
    }

    fn capture(&mut self, status: StatusCode, headers: &HeaderMap) {
        self.response_headers = ResponseHeaders::from_header_map(headers);
        self.response_status = Some(status);
    }

    fn reset_capture(&mut self) {
        self.response_headers = ResponseHeaders::default();
        self.response_status = None;
    }
}

fn finished(kind: TransportKind, method: &Method, status: Option<StatusCode>, start: Instant) {
    debug!(
        transport = %kind,
        %method,
        status = status.map(|s| s.as_u16()),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request finished"
    );
    record_dispatch(kind, method, status.map(|s| s.as_u16()), start);
}
