//! Fluent request construction.

use bytes::Bytes;
use http::StatusCode;
use std::collections::HashMap;
use tokio::io::AsyncRead;
use tracing::error;

use crate::client::content_type::ContentType;
use crate::client::cookie::Cookie;
use crate::client::dispatch::ResponseHeaders;
use crate::client::error::ClientResult;
use crate::client::form::{encode_fields, FormFields, FormFiles};
use crate::client::method::HttpMethod;
use crate::client::multipart::{self, MultipartError};
use crate::transport::{acquire_shared_transport, RequestBody, SharedTransport, TransportKind};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const USER_AGENT: &str = "User-Agent";

/// Accumulates one request and dispatches it.
///
/// Every mutator returns the builder for chaining. Once request construction
/// has failed (see [`RequestBuilder::build_multipart`]) the builder is frozen:
/// mutators do nothing and every terminal call returns the stored error
/// without touching the network.
///
/// ```no_run
/// # async fn run() -> courier::client::ClientResult<()> {
/// use courier::client::{HttpMethod, RequestBuilder};
///
/// let body = RequestBuilder::new()?
///     .set_method(HttpMethod::Get)
///     .add_header("Accept", "application/json")
///     .dispatch("http://localhost:8080/get?test=123")
///     .await?;
/// # let _ = body;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    pub(super) transport: SharedTransport,
    pub(super) method: HttpMethod,
    pub(super) headers: HashMap<String, String>,
    pub(super) cookies: Vec<Cookie>,
    pub(super) body: RequestBody,
    pub(super) pending_error: Option<MultipartError>,
    pub(super) response_headers: ResponseHeaders,
    pub(super) response_status: Option<StatusCode>,
}

impl RequestBuilder {
    /// Builder on the shared keep-alive transport.
    pub fn new() -> ClientResult<Self> {
        Self::for_transport(TransportKind::Standard)
    }

    /// Builder on the shared pooled-object transport.
    pub fn pooled() -> ClientResult<Self> {
        Self::for_transport(TransportKind::Pooled)
    }

    pub fn for_transport(kind: TransportKind) -> ClientResult<Self> {
        Ok(Self::with_transport(acquire_shared_transport(kind)?))
    }

    /// Builder on an explicit transport instance.
    pub fn with_transport(transport: SharedTransport) -> Self {
        let mut builder = Self {
            transport,
            method: HttpMethod::default(),
            headers: HashMap::new(),
            cookies: Vec::new(),
            body: RequestBody::Empty,
            pending_error: None,
            response_headers: ResponseHeaders::default(),
            response_status: None,
        };
        builder.set_content_type(ContentType::FormUrlencoded);
        builder
    }

    fn frozen(&self) -> bool {
        self.pending_error.is_some()
    }

    pub fn set_method(&mut self, method: HttpMethod) -> &mut Self {
        if !self.frozen() {
            self.method = method;
        }
        self
    }

    /// Set one header. Names are kept as given; a repeated name replaces the
    /// earlier value.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if !self.frozen() {
            self.headers.insert(name.into(), value.into());
        }
        self
    }

    pub fn add_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.add_header(name, value);
        }
        self
    }

    pub fn add_cookie(&mut self, cookie: Cookie) -> &mut Self {
        if !self.frozen() {
            self.cookies.push(cookie);
        }
        self
    }

    pub fn set_content_type(&mut self, content_type: impl Into<ContentType>) -> &mut Self {
        let content_type = content_type.into();
        self.add_header(CONTENT_TYPE, content_type.as_str())
    }

    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.add_header(USER_AGENT, user_agent)
    }

    /// Send `body` as is. Replaces any earlier body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        if !self.frozen() {
            self.body = RequestBody::Buffered(body.into());
        }
        self
    }

    /// Stream the body from `reader` without knowing its length up front.
    /// Replaces any earlier body.
    pub fn set_body_stream<R>(&mut self, reader: R) -> &mut Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        if !self.frozen() {
            self.body = RequestBody::Stream(Box::new(reader));
        }
        self
    }

    /// Url-encode `fields` into the body. An empty map leaves the body alone.
    pub fn set_body_map(&mut self, fields: &FormFields) -> &mut Self {
        if fields.is_empty() {
            return self;
        }
        self.set_body(encode_fields(fields))
    }

    /// Assemble a `multipart/form-data` body from fields and files.
    ///
    /// Files are opened here and read while the request is sent. On success
    /// the body is installed as a stream and the content type
    /// carries the boundary. On failure the error is logged and stored, the
    /// partial payload is discarded and the builder is frozen.
    pub async fn build_multipart(&mut self, fields: &FormFields, files: &FormFiles) -> &mut Self {
        if self.frozen() {
            return self;
        }
        match multipart::assemble(fields, files).await {
            Ok(form) => {
                self.set_content_type(form.content_type);
                self.body = RequestBody::Stream(form.body);
            }
            Err(err) => {
                error!(error = %err, "multipart assembly failed");
                self.pending_error = Some(err);
            }
        }
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn pending_error(&self) -> Option<&MultipartError> {
        self.pending_error.as_ref()
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }
}
