//! Fluent HTTP request construction and dispatch.
//!
//! # Responsibilities
//! - Accumulate method, headers, cookies and body for one request
//! - Encode url-encoded form bodies and assemble multipart uploads
//! - Dispatch through a shared [`Transport`](crate::transport::Transport) and
//!   return either the buffered body or a [`ResponseStream`]
//! - Capture response headers of the latest dispatch
//!
//! # Design Decisions
//! - The transport strategy is picked at construction and never shows up in
//!   the builder's method set
//! - The default content type is applied once, in the constructor
//! - A failed multipart build freezes the builder; the error is replayed by
//!   every terminal call without network I/O
//! - Streamed responses own their connection and release it when drained or
//!   dropped, for either transport

pub mod builder;
pub mod content_type;
pub mod cookie;
pub mod dispatch;
pub mod error;
pub mod form;
pub mod method;
pub mod multipart;

pub use builder::RequestBuilder;
pub use content_type::ContentType;
pub use cookie::Cookie;
pub use dispatch::{ResponseHeaders, ResponseStream};
pub use error::{ClientError, ClientResult};
pub use form::{encode_fields, FormFields, FormFiles};
pub use method::HttpMethod;
pub use multipart::{MultipartAssembler, MultipartError, MultipartForm};
