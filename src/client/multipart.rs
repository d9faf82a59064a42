//! `multipart/form-data` body assembly.
//!
//! Field parts and part headers are small and are written into memory. File
//! contents are not: every file is opened and checked up front, then read
//! from disk while the request is being sent. The body is a chain of
//! readers: buffered framing, file, buffered framing, file, ..., trailer.
//! The first failure aborts assembly; files opened so far are closed and the
//! partial body is dropped.

use rand::Rng;
use std::fmt;
use std::fmt::Write as _;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::client::content_type::ContentType;
use crate::client::form::{FormFields, FormFiles};
use crate::transport::BodyReader;

/// Random bytes behind a boundary; rendered as twice as many hex digits.
const BOUNDARY_BYTES: usize = 30;

/// Failure while assembling a multipart body.
///
/// Cloneable so a builder can hand the same error to every later dispatch.
#[derive(Debug, Clone, Error)]
pub enum MultipartError {
    #[error("invalid multipart field name {0:?}")]
    InvalidFieldName(String),

    #[error("failed to open upload file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("upload path {} is not a regular file", .0.display())]
    NotAFile(PathBuf),
}

/// A finished multipart payload, read lazily.
pub struct MultipartForm {
    pub content_type: ContentType,
    pub body: BodyReader,
}

impl fmt::Debug for MultipartForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartForm")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Writes parts separated by a random boundary.
pub struct MultipartAssembler {
    boundary: String,
    /// Framing not yet sealed into a segment.
    pending: Vec<u8>,
    segments: Vec<BodyReader>,
    parts: usize,
}

impl MultipartAssembler {
    pub fn new() -> Self {
        Self::with_boundary(random_boundary())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            pending: Vec::new(),
            segments: Vec::new(),
            parts: 0,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> ContentType {
        ContentType::multipart(&self.boundary)
    }

    /// Append a plain form field.
    pub fn write_field(&mut self, name: &str, value: &str) -> Result<(), MultipartError> {
        let disposition = format!("form-data; name=\"{}\"", escape_quotes(checked_name(name)?));
        self.begin_part(&disposition, None);
        self.pending.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Append a file part named after the path's final component.
    ///
    /// The file is opened now and read when the body is sent.
    pub async fn write_file(&mut self, name: &str, path: &Path) -> Result<(), MultipartError> {
        let name = checked_name(name)?;
        let open_failed = |e: io::Error| MultipartError::Open {
            path: path.to_path_buf(),
            source: Arc::new(e),
        };
        let file = File::open(path).await.map_err(open_failed)?;
        if !file.metadata().await.map_err(open_failed)?.is_file() {
            return Err(MultipartError::NotAFile(path.to_path_buf()));
        }

        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let disposition = format!(
            "form-data; name=\"{}\"; filename=\"{}\"",
            escape_quotes(name),
            escape_quotes(&filename)
        );
        self.begin_part(&disposition, Some("application/octet-stream"));
        self.seal();
        self.segments.push(Box::new(file));
        Ok(())
    }

    /// Write the closing boundary and chain every segment into one body.
    pub fn finish(mut self) -> MultipartForm {
        let content_type = self.content_type();
        let trailer = format!("\r\n--{}--\r\n", self.boundary);
        self.pending.extend_from_slice(trailer.as_bytes());
        self.seal();

        let mut segments = self.segments.into_iter();
        let first = segments
            .next()
            .unwrap_or_else(|| -> BodyReader { Box::new(Cursor::new(Vec::new())) });
        let body = segments.fold(first, |body, next| -> BodyReader { Box::new(body.chain(next)) });
        MultipartForm { content_type, body }
    }

    fn begin_part(&mut self, disposition: &str, content_type: Option<&str>) {
        let mut head = String::new();
        if self.parts > 0 {
            head.push_str("\r\n");
        }
        let _ = write!(head, "--{}\r\n", self.boundary);
        let _ = write!(head, "Content-Disposition: {disposition}\r\n");
        if let Some(content_type) = content_type {
            let _ = write!(head, "Content-Type: {content_type}\r\n");
        }
        head.push_str("\r\n");
        self.pending.extend_from_slice(head.as_bytes());
        self.parts += 1;
    }

    fn seal(&mut self) {
        if !self.pending.is_empty() {
            let framing = std::mem::take(&mut self.pending);
            self.segments.push(Box::new(Cursor::new(framing)));
        }
    }
}

impl Default for MultipartAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MultipartAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartAssembler")
            .field("boundary", &self.boundary)
            .field("parts", &self.parts)
            .finish_non_exhaustive()
    }
}

/// Assemble every field and file into one payload.
///
/// A field with no values is written once with an empty value; otherwise
/// once per value under the same name.
pub async fn assemble(fields: &FormFields, files: &FormFiles) -> Result<MultipartForm, MultipartError> {
    let mut assembler = MultipartAssembler::new();

    for (name, values) in fields {
        if values.is_empty() {
            assembler.write_field(name, "")?;
            continue;
        }
        for value in values {
            assembler.write_field(name, value)?;
        }
    }

    for (name, path) in files {
        assembler.write_file(name, path).await?;
    }

    Ok(assembler.finish())
}

fn random_boundary() -> String {
    let mut raw = [0u8; BOUNDARY_BYTES];
    rand::thread_rng().fill(&mut raw[..]);
    raw.iter().fold(String::with_capacity(BOUNDARY_BYTES * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn checked_name(name: &str) -> Result<&str, MultipartError> {
    if name.contains(['\r', '\n']) {
        return Err(MultipartError::InvalidFieldName(name.to_string()));
    }
    Ok(name)
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::body::CHUNK_SIZE;
    use std::collections::HashMap;

    async fn text(form: MultipartForm) -> String {
        let mut body = form.body;
        let mut out = String::new();
        body.read_to_string(&mut out).await.unwrap();
        out
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("courier-mp-{tag}-{}.txt", std::process::id()))
    }

    #[test]
    fn boundary_is_sixty_hex_digits() {
        let assembler = MultipartAssembler::new();
        assert_eq!(assembler.boundary().len(), 60);
        assert!(assembler.boundary().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(assembler.boundary(), MultipartAssembler::new().boundary());
    }

    #[tokio::test]
    async fn fields_are_framed_by_boundaries() {
        let mut assembler = MultipartAssembler::with_boundary("XYZ");
        assembler.write_field("name", "abeir").unwrap();
        assembler.write_field("age", "23").unwrap();
        let form = assembler.finish();

        assert_eq!(form.content_type.as_str(), "multipart/form-data; boundary=XYZ");
        assert_eq!(
            text(form).await,
            "--XYZ\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nabeir\r\n\
             --XYZ\r\nContent-Disposition: form-data; name=\"age\"\r\n\r\n23\r\n--XYZ--\r\n"
        );
    }

    #[test]
    fn rejects_line_breaks_in_names() {
        let mut assembler = MultipartAssembler::with_boundary("XYZ");
        let err = assembler.write_field("bad\r\nname", "v").unwrap_err();
        assert!(matches!(err, MultipartError::InvalidFieldName(_)));
    }

    #[tokio::test]
    async fn quotes_in_names_are_escaped() {
        let mut assembler = MultipartAssembler::with_boundary("B");
        assembler.write_field("a\"b", "v").unwrap();
        assert!(text(assembler.finish()).await.contains("name=\"a\\\"b\""));
    }

    #[tokio::test]
    async fn file_part_uses_base_name() {
        let path = temp_path("base");
        tokio::fs::write(&path, b"file contents").await.unwrap();

        let mut assembler = MultipartAssembler::with_boundary("B");
        assembler.write_file("upload", &path).await.unwrap();
        assembler.write_field("after", "x").unwrap();
        let body = text(assembler.finish()).await;
        let _ = tokio::fs::remove_file(&path).await;

        let filename = path.file_name().unwrap().to_string_lossy();
        assert!(body.contains(&format!(
            "Content-Disposition: form-data; name=\"upload\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\nfile contents\r\n--B\r\n"
        )));
        assert!(body.ends_with("name=\"after\"\r\n\r\nx\r\n--B--\r\n"));
        assert!(!body.contains(&*std::env::temp_dir().to_string_lossy()));
    }

    #[tokio::test]
    async fn file_contents_are_read_at_send_time() {
        let path = temp_path("lazy");
        let size = CHUNK_SIZE * 3 + 17;
        tokio::fs::write(&path, vec![b'a'; size]).await.unwrap();

        let mut assembler = MultipartAssembler::with_boundary("B");
        assembler.write_file("big", &path).await.unwrap();
        let form = assembler.finish();

        // Rewrite the same file in place; an eager copy would still hold 'a'.
        tokio::fs::write(&path, vec![b'b'; size]).await.unwrap();
        let body = text(form).await;
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(body.matches('b').count(), size + 1);
        assert!(!body.contains("aaaa"));
    }

    #[tokio::test]
    async fn missing_file_aborts_assembly() {
        let files: FormFiles = HashMap::from([("file".into(), PathBuf::from("/nonexistent/path"))]);
        let err = assemble(&FormFields::new(), &files).await.unwrap_err();
        match err {
            MultipartError::Open { path, source } => {
                assert_eq!(path, PathBuf::from("/nonexistent/path"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn directory_is_rejected_up_front() {
        let mut assembler = MultipartAssembler::with_boundary("B");
        let err = assembler.write_file("dir", &std::env::temp_dir()).await.unwrap_err();
        assert!(matches!(err, MultipartError::NotAFile(_)));
    }

    #[tokio::test]
    async fn empty_value_list_writes_one_empty_field() {
        let fields: FormFields = HashMap::from([
            ("flag".into(), vec![]),
            ("tag".into(), vec!["a".into(), "b".into()]),
        ]);
        let body = text(assemble(&fields, &FormFiles::new()).await.unwrap()).await;

        assert_eq!(body.matches("name=\"flag\"\r\n\r\n\r\n").count(), 1);
        assert_eq!(body.matches("name=\"tag\"").count(), 2);
        assert!(body.ends_with("--\r\n"));
    }
}
