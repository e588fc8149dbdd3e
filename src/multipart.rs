use uuid::Uuid;

const CRLF: &[u8] = b"\r\n";

/// In-memory `multipart/form-data` body.
///
/// Each part opens with `--<boundary>`, the body closes with
/// `--<boundary>--`, and every line ends in CRLF.
#[derive(Debug, Clone)]
pub struct MultipartFormData {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartFormData {
    /// Start a body with a fresh random boundary
    pub fn new() -> Self {
        Self::with_boundary(Uuid::new_v4().to_string())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Append a plain form field
    pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.open_part();
        self.line(format!("Content-Disposition: form-data; name=\"{}\"", name).as_bytes());
        self.line(b"");
        self.line(value.as_bytes());
        self
    }

    /// Append a file part carrying raw bytes
    pub fn file(&mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> &mut Self {
        self.open_part();
        self.line(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
                name, filename
            )
            .as_bytes(),
        );
        self.line(format!("Content-Type: {}", content_type).as_bytes());
        self.line(b"");
        self.line(data);
        self
    }

    /// Close the body and return it
    pub fn finish(mut self) -> Vec<u8> {
        let footer = format!("--{}--", self.boundary);
        self.line(footer.as_bytes());
        self.body
    }

    fn open_part(&mut self) {
        let header = format!("--{}", self.boundary);
        self.line(header.as_bytes());
    }

    fn line(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(CRLF);
    }
}

impl Default for MultipartFormData {
    fn default() -> Self {
        Self::new()
    }
}
