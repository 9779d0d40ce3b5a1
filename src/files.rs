//! Static file responder.
//!
//! Request paths map straight onto files under the configured root. There is
//! no index or manifest; `/` means `/index.html`. Files are streamed in
//! [`CHUNK_SIZE`] pieces through one reused buffer, so memory use does not
//! depend on file size.

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use hyper::body::{Body, Frame};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tracing::{debug, info, warn};

use crate::response::Response;
use crate::status::Status;

/// Bytes read from disk per chunk.
pub const CHUNK_SIZE: usize = 512;

/// Extension → content type. Matched case-insensitively against the path suffix.
const MIME_TYPES: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".htm",  "text/html"),
    (".css",  "text/css"),
    (".js",   "application/javascript"),
    (".json", "application/json"),
    (".png",  "image/png"),
    (".jpg",  "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif",  "image/gif"),
    (".svg",  "image/svg+xml"),
    (".ico",  "image/x-icon"),
    (".txt",  "text/plain"),
    (".pdf",  "application/pdf"),
    (".zip",  "application/zip"),
];

const DEFAULT_MIME: &str = "text/plain";

/// Content type for `path`, by extension. Defaults to `text/plain`.
pub fn mime_type(path: &str) -> &'static str {
    let Some(dot) = path.rfind('.') else {
        return DEFAULT_MIME;
    };
    if dot == 0 {
        return DEFAULT_MIME;
    }
    let ext = &path[dot..];
    MIME_TYPES.iter()
        .find(|(e, _)| e.eq_ignore_ascii_case(ext))
        .map_or(DEFAULT_MIME, |&(_, mime)| mime)
}

/// Joins `root` and `path`, adding a `/` only when neither side has one.
///
/// No canonicalization happens here; see [`StaticFiles::respond`] for the
/// traversal check.
pub fn join(root: &str, path: &str) -> String {
    let mut out = String::with_capacity(root.len() + path.len() + 1);
    out.push_str(root);
    if !path.is_empty() {
        if !root.is_empty() && !root.ends_with('/') && !path.starts_with('/') {
            out.push('/');
        }
        out.push_str(path);
    }
    out
}

/// Any `..` segment means the path tries to leave the root.
fn escapes_root(path: &str) -> bool {
    path.split(['/', '\\']).any(|seg| seg == "..")
}

/// Serves files from a directory.
#[derive(Clone, Debug)]
pub struct StaticFiles {
    root: String,
}

impl StaticFiles {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Answers a request for `path`: the file's contents with a guessed
    /// content type, or `404 Not Found` if it cannot be opened.
    pub async fn respond(&self, path: &str) -> Response {
        if escapes_root(path) {
            warn!(path, "rejecting path outside file root");
            return Response::status(Status::NotFound);
        }

        let rel = if path == "/" { "/index.html" } else { path };
        let full = PathBuf::from(join(&self.root, rel));

        let meta = match tokio::fs::metadata(&full).await {
            Ok(m) if m.is_file() => m,
            _ => {
                info!(path, "file not found");
                return Response::status(Status::NotFound);
            }
        };

        let file = match File::open(&full).await {
            Ok(f) => f,
            Err(e) => {
                warn!(file = %full.display(), "failed to open file: {e}");
                return Response::status(Status::NotFound);
            }
        };

        info!(path, bytes = meta.len(), "serving file");
        Response::stream(mime_type(rel), FileBody::new(file, rel.to_owned()))
    }
}

// ── FileBody ──────────────────────────────────────────────────────────────────

/// Streams a file as a sequence of data frames.
///
/// No length is advertised, so hyper frames it with chunked transfer encoding
/// and writes the zero-length terminal chunk once the file is exhausted. If
/// the connection fails mid-transfer hyper drops the body; that is logged and
/// nothing is retried.
struct FileBody {
    file: File,
    buf: Box<[u8; CHUNK_SIZE]>,
    path: String,
    sent: u64,
    done: bool,
}

impl FileBody {
    fn new(file: File, path: String) -> Self {
        Self { file, buf: Box::new([0; CHUNK_SIZE]), path, sent: 0, done: false }
    }
}

impl Body for FileBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let mut read = ReadBuf::new(&mut this.buf[..]);
        match Pin::new(&mut this.file).poll_read(cx, &mut read) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Ok(())) if read.filled().is_empty() => {
                this.done = true;
                debug!(path = %this.path, bytes = this.sent, "file sent");
                Poll::Ready(None)
            }
            Poll::Ready(Ok(())) => {
                let chunk = Bytes::copy_from_slice(read.filled());
                this.sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.done
    }
}

impl Drop for FileBody {
    fn drop(&mut self) {
        if !self.done {
            warn!(path = %self.path, bytes = self.sent, "file transfer aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_by_extension() {
        assert_eq!(mime_type("/index.html"), "text/html");
        assert_eq!(mime_type("/app.js"), "application/javascript");
        assert_eq!(mime_type("/data.json"), "application/json");
        assert_eq!(mime_type("/logo.SVG"), "image/svg+xml");
        assert_eq!(mime_type("/Photo.JPEG"), "image/jpeg");
    }

    #[test]
    fn mime_defaults_to_plain_text() {
        assert_eq!(mime_type("/README"), "text/plain");
        assert_eq!(mime_type("/archive.tar.gz"), "text/plain");
        assert_eq!(mime_type(".hidden"), "text/plain");
    }

    #[test]
    fn join_inserts_single_separator() {
        assert_eq!(join("/spiffs", "index.html"), "/spiffs/index.html");
        assert_eq!(join("/spiffs", "/index.html"), "/spiffs/index.html");
        assert_eq!(join("/spiffs/", "index.html"), "/spiffs/index.html");
        assert_eq!(join("/spiffs", ""), "/spiffs");
    }

    #[test]
    fn traversal_is_detected() {
        assert!(escapes_root("/../etc/passwd"));
        assert!(escapes_root("/a/../../b"));
        assert!(!escapes_root("/a..b/c"));
        assert!(!escapes_root("/index.html"));
    }

    #[tokio::test]
    async fn serves_file_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let content: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        std::fs::write(dir.path().join("blob.zip"), &content).unwrap();

        let files = StaticFiles::new(dir.path().to_str().unwrap());
        let res = files.respond("/blob.zip").await;

        assert_eq!(res.status_code(), 200);
        assert_eq!(res.header("content-type"), Some("application/zip"));
        assert_eq!(&res.into_bytes().await[..], &content[..]);
    }

    #[tokio::test]
    async fn root_serves_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>portal</h1>").unwrap();

        let files = StaticFiles::new(dir.path().to_str().unwrap());
        let res = files.respond("/").await;

        assert_eq!(res.header("content-type"), Some("text/html"));
        assert_eq!(&res.into_bytes().await[..], b"<h1>portal</h1>");
    }

    #[tokio::test]
    async fn json_content_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();

        let files = StaticFiles::new(dir.path().to_str().unwrap());
        let res = files.respond("/config.json").await;

        assert_eq!(res.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();

        let files = StaticFiles::new(dir.path().to_str().unwrap());
        let res = files.respond("/nope.css").await;

        assert_eq!(res.status_code(), 404);
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();

        let files = StaticFiles::new(dir.path().to_str().unwrap());

        assert_eq!(files.respond("/assets").await.status_code(), 404);
    }

    #[tokio::test]
    async fn traversal_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("www");
        std::fs::create_dir(&inner).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "key").unwrap();

        let files = StaticFiles::new(inner.to_str().unwrap());

        assert_eq!(files.respond("/../secret.txt").await.status_code(), 404);
    }
}
