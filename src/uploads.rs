use std::path::{Component, Path, PathBuf};

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use diesel::prelude::*;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::constants::MAX_FILE_SIZE;
use crate::errors::AppError;
use crate::handler::{SiteDB, WithDB};
use crate::media_util::{self, SVG_MIME, WEBP_MIME};
use crate::models::NewUpload;

/// Where uploaded files land on disk, keyed by category below the root.
#[derive(Clone, Debug)]
pub struct UploadStore {
    root: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Blog,
    Site,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Blog => "blog",
            Category::Site => "site",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Blog
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    pub url: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Collision-resistant filename: base36 of the current unix millis plus a
/// random suffix, with the extension the pipeline decided on.
fn generate_filename(extension: &str) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("{}{}.{}", to_base36(millis), suffix, extension)
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates, transcodes, and persists one uploaded image: file bytes on
    /// disk plus a metadata row, or neither. SVG is stored untouched;
    /// everything else comes out as WebP.
    pub async fn ingest_upload(
        &self,
        db: &SiteDB,
        contents: Bytes,
        declared_mime: &str,
        original_name: &str,
        category: Category,
    ) -> Result<IngestResult, AppError> {
        if contents.len() > MAX_FILE_SIZE {
            return Err(AppError::PayloadTooLarge);
        }

        let essence = media_util::mime_essence(declared_mime)
            .ok_or(AppError::UnsupportedMediaType)?;
        if !media_util::is_allowed_image_type(&essence) {
            return Err(AppError::UnsupportedMediaType);
        }

        let (processed, out_mime, extension, width, height) = if essence == SVG_MIME {
            (contents.to_vec(), SVG_MIME, "svg", None, None)
        } else {
            let raw = contents.to_vec();
            let transcoded = tokio_rayon::spawn(move || media_util::transcode(&raw))
                .await
                .map_err(|e| {
                    warn!("transcode failed: {}", e);
                    AppError::Validation("Unable to process image".into())
                })?;
            (
                transcoded.bytes,
                WEBP_MIME,
                "webp",
                Some(transcoded.width),
                Some(transcoded.height),
            )
        };

        let filename = generate_filename(extension);
        let relative_url = format!("/uploads/{}/{}", category.as_str(), filename);
        let dir = self.root.join(category.as_str());
        let absolute = dir.join(&filename);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
        tokio::fs::write(&absolute, &processed)
            .await
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

        let upload_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let row = NewUpload {
            id: &upload_id,
            filename: &filename,
            original: original_name,
            path: &relative_url,
            mime_type: out_mime,
            size: processed.len() as i32,
            width,
            height,
            created_at: &now,
        };

        let inserted = db.run_txn(|conn| {
            use crate::schema::uploads;
            diesel::insert_into(uploads::table).values(&row).execute(conn)
        });

        if let Err(e) = inserted {
            // The file must not outlive a failed metadata insert.
            if let Err(rm) = tokio::fs::remove_file(&absolute).await {
                error!("orphan cleanup failed for {:?}: {}", absolute, rm);
            }
            return Err(e);
        }

        info!("stored upload {} as {}", original_name, relative_url);

        Ok(IngestResult {
            url: relative_url,
            id: upload_id,
            width,
            height,
        })
    }

    /// Fetches a remote image and pushes it through the same pipeline. The
    /// response Content-Type is the declared mime; the last path segment of
    /// the URL stands in for the original filename.
    pub async fn ingest_from_url(
        &self,
        db: &SiteDB,
        client: &reqwest::Client,
        remote_url: &str,
        category: Category,
    ) -> Result<IngestResult, AppError> {
        let parsed = Url::parse(remote_url)
            .map_err(|_| AppError::Validation("Valid image URL is required".into()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AppError::Validation("Valid image URL is required".into()));
        }

        let mut resp = client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| AppError::UpstreamFetch(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::UpstreamFetch(resp.status().to_string()));
        }

        // Refuse before pulling a single body byte when the server already
        // admits the payload is too big.
        if let Some(declared_len) = resp.content_length() {
            if declared_len > MAX_FILE_SIZE as u64 {
                return Err(AppError::PayloadTooLarge);
            }
        }

        let declared_mime = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let name = remote_name(&parsed);

        // Streamed with a running total so a lying or chunked response can
        // never buffer more than the cap in memory.
        let mut contents = BytesMut::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| AppError::UpstreamFetch(e.to_string()))?
        {
            if contents.len() + chunk.len() > MAX_FILE_SIZE {
                return Err(AppError::PayloadTooLarge);
            }
            contents.extend_from_slice(&chunk);
        }

        self.ingest_upload(db, contents.freeze(), &declared_mime, &name, category)
            .await
    }

    /// Resolves a serving request to an absolute path, or refuses. Segments
    /// may not be `..` or absolute, and the canonicalized result must still
    /// live under the uploads root.
    pub async fn resolve_for_serving(&self, segments: &[&str]) -> Result<PathBuf, AppError> {
        if segments.is_empty() {
            return Err(AppError::NotFound);
        }
        if !segments_are_safe(segments) {
            return Err(AppError::Forbidden);
        }

        let mut candidate = self.root.clone();
        for segment in segments {
            candidate.push(segment);
        }

        let root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|_| AppError::NotFound)?;
        let resolved = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| AppError::NotFound)?;

        if !resolved.starts_with(&root) {
            return Err(AppError::Forbidden);
        }

        Ok(resolved)
    }
}

/// Lexical screen applied before any filesystem access: no `..`, no empty
/// or absolute components, nothing that escapes its own segment.
pub fn segments_are_safe(segments: &[&str]) -> bool {
    segments.iter().all(|segment| {
        if segment.is_empty() || *segment == ".." {
            return false;
        }
        let path = Path::new(segment);
        path.components()
            .all(|c| matches!(c, Component::Normal(_)))
    })
}

fn remote_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
        .to_string()
}

pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "webp" => "image/webp",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::Arc;

    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::SqliteConnection;

    fn test_db() -> Arc<SiteDB> {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        {
            let mut conn = pool.get().unwrap();
            crate::apply_schema(&mut conn).unwrap();
        }
        Arc::new(SiteDB::new(Arc::new(pool)))
    }

    fn temp_store() -> (UploadStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("linkbio-uploads-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        (UploadStore::new(&dir), dir)
    }

    fn upload_count(db: &SiteDB) -> i64 {
        use crate::schema::uploads::dsl::*;
        use diesel::prelude::*;
        let mut conn = db.dbconn().unwrap();
        uploads.count().get_result(&mut conn).unwrap()
    }

    #[tokio::test]
    async fn oversized_upload_leaves_no_trace() {
        let db = test_db();
        let (store, dir) = temp_store();

        let big = Bytes::from(vec![0u8; MAX_FILE_SIZE + 1]);
        let err = store
            .ingest_upload(&db, big, "image/jpeg", "big.jpg", Category::Blog)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge));
        assert_eq!(upload_count(&db), 0);
        assert!(!dir.join("blog").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn disallowed_mime_is_rejected_up_front() {
        let db = test_db();
        let (store, dir) = temp_store();

        let err = store
            .ingest_upload(&db, Bytes::from_static(b"%PDF-"), "application/pdf", "doc.pdf", Category::Blog)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedMediaType));
        assert_eq!(upload_count(&db), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn svg_is_stored_byte_for_byte() {
        let db = test_db();
        let (store, dir) = temp_store();

        let svg = Bytes::from_static(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>");
        let result = store
            .ingest_upload(&db, svg.clone(), "image/svg+xml", "logo.svg", Category::Site)
            .await
            .unwrap();

        assert!(result.url.starts_with("/uploads/site/"));
        assert!(result.url.ends_with(".svg"));
        assert_eq!(result.width, None);
        assert_eq!(result.height, None);
        assert_eq!(upload_count(&db), 1);

        let filename = result.url.rsplit('/').next().unwrap();
        let stored = std::fs::read(dir.join("site").join(filename)).unwrap();
        assert_eq!(stored, svg.to_vec());

        {
            use crate::schema::uploads::dsl::*;
            use diesel::prelude::*;
            let mut conn = db.dbconn().unwrap();
            let stored_mime: String = uploads
                .filter(id.eq(&result.id))
                .select(mime_type)
                .first(&mut conn)
                .unwrap();
            assert_eq!(stored_mime, SVG_MIME);
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn failed_metadata_insert_removes_the_written_file() {
        use diesel::connection::SimpleConnection;

        let db = test_db();
        let (store, dir) = temp_store();

        // With the table gone the insert must fail after the file write.
        {
            let mut conn = db.dbconn().unwrap();
            conn.batch_execute("DROP TABLE uploads").unwrap();
        }

        let svg = Bytes::from_static(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>");
        let err = store
            .ingest_upload(&db, svg, "image/svg+xml", "logo.svg", Category::Site)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        let leftovers: Vec<_> = std::fs::read_dir(dir.join("site")).unwrap().collect();
        assert!(leftovers.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    /// Serves `response` verbatim to the first connection and hangs up. The
    /// client is expected to abandon oversized bodies mid-stream, so write
    /// failures are ignored.
    async fn one_shot_http_server(response: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(&response).await;
        });
        format!("http://{}/image.jpg", addr)
    }

    #[tokio::test]
    async fn remote_import_rejects_oversized_content_length_before_download() {
        let db = test_db();
        let (store, dir) = temp_store();

        // Honest Content-Length over the cap, but only a sliver of body:
        // the client has to give up on the headers alone.
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            MAX_FILE_SIZE + 1
        )
        .into_bytes();
        response.extend_from_slice(&[0u8; 1024]);
        let url = one_shot_http_server(response).await;

        let client = reqwest::Client::new();
        let err = store
            .ingest_from_url(&db, &client, &url, Category::Blog)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge));
        assert_eq!(upload_count(&db), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn remote_import_aborts_a_chunked_body_at_the_cap() {
        let db = test_db();
        let (store, dir) = temp_store();

        // Chunked transfer declares no length up front; the running total
        // has to pull the plug.
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nTransfer-Encoding: chunked\r\n\r\n"
            .to_vec();
        let chunk = vec![0u8; 1024 * 1024];
        for _ in 0..8 {
            response.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
            response.extend_from_slice(&chunk);
            response.extend_from_slice(b"\r\n");
        }
        response.extend_from_slice(b"0\r\n\r\n");
        let url = one_shot_http_server(response).await;

        let client = reqwest::Client::new();
        let err = store
            .ingest_from_url(&db, &client, &url, Category::Blog)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge));
        assert_eq!(upload_count(&db), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn filenames_carry_the_extension_and_differ() {
        let a = generate_filename("webp");
        let b = generate_filename("webp");
        assert!(a.ends_with(".webp"));
        assert_ne!(a, b);
    }

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn dotdot_segments_are_unsafe() {
        assert!(!segments_are_safe(&["..", "etc", "passwd"]));
        assert!(!segments_are_safe(&["blog", ".."]));
    }

    #[test]
    fn absolute_and_nested_segments_are_unsafe() {
        assert!(!segments_are_safe(&["/etc/passwd"]));
        assert!(!segments_are_safe(&["blog/../../etc"]));
        assert!(!segments_are_safe(&[""]));
    }

    #[test]
    fn plain_segments_are_safe() {
        assert!(segments_are_safe(&["blog", "k2x9a1b2c3.webp"]));
    }

    #[test]
    fn remote_name_takes_the_last_path_segment() {
        let url = Url::parse("https://cdn.example.com/a/b/photo.png?w=100").unwrap();
        assert_eq!(remote_name(&url), "photo.png");

        let bare = Url::parse("https://cdn.example.com/").unwrap();
        assert_eq!(remote_name(&bare), "image");
    }

    #[test]
    fn extension_mapping_defaults_to_octet_stream() {
        assert_eq!(content_type_for_extension("WEBP"), "image/webp");
        assert_eq!(content_type_for_extension("bin"), "application/octet-stream");
    }

    #[tokio::test]
    async fn traversal_never_escapes_the_root() {
        let dir = std::env::temp_dir().join(format!("linkbio-serve-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(dir.join("blog")).await.unwrap();
        tokio::fs::write(dir.join("blog/ok.webp"), b"x").await.unwrap();
        let store = UploadStore::new(&dir);

        assert!(store.resolve_for_serving(&["blog", "ok.webp"]).await.is_ok());

        let err = store
            .resolve_for_serving(&["..", "..", "etc", "passwd"])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let err = store.resolve_for_serving(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
