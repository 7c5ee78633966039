//! Remote template download and extraction.
//!
//! # Design
//! - The archive is streamed to disk under the name of the final response URL segment.
//! - The archive kind is validated before the body is read so unsupported downloads fail fast.
//! - Extraction runs on the blocking pool and must yield exactly one new top-level entry.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use pathmap_fsops::{ArchiveKind, extract_single_root};
use reqwest::{Client, StatusCode, Url};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{ProbeError, ProbeResult};

/// Directory, relative to the working directory, where retained templates are kept.
pub const TEMPLATE_DIR_NAME: &str = ".path_templates";

/// Download the archive at `url` into `base_dir` and extract it to a single source root.
///
/// # Errors
///
/// Returns [`ProbeError::FetchStatus`] for non-200 responses,
/// [`ProbeError::InvalidInput`] when the final URL has no file name,
/// [`ProbeError::Http`]/[`ProbeError::Io`] when the body cannot be stored, and
/// [`ProbeError::FsOps`] when the archive is unsupported or does not extract to
/// exactly one top-level entry.
pub async fn materialize(client: &Client, url: &Url, base_dir: &Path) -> ProbeResult<PathBuf> {
    let archive = download(client, url, base_dir).await?;
    info!(archive = %archive.display(), "template archive downloaded");

    let root = tokio::task::spawn_blocking(move || extract_single_root(&archive))
        .await
        .map_err(|source| ProbeError::join("materialize.extract", source))?
        .map_err(|source| ProbeError::fsops("materialize.extract", source))?;
    info!(root = %root.display(), "template extracted");
    Ok(root)
}

/// Stream the resource at `url` into `base_dir`, returning the written file path.
///
/// # Errors
///
/// See [`materialize`].
pub async fn download(client: &Client, url: &Url, base_dir: &Path) -> ProbeResult<PathBuf> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| ProbeError::http("materialize.download", url, source))?;

    if response.status() != StatusCode::OK {
        return Err(ProbeError::FetchStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let final_url = response.url().clone();
    let file_name = archive_file_name(&final_url)?;
    let destination = base_dir.join(&file_name);
    ArchiveKind::from_path(&destination)
        .map_err(|source| ProbeError::fsops("materialize.archive_kind", source))?;

    tokio::fs::create_dir_all(base_dir)
        .await
        .map_err(|source| ProbeError::io("materialize.create_dir", base_dir, source))?;
    let mut file = File::create(&destination)
        .await
        .map_err(|source| ProbeError::io("materialize.create_file", &destination, source))?;

    let mut written = 0_usize;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|source| ProbeError::http("materialize.read_body", &final_url, source))?;
        file.write_all(&chunk)
            .await
            .map_err(|source| ProbeError::io("materialize.write", &destination, source))?;
        written += chunk.len();
    }
    file.flush()
        .await
        .map_err(|source| ProbeError::io("materialize.flush", &destination, source))?;

    debug!(url = %final_url, bytes = written, path = %destination.display(), "archive stored");
    Ok(destination)
}

fn archive_file_name(url: &Url) -> ProbeResult<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProbeError::InvalidInput {
            field: "remote",
            reason: "missing_file_name",
            value: Some(url.to_string()),
        })
}
