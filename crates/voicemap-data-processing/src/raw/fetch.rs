use std::path::{Path, PathBuf};

use futures::StreamExt;
use futures::future::try_join_all;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use super::DatasetKind;
use crate::Result;

/// Downloads `kinds` from `base_url` into `dest`, blocking the caller.
///
/// Spins up its own runtime, so it must not be called from inside one; use
/// [`download_datasets_async`] there.
#[instrument(name = "Download datasets", skip_all, level = "info")]
pub fn download_datasets(base_url: &str, dest: &Path, kinds: &[DatasetKind]) -> Result<Vec<PathBuf>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(download_datasets_async(base_url, dest, kinds))
}

pub async fn download_datasets_async(
    base_url: &str,
    dest: &Path,
    kinds: &[DatasetKind],
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dest).await?;
    let client = Client::new();
    let base_url = base_url.trim_end_matches('/');

    try_join_all(kinds.iter().map(|kind| {
        let url = format!("{base_url}/{}", kind.file_name());
        let target = dest.join(kind.file_name());
        let client = &client;
        async move { download_to_file(client, &url, &target).await }
    }))
    .await
}

async fn download_to_file(client: &Client, url: &str, target: &Path) -> Result<PathBuf> {
    info!(url, "Starting download");
    let response = client.get(url).send().await?.error_for_status()?;

    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("█░"));
    }
    pb.set_message(format!(
        "Downloading {}",
        url.split('/').next_back().unwrap_or(url)
    ));

    // Written next to the target and renamed once complete.
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let temp_file = NamedTempFile::new_in(parent)?;
    let mut dest_file = tokio::fs::File::create(temp_file.path()).await?;

    let mut stream = response.bytes_stream();
    while let Some(item) = stream.next().await {
        let chunk = item?;
        dest_file.write_all(&chunk).await?;
        pb.inc(chunk.len() as u64);
    }
    dest_file.flush().await?;
    drop(dest_file);
    pb.finish_and_clear();

    temp_file.persist(target).map_err(|e| e.error)?;
    info!(path = %target.display(), "Download complete");
    Ok(target.to_path_buf())
}
