use crate::api::ApiClient;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio_stream::StreamExt;

const UPLOAD_CHUNK: usize = 64 * 1024;

/// One submit: metadata plus the resolved local files. Discarded afterwards.
pub struct UploadRequest {
    pub description: String,
    pub virtual_folder: String,
    pub tags: Vec<String>,
    pub files: Vec<LocalFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    /// Name sent to the server; for folder uploads this keeps the path
    /// relative to the selected directory's parent, so the server can file
    /// each entry under the matching subfolder.
    pub remote_name: String,
}

/// Split a free-text tag string on commas, trimming each tag and dropping
/// empties.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve a path to the files it uploads: a file uploads itself, a
/// directory uploads every regular file under it recursively.
pub fn collect_files(path: &Path) -> anyhow::Result<Vec<LocalFile>> {
    if path.is_dir() {
        let root_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "folder".to_string());

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry.path().strip_prefix(path)?;
            let remote_name = format!(
                "{}/{}",
                root_name,
                relative.to_string_lossy().replace('\\', "/")
            );
            files.push(LocalFile {
                path: entry.path().to_path_buf(),
                remote_name,
            });
        }
        files.sort_by(|a, b| a.remote_name.cmp(&b.remote_name));

        if files.is_empty() {
            anyhow::bail!("no files under {}", path.display());
        }
        Ok(files)
    } else if path.is_file() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        Ok(vec![LocalFile {
            path: path.to_path_buf(),
            remote_name: name,
        }])
    } else {
        anyhow::bail!("no such file or directory: {}", path.display())
    }
}

pub fn total_bytes(files: &[LocalFile]) -> u64 {
    files
        .iter()
        .map(|f| std::fs::metadata(&f.path).map(|m| m.len()).unwrap_or(0))
        .sum()
}

/// Single-shot submit: one multipart body carrying every file plus the form
/// fields, with a byte-accurate progress bar fed as the body streams out.
pub async fn run(api: &ApiClient, request: &UploadRequest) -> anyhow::Result<()> {
    let bar = ProgressBar::new(total_bytes(&request.files));
    bar.set_style(ProgressStyle::with_template(
        "{bar:40} {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
    )?);

    let mut form = reqwest::multipart::Form::new()
        .text("description", request.description.clone())
        .text("virtfolder", request.virtual_folder.clone())
        .text("tags", request.tags.join(", "));
    for file in &request.files {
        form = form.part("file", progress_part(file, &bar)?);
    }

    let result = api.upload(form).await;
    bar.finish_and_clear();
    result?;
    Ok(())
}

fn progress_part(file: &LocalFile, bar: &ProgressBar) -> anyhow::Result<reqwest::multipart::Part> {
    let data = std::fs::read(&file.path)?;
    let length = data.len() as u64;

    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = data
        .chunks(UPLOAD_CHUNK)
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();

    let bar = bar.clone();
    let stream = tokio_stream::iter(chunks).map(move |chunk| {
        if let Ok(bytes) = &chunk {
            bar.inc(bytes.len() as u64);
        }
        chunk
    });

    let part = reqwest::multipart::Part::stream_with_length(
        reqwest::Body::wrap_stream(stream),
        length,
    )
    .file_name(file.remote_name.clone())
    .mime_str("application/octet-stream")?;

    Ok(part)
}
