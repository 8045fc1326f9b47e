use std::fs;
use std::path::{Path, PathBuf};

use compio::io::AsyncWriteAtExt;
use snafu::{ResultExt, Snafu};
use tracing::debug;
use url::Url;

use crate::entries::File;
use crate::fetch::{FetchOperation, data_url};

/// Turns a file's declared content into fetch operations and carries them out.
pub trait Fetcher {
    /// Operations for `file`, contents first, then each append in declared order.
    fn prepare_fetches(&self, file: &File) -> Result<Vec<FetchOperation>, FetchError>;

    async fn perform_fetch(&self, op: &FetchOperation) -> Result<(), FetchError>;
}

/// Fetches content that is available without a network: inline `data:` URLs
/// and `file:` URLs on the provisioning host.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

impl LocalFetcher {
    async fn read_source(&self, source: &str) -> Result<Vec<u8>, FetchError> {
        if source.is_empty() {
            return Ok(Vec::new());
        }

        let url = Url::parse(source).context(InvalidSourceSnafu { source_url: source })?;
        match url.scheme() {
            "data" => data_url::decode(source),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| FetchError::InvalidFileUrl {
                        source_url: source.to_string(),
                    })?;
                debug!(path = %path.display(), "reading local source");
                compio::fs::read(&path).await.context(ReadSnafu { path })
            }
            scheme => UnsupportedSchemeSnafu { scheme }.fail(),
        }
    }
}

impl Fetcher for LocalFetcher {
    fn prepare_fetches(&self, file: &File) -> Result<Vec<FetchOperation>, FetchError> {
        let target = file.node.path.clone();
        let mut ops = Vec::with_capacity(file.append.len() + 1);

        if file.contents.source.is_some() {
            ops.push(FetchOperation::from_resource(
                target.clone(),
                &file.contents,
                false,
            )?);
        }
        for resource in &file.append {
            ops.push(FetchOperation::from_resource(target.clone(), resource, true)?);
        }

        Ok(ops)
    }

    async fn perform_fetch(&self, op: &FetchOperation) -> Result<(), FetchError> {
        let raw = self.read_source(&op.source).await?;
        let data = op.compression.decompress(raw)?;
        if let Some(verification) = &op.verification {
            verification.verify(&data)?;
        }

        if op.append {
            append_to(&op.target, data).await
        } else {
            replace(&op.target, data).await
        }
    }
}

fn temporary_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.rootseed-tmp"))
}

/// Writes next to the target and renames over it, so readers never see a
/// half-written file.
async fn replace(target: &Path, data: Vec<u8>) -> Result<(), FetchError> {
    let temporary = temporary_sibling(target);

    let written = compio::fs::write(&temporary, data).await;
    written.0.context(WriteSnafu {
        path: temporary.clone(),
    })?;

    if let Err(e) = fs::rename(&temporary, target) {
        let _ = fs::remove_file(&temporary);
        return Err(e).context(WriteSnafu {
            path: target.to_path_buf(),
        });
    }
    Ok(())
}

async fn append_to(target: &Path, data: Vec<u8>) -> Result<(), FetchError> {
    let mut file = compio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .open(target)
        .await
        .context(WriteSnafu {
            path: target.to_path_buf(),
        })?;
    let offset = file
        .metadata()
        .await
        .context(WriteSnafu {
            path: target.to_path_buf(),
        })?
        .len();

    let written = file.write_all_at(data, offset).await;
    written.0.context(WriteSnafu {
        path: target.to_path_buf(),
    })
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FetchError {
    #[snafu(display("Invalid content source '{}'", source_url))]
    InvalidSource {
        source_url: String,
        source: url::ParseError,
    },
    #[snafu(display("Content source '{}' is not a local file path", source_url))]
    InvalidFileUrl { source_url: String },
    #[snafu(display("Fetching '{}' URLs is not supported", scheme))]
    UnsupportedScheme { scheme: String },
    #[snafu(display("Malformed data URL '{}'", url))]
    MalformedDataUrl { url: String },
    #[snafu(display("Data URL payload is not valid base64"))]
    InvalidBase64 { source: base64::DecodeError },
    #[snafu(display("Failed to read {}", path.display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Unsupported compression '{}'", compression))]
    UnsupportedCompression { compression: String },
    #[snafu(display("Failed to decompress content"))]
    DecompressError { source: std::io::Error },
    #[snafu(display("Unsupported hash function '{}'", function))]
    UnsupportedHash { function: String },
    #[snafu(display("Malformed verification hash '{}'", hash))]
    MalformedHash { hash: String },
    #[snafu(display("Content hash mismatch: expected {}, got {}", expected, actual))]
    HashMismatch { expected: String, actual: String },
    #[snafu(display("Failed to write {}", path.display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}
