use crate::error::{DeployError, Result};
use bytes::Bytes;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Object key the bundle is uploaded under.
pub const BUNDLE_KEY: &str = "deployment.zip";
/// Name of the single entry inside the bundle.
pub const INDEX_ENTRY: &str = "index.html";

/// Read the HTML file and package it as a deployable zip bundle.
pub async fn package_index(path: &Path) -> Result<Bytes> {
    if !tokio::fs::try_exists(path).await? {
        return Err(DeployError::IndexNotFound(path.to_path_buf()));
    }
    let html = tokio::fs::read(path).await?;
    Ok(zip_index(&html)?)
}

fn zip_index(html: &[u8]) -> std::result::Result<Bytes, ZipError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));
    writer.start_file(INDEX_ENTRY, options)?;
    writer.write_all(html)?;
    let cursor = writer.finish()?;
    Ok(Bytes::from(cursor.into_inner()))
}
