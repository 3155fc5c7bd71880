//! Archive packing and unpacking.
//!
//! The server exchanges metadata as base64-encoded zip blobs. These
//! helpers map between those blobs and a local file tree; the interesting
//! logic — which entry paths a logical artifact needs — lives in
//! `forcepack-manifest`, not here.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use tracing::debug;
use zip::write::SimpleFileOptions;

use crate::error::{Error, ErrorKind, Result};

/// Hook applied to each extracted file's contents before it is written.
///
/// Receives the entry path and the raw bytes; returns the bytes to write.
pub type PerFileHook<'a> = &'a mut dyn FnMut(&Path, Vec<u8>) -> Vec<u8>;

/// Unpack a base64-encoded zip blob under `dest_dir`.
///
/// Directory entries are skipped; parent directories are created as
/// needed. Entry paths are validated so a crafted archive cannot escape
/// `dest_dir`. Returns the number of files written.
pub fn unzip(dest_dir: &Path, base64_blob: &str, per_file: Option<PerFileHook<'_>>) -> Result<usize> {
    let bytes = general_purpose::STANDARD.decode(base64_blob.trim())?;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut hook = per_file;
    let mut written = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let relative: PathBuf = entry.enclosed_name().ok_or_else(|| {
            Error::new(ErrorKind::Archive(format!(
                "unsafe entry path {:?}",
                entry.name()
            )))
        })?;

        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents)?;
        if let Some(hook) = hook.as_mut() {
            contents = hook(&relative, contents);
        }

        let target = dest_dir.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, contents)?;
        written += 1;
    }

    debug!(files = written, "unpacked archive");
    Ok(written)
}

/// Pack the given files (paths relative to `base_dir`) into a
/// base64-encoded zip blob.
///
/// Entry names keep the relative paths verbatim, which is exactly the
/// layout `deploy` expects.
pub fn make_zip(base_dir: &Path, files: &[String]) -> Result<String> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for file in files {
            let contents = std::fs::read(base_dir.join(file))?;
            writer.start_file(file.as_str(), options)?;
            writer.write_all(&contents)?;
        }
        writer.finish()?;
    }

    debug!(files = files.len(), "packed archive");
    Ok(general_purpose::STANDARD.encode(buffer.into_inner()))
}
