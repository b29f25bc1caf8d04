//! Paired on-disk artifacts: the vector blob and the metadata sidecar.
//!
//! Both files live in one directory. The blob header carries the SHA-256 of
//! the sidecar bytes it was written with, so a crash that leaves a new file
//! next to an old one is detected on the next load instead of silently
//! mis-attributing rows.
//!
//! Write order: both temp files written and fsynced, sidecar renamed, blob
//! renamed, directory fsynced.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::error::{IndexError, IndexResult, PersistenceError};
use super::metadata::EntryMetadata;
use crate::fingerprint::digest_bytes;
use crate::vector::{FlatIndex, VectorDimension, VectorIndex};

/// File name of the vector blob.
pub const BLOB_FILE: &str = "vectors.kbvi";
/// File name of the metadata sidecar.
pub const SIDECAR_FILE: &str = "metadata.json";

const MAGIC: &[u8; 4] = b"KBVI";
const FORMAT_VERSION: u16 = 1;

/// Locations of the two artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub dir: PathBuf,
    pub blob: PathBuf,
    pub sidecar: PathBuf,
}

impl IndexPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            blob: dir.join(BLOB_FILE),
            sidecar: dir.join(SIDECAR_FILE),
            dir,
        }
    }

    fn corrupt(&self, reason: impl Into<String>) -> IndexError {
        IndexError::IndexCorrupt {
            path: self.dir.clone(),
            reason: reason.into(),
        }
    }
}

/// Decoded blob header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHeader {
    pub version: u16,
    pub dimension: usize,
    pub count: usize,
    pub model_id: String,
    pub metadata_digest: [u8; 32],
}

/// Everything restored by a successful load.
#[derive(Debug)]
pub struct PersistedIndex {
    pub vectors: FlatIndex,
    pub metadata: Vec<EntryMetadata>,
}

/// Serialize vectors into the blob format.
pub fn encode_blob(
    index: &FlatIndex,
    model_id: &str,
    metadata_digest: [u8; 32],
) -> Result<Vec<u8>, PersistenceError> {
    let too_large = |what: &str| PersistenceError::Encode(format!("{what} does not fit the header"));

    let dimension = u32::try_from(index.dimension().get()).map_err(|_| too_large("dimension"))?;
    let count = u32::try_from(index.count()).map_err(|_| too_large("row count"))?;
    let model_len = u16::try_from(model_id.len()).map_err(|_| too_large("model id"))?;

    let mut out = Vec::with_capacity(4 + 2 + 4 + 4 + 2 + model_id.len() + 32 + index.raw().len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&dimension.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&model_len.to_le_bytes());
    out.extend_from_slice(model_id.as_bytes());
    out.extend_from_slice(&metadata_digest);
    for value in index.raw() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| format!("blob truncated at byte {}", self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], String> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

/// Parse a blob into its header and row data.
pub fn decode_blob(bytes: &[u8]) -> Result<(BlobHeader, Vec<f32>), String> {
    let mut reader = Reader { bytes, pos: 0 };

    if reader.take(4)? != MAGIC {
        return Err("bad magic".to_string());
    }
    let version = u16::from_le_bytes(reader.array()?);
    if version != FORMAT_VERSION {
        return Err(format!("unsupported format version {version}"));
    }
    let dimension = u32::from_le_bytes(reader.array()?) as usize;
    let count = u32::from_le_bytes(reader.array()?) as usize;
    let model_len = u16::from_le_bytes(reader.array()?) as usize;
    let model_id = std::str::from_utf8(reader.take(model_len)?)
        .map_err(|_| "model id is not UTF-8".to_string())?
        .to_string();
    let metadata_digest = reader.array::<32>()?;

    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| "header sizes overflow".to_string())?;
    let body = &bytes[reader.pos..];
    if body.len() != expected {
        return Err(format!(
            "header declares {count} rows of {dimension} but body has {} bytes",
            body.len()
        ));
    }

    let data = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok((
        BlobHeader {
            version,
            dimension,
            count,
            model_id,
            metadata_digest,
        },
        data,
    ))
}

/// Atomically replace the pair on disk.
pub fn save_pair(
    paths: &IndexPaths,
    index: &FlatIndex,
    model_id: &str,
    metadata: &[EntryMetadata],
) -> Result<(), PersistenceError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| PersistenceError::Io { path, source }
    };

    std::fs::create_dir_all(&paths.dir).map_err(io_err(&paths.dir))?;

    let sidecar_bytes = serde_json::to_vec_pretty(metadata)?;
    let blob_bytes = encode_blob(index, model_id, digest_bytes(&sidecar_bytes))?;

    let sidecar_tmp = write_temp(&paths.dir, &sidecar_bytes).map_err(io_err(&paths.sidecar))?;
    let blob_tmp = write_temp(&paths.dir, &blob_bytes).map_err(io_err(&paths.blob))?;

    sidecar_tmp
        .persist(&paths.sidecar)
        .map_err(|e| io_err(&paths.sidecar)(e.error))?;
    blob_tmp
        .persist(&paths.blob)
        .map_err(|e| io_err(&paths.blob)(e.error))?;

    sync_dir(&paths.dir).map_err(io_err(&paths.dir))?;

    tracing::debug!(
        target: "persist",
        "saved {} rows ({} blob bytes, {} sidecar bytes) to {}",
        index.count(),
        blob_bytes.len(),
        sidecar_bytes.len(),
        paths.dir.display()
    );
    Ok(())
}

fn write_temp(dir: &Path, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Load the pair, checking that the two artifacts belong together and match
/// the embedder.
///
/// Returns `Ok(None)` when neither artifact exists.
pub fn load_pair(
    paths: &IndexPaths,
    dimension: VectorDimension,
    model_id: &str,
) -> IndexResult<Option<PersistedIndex>> {
    let blob = read_optional(&paths.blob)?;
    let sidecar = read_optional(&paths.sidecar)?;

    let (blob, sidecar) = match (blob, sidecar) {
        (None, None) => return Ok(None),
        (Some(_), None) => return Err(paths.corrupt(format!("{SIDECAR_FILE} is missing"))),
        (None, Some(_)) => return Err(paths.corrupt(format!("{BLOB_FILE} is missing"))),
        (Some(blob), Some(sidecar)) => (blob, sidecar),
    };

    let (header, data) = decode_blob(&blob).map_err(|reason| paths.corrupt(reason))?;

    if header.metadata_digest != digest_bytes(&sidecar) {
        return Err(paths.corrupt("metadata digest does not match the vector blob"));
    }

    let metadata: Vec<EntryMetadata> = serde_json::from_slice(&sidecar)
        .map_err(|e| paths.corrupt(format!("unreadable {SIDECAR_FILE}: {e}")))?;

    if metadata.len() != header.count {
        return Err(paths.corrupt(format!(
            "{} metadata records for {} vectors",
            metadata.len(),
            header.count
        )));
    }

    if header.dimension != dimension.get() || header.model_id != model_id {
        return Err(IndexError::IncompatibleIndex {
            path: paths.dir.clone(),
            expected: format!("{model_id} ({dimension} dims)"),
            found: format!("{} ({} dims)", header.model_id, header.dimension),
        });
    }

    let vectors =
        FlatIndex::from_raw(dimension, data).map_err(|e| paths.corrupt(e.to_string()))?;

    tracing::debug!(
        target: "persist",
        "loaded {} rows from {}",
        vectors.count(),
        paths.dir.display()
    );

    Ok(Some(PersistedIndex {
        vectors,
        metadata,
    }))
}

fn read_optional(path: &Path) -> IndexResult<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(IndexError::Io(e)),
    }
}
