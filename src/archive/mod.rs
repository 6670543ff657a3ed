//! # The `.arcx` Container Format
//!
//! A container is a single file with three sections:
//!
//! 1. **Header**: `[magic "ARCX"][format version u16][entry count u32][manifest length u64]`.
//! 2. **Manifest**: container metadata (creation time, tool version, byte
//!    totals) followed by one record per file, sorted by relative path:
//!    `{path (length-prefixed UTF-8), category tag, level, original size,
//!    compressed size, CRC32 of the original bytes, payload offset, payload
//!    length}`. Offsets are relative to the payload section start.
//! 3. **Payload**: the compressed blocks, concatenated in manifest order.
//!
//! All integers are little-endian. Because the manifest is path-sorted and
//! each block is written in manifest order, a given input set produces a
//! byte-identical container no matter how many workers compressed it.
//!
//! Invariants checked on open, before anything is extracted: the declared
//! entry count matches the manifest, every payload range lies inside the
//! payload section, ranges tile it exactly (no overlap, no gap), paths are
//! unique, relative, and free of `..` segments.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::FileCategory;
use crate::error::ArcxError;

/// Magic bytes opening every container.
pub const MAGIC: &[u8; 4] = b"ARCX";
/// Current container format version.
pub const FORMAT_VERSION: u16 = 1;
/// Fixed byte length of the header section.
pub const HEADER_LEN: u64 = 4 + 2 + 4 + 8;

/// One file's record inside the manifest.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Relative archive path, forward slashes, unique within the container.
    pub path: String,
    pub category: FileCategory,
    pub level: i32,
    pub original_size: u64,
    pub compressed_size: u64,
    /// CRC32 over the *original* bytes, for post-extraction verification.
    pub checksum: u32,
    /// Offset of this file's block, relative to the payload section start.
    pub offset: u64,
    /// Byte length of this file's block.
    pub length: u64,
}

/// Parsed manifest plus container-level metadata.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ArchiveManifest {
    pub format_version: u16,
    /// Unix timestamp of archive creation; zero for deterministic builds.
    pub created: i64,
    pub tool: String,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
    /// Entries sorted by `path`.
    pub entries: Vec<ManifestEntry>,
}

/// Fan-in value handed to the writer: one successfully compressed file.
#[derive(Clone, Debug)]
pub struct CompressedFile {
    pub path: String,
    pub category: FileCategory,
    pub level: i32,
    pub original_size: u64,
    pub checksum: u32,
    pub data: Vec<u8>,
}

// --- little-endian read helpers ---------------------------------------------

fn read_u16(r: &mut impl Read) -> io::Result<u16> {
    let mut b = [0u8; 2];
    r.read_exact(&mut b)?;
    Ok(u16::from_le_bytes(b))
}

fn read_u32(r: &mut impl Read) -> io::Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_u64(r: &mut impl Read) -> io::Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

fn read_i64(r: &mut impl Read) -> io::Result<i64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(i64::from_le_bytes(b))
}

fn read_string(r: &mut impl Read) -> io::Result<String> {
    let len = read_u16(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn put_string(buf: &mut Vec<u8>, s: &str) -> Result<(), ArcxError> {
    let bytes = s.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(ArcxError::Structure(format!(
            "path longer than {} bytes: '{}'",
            u16::MAX,
            s
        )));
    }
    buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

// --- writing -----------------------------------------------------------------

/// Sort, lay out, and persist a container from a set of compressed files.
///
/// Files are sorted by relative path before anything touches disk, which
/// makes the output independent of the order compression completed. Any I/O
/// failure here (unwritable destination, disk full) is fatal: a partial
/// container is never left behind as a success.
pub fn write_container(
    out_path: &Path,
    mut files: Vec<CompressedFile>,
    created: i64,
) -> Result<ArchiveManifest, ArcxError> {
    files.sort_by(|a, b| a.path.cmp(&b.path));
    for pair in files.windows(2) {
        if pair[0].path == pair[1].path {
            return Err(ArcxError::DuplicateEntry(pair[0].path.clone()));
        }
    }

    let mut entries = Vec::with_capacity(files.len());
    let mut offset = 0u64;
    let mut total_original = 0u64;
    for file in &files {
        let length = file.data.len() as u64;
        entries.push(ManifestEntry {
            path: file.path.clone(),
            category: file.category,
            level: file.level,
            original_size: file.original_size,
            compressed_size: length,
            checksum: file.checksum,
            offset,
            length,
        });
        offset += length;
        total_original += file.original_size;
    }

    let manifest = ArchiveManifest {
        format_version: FORMAT_VERSION,
        created,
        tool: concat!("arcx/", env!("CARGO_PKG_VERSION")).to_string(),
        total_original_size: total_original,
        total_compressed_size: offset,
        entries,
    };

    let manifest_buf = encode_manifest(&manifest)?;

    let map_io = |e: io::Error| ArcxError::Io {
        source: e,
        path: out_path.to_path_buf(),
    };
    let out_file = File::create(out_path).map_err(map_io)?;
    let mut w = BufWriter::new(out_file);
    w.write_all(MAGIC).map_err(map_io)?;
    w.write_all(&FORMAT_VERSION.to_le_bytes()).map_err(map_io)?;
    w.write_all(&(manifest.entries.len() as u32).to_le_bytes())
        .map_err(map_io)?;
    w.write_all(&(manifest_buf.len() as u64).to_le_bytes())
        .map_err(map_io)?;
    w.write_all(&manifest_buf).map_err(map_io)?;
    for file in &files {
        w.write_all(&file.data).map_err(map_io)?;
    }
    w.flush().map_err(map_io)?;

    Ok(manifest)
}

fn encode_manifest(manifest: &ArchiveManifest) -> Result<Vec<u8>, ArcxError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&manifest.created.to_le_bytes());
    put_string(&mut buf, &manifest.tool)?;
    buf.extend_from_slice(&manifest.total_original_size.to_le_bytes());
    buf.extend_from_slice(&manifest.total_compressed_size.to_le_bytes());
    for entry in &manifest.entries {
        put_string(&mut buf, &entry.path)?;
        buf.push(entry.category.tag());
        buf.push(entry.level as u8);
        buf.extend_from_slice(&entry.original_size.to_le_bytes());
        buf.extend_from_slice(&entry.compressed_size.to_le_bytes());
        buf.extend_from_slice(&entry.checksum.to_le_bytes());
        buf.extend_from_slice(&entry.offset.to_le_bytes());
        buf.extend_from_slice(&entry.length.to_le_bytes());
    }
    Ok(buf)
}

// --- reading -----------------------------------------------------------------

/// An opened, structurally validated container.
///
/// Opening parses the header and manifest and checks every structural
/// invariant; a container that fails any check is rejected before a single
/// output file is written.
#[derive(Debug)]
pub struct ArchiveReader {
    path: PathBuf,
    pub manifest: ArchiveManifest,
    payload_offset: u64,
    payload_len: u64,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self, ArcxError> {
        let map_io = |e: io::Error| ArcxError::Io {
            source: e,
            path: path.to_path_buf(),
        };
        let mut file = File::open(path).map_err(map_io)?;
        let file_len = file.metadata().map_err(map_io)?.len();
        if file_len < HEADER_LEN {
            return Err(ArcxError::Structure("file shorter than header".into()));
        }

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).map_err(map_io)?;
        if &magic != MAGIC {
            return Err(ArcxError::Structure("bad magic, not an arcx container".into()));
        }
        let version = read_u16(&mut file).map_err(map_io)?;
        if version != FORMAT_VERSION {
            return Err(ArcxError::Version {
                found: version,
                supported: FORMAT_VERSION,
            });
        }
        let entry_count = read_u32(&mut file).map_err(map_io)? as usize;
        let manifest_len = read_u64(&mut file).map_err(map_io)?;
        let manifest_end = HEADER_LEN.checked_add(manifest_len).ok_or_else(|| {
            ArcxError::Structure("manifest length overflows the file size".into())
        })?;
        if manifest_end > file_len {
            return Err(ArcxError::Structure("manifest extends past end of file".into()));
        }

        let mut manifest_buf = vec![0u8; manifest_len as usize];
        file.read_exact(&mut manifest_buf).map_err(map_io)?;
        let manifest = decode_manifest(&manifest_buf, entry_count, version)?;

        let payload_offset = HEADER_LEN + manifest_len;
        let payload_len = file_len - payload_offset;
        validate_layout(&manifest, payload_len)?;

        Ok(ArchiveReader {
            path: path.to_path_buf(),
            manifest,
            payload_offset,
            payload_len,
        })
    }

    pub fn archive_path(&self) -> &Path {
        &self.path
    }

    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Absolute file offset of an entry's payload block.
    pub fn block_offset(&self, entry: &ManifestEntry) -> u64 {
        self.payload_offset + entry.offset
    }

    /// Read one entry's payload block through the given handle. Workers open
    /// their own handle so reads never contend on a shared file position.
    pub fn read_block(&self, file: &mut File, entry: &ManifestEntry) -> io::Result<Vec<u8>> {
        file.seek(SeekFrom::Start(self.block_offset(entry)))?;
        let mut buf = vec![0u8; entry.length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

fn decode_manifest(
    buf: &[u8],
    entry_count: usize,
    version: u16,
) -> Result<ArchiveManifest, ArcxError> {
    let structure = |what: &str| ArcxError::Structure(format!("manifest truncated reading {what}"));
    let mut r = io::Cursor::new(buf);

    let created = read_i64(&mut r).map_err(|_| structure("creation time"))?;
    let tool = read_string(&mut r).map_err(|_| structure("tool version"))?;
    let total_original_size = read_u64(&mut r).map_err(|_| structure("total original size"))?;
    let total_compressed_size = read_u64(&mut r).map_err(|_| structure("total compressed size"))?;

    let mut entries = Vec::with_capacity(entry_count.min(1 << 20));
    for i in 0..entry_count {
        let path = read_string(&mut r)
            .map_err(|_| ArcxError::Structure(format!("manifest truncated at entry {i}")))?;
        let mut tag_level = [0u8; 2];
        r.read_exact(&mut tag_level)
            .map_err(|_| ArcxError::Structure(format!("manifest truncated at entry {i}")))?;
        let category = FileCategory::from_tag(tag_level[0]).ok_or_else(|| {
            ArcxError::Structure(format!("unknown category tag {} at entry {i}", tag_level[0]))
        })?;
        let level = tag_level[1] as i32;
        let original_size = read_u64(&mut r)
            .map_err(|_| ArcxError::Structure(format!("manifest truncated at entry {i}")))?;
        let compressed_size = read_u64(&mut r)
            .map_err(|_| ArcxError::Structure(format!("manifest truncated at entry {i}")))?;
        let checksum = read_u32(&mut r)
            .map_err(|_| ArcxError::Structure(format!("manifest truncated at entry {i}")))?;
        let offset = read_u64(&mut r)
            .map_err(|_| ArcxError::Structure(format!("manifest truncated at entry {i}")))?;
        let length = read_u64(&mut r)
            .map_err(|_| ArcxError::Structure(format!("manifest truncated at entry {i}")))?;
        entries.push(ManifestEntry {
            path,
            category,
            level,
            original_size,
            compressed_size,
            checksum,
            offset,
            length,
        });
    }
    if (r.position() as usize) < buf.len() {
        return Err(ArcxError::Structure(
            "trailing bytes after last manifest entry".into(),
        ));
    }

    Ok(ArchiveManifest {
        format_version: version,
        created,
        tool,
        total_original_size,
        total_compressed_size,
        entries,
    })
}

/// Check the payload-layout invariants: in-bounds, non-overlapping ranges
/// that tile the payload section exactly, with safe, unique, sorted paths.
fn validate_layout(manifest: &ArchiveManifest, payload_len: u64) -> Result<(), ArcxError> {
    for entry in &manifest.entries {
        validate_entry_path(&entry.path)?;
        if entry.length != entry.compressed_size {
            return Err(ArcxError::Structure(format!(
                "entry '{}': payload length {} disagrees with compressed size {}",
                entry.path, entry.length, entry.compressed_size
            )));
        }
        let end = entry.offset.checked_add(entry.length).ok_or_else(|| {
            ArcxError::Structure(format!("entry '{}': offset overflow", entry.path))
        })?;
        if end > payload_len {
            return Err(ArcxError::Structure(format!(
                "entry '{}': payload range {}..{} exceeds payload size {}",
                entry.path, entry.offset, end, payload_len
            )));
        }
    }

    for pair in manifest.entries.windows(2) {
        if pair[0].path >= pair[1].path {
            return Err(if pair[0].path == pair[1].path {
                ArcxError::DuplicateEntry(pair[0].path.clone())
            } else {
                ArcxError::Structure("manifest entries not sorted by path".into())
            });
        }
    }

    // Ranges must tile the payload exactly.
    let mut by_offset: Vec<&ManifestEntry> = manifest.entries.iter().collect();
    by_offset.sort_by_key(|e| e.offset);
    let mut cursor = 0u64;
    for entry in by_offset {
        if entry.offset != cursor {
            return Err(ArcxError::Structure(format!(
                "entry '{}': payload ranges overlap or leave a gap at offset {}",
                entry.path, entry.offset
            )));
        }
        cursor += entry.length;
    }
    if cursor != payload_len {
        return Err(ArcxError::Structure(format!(
            "payload section is {} bytes but entries cover {}",
            payload_len, cursor
        )));
    }
    Ok(())
}

fn validate_entry_path(path: &str) -> Result<(), ArcxError> {
    if path.is_empty() {
        return Err(ArcxError::Structure("empty entry path".into()));
    }
    if path.starts_with('/') {
        return Err(ArcxError::Structure(format!("absolute entry path '{path}'")));
    }
    if path.split('/').any(|seg| seg == "..") {
        return Err(ArcxError::Structure(format!(
            "entry path '{path}' escapes the output root"
        )));
    }
    Ok(())
}
