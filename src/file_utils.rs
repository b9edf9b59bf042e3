use anyhow::{Result, Context};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @const: UTF-8 byte-order mark
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decoded subtitle content with its encoding signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleText {
    /// File content without the byte-order mark
    pub text: String,

    /// Whether the file started with a UTF-8 byte-order mark
    pub has_bom: bool,
}

impl SubtitleText {
    // @creates: Content without a byte-order mark
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), has_bom: false }
    }

    /// Decode raw bytes, stripping a leading UTF-8 byte-order mark
    pub fn decode(bytes: Vec<u8>) -> io::Result<Self> {
        let has_bom = bytes.starts_with(UTF8_BOM);
        let bytes = if has_bom { bytes[UTF8_BOM.len()..].to_vec() } else { bytes };

        let text = String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(Self { text, has_bom })
    }

    /// Encode back to bytes, re-emitting the byte-order mark if one was read
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.text.len() + UTF8_BOM.len());
        if self.has_bom {
            bytes.extend_from_slice(UTF8_BOM);
        }
        bytes.extend_from_slice(self.text.as_bytes());
        bytes
    }
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Output path for a rewritten subtitle (same base name, flattened)
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
    ) -> PathBuf {
        let file_name = input_file.as_ref().file_name().unwrap_or_default();
        output_dir.as_ref().join(file_name)
    }

    // @generates: Backup path next to a file, e.g. fonts_config.json -> fonts_config_backup.json
    pub fn backup_path<P: AsRef<Path>>(path: P) -> PathBuf {
        let path = path.as_ref();
        let stem = path.file_stem().unwrap_or_default().to_string_lossy();

        let mut backup_name = format!("{}_backup", stem);
        if let Some(ext) = path.extension() {
            backup_name.push('.');
            backup_name.push_str(&ext.to_string_lossy());
        }

        path.with_file_name(backup_name)
    }

    /// Find regular files whose name ends with `suffix`, sorted by name at each level.
    ///
    /// Only the immediate contents of `dir` are searched unless `recursive` is set.
    /// The suffix match is case-sensitive.
    pub fn find_files<P: AsRef<Path>>(dir: P, suffix: &str, recursive: bool) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        let mut walker = WalkDir::new(dir.as_ref()).min_depth(1).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && entry.file_name().to_string_lossy().ends_with(suffix) {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }

    /// Read a subtitle file, stripping a leading byte-order mark
    pub fn read_subtitle<P: AsRef<Path>>(path: P) -> io::Result<SubtitleText> {
        let bytes = fs::read(path)?;
        SubtitleText::decode(bytes)
    }

    /// Write a subtitle file, re-emitting the byte-order mark if the source had one
    pub fn write_subtitle<P: AsRef<Path>>(path: P, content: &SubtitleText) -> io::Result<()> {
        fs::write(path, content.encode())
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }

        // Ensure the target directory exists
        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to)?;

        Ok(())
    }
}
