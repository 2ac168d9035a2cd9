use anyhow::{Result, Context, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use log::warn;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::language_utils;

// @module: File and directory utilities

const SUBTITLE_EXTENSION: &str = "srt";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    /// Trailing language segment of a file name: `EN` in `movie.EN.srt`
    pub fn language_segment<P: AsRef<Path>>(path: P) -> Option<String> {
        let stem = path.as_ref().file_stem()?.to_string_lossy().to_string();
        let (base, segment) = stem.rsplit_once('.')?;
        (!base.is_empty() && language_utils::is_language_segment(segment)).then(|| segment.to_string())
    }

    /// Output path for a translated subtitle.
    ///
    /// A trailing language segment (`movie.en.srt`) is replaced by the target
    /// code; otherwise the target code is inserted before the extension
    /// (`movie.srt` -> `movie.sv.srt`). The file stays in the input's folder.
    pub fn generate_output_path<P: AsRef<Path>>(input_file: P, target_language: &str) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy().to_string();

        let base = match Self::language_segment(input_file) {
            Some(segment) => stem[..stem.len() - segment.len() - 1].to_string(),
            None => stem,
        };

        let extension = input_file
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_else(|| SUBTITLE_EXTENSION.to_string());

        input_file.with_file_name(format!("{}.{}.{}", base, target_language, extension))
    }

    /// Find subtitle files under a directory, sorted for a stable order
    pub fn find_subtitle_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && Self::is_subtitle_file(path) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Expand a mix of files and folders into the list of subtitle files to translate
    pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                files.extend(Self::find_subtitle_files(path)?);
            } else if path.is_file() {
                files.push(path.clone());
            } else {
                return Err(anyhow!("Input path does not exist: {}", path.display()));
            }
        }
        Ok(files)
    }

    // @checks: .srt extension, case-insensitive
    pub fn is_subtitle_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(SUBTITLE_EXTENSION))
    }

    /// Read a subtitle file, decoding invalid UTF-8 lossily
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> std::io::Result<String> {
        let bytes = fs::read(&path)?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(content),
            Err(e) => {
                warn!("{} is not valid UTF-8, decoding lossily", path.as_ref().display());
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }

    /// Write a file atomically: the content goes to a temporary file in the
    /// same directory which is then renamed over the destination.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> std::io::Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
