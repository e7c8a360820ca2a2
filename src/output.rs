//! Line-oriented record output.
//!
//! One record per line, `#` for comments. Every line is flushed as soon as
//! it is written so an interrupted run keeps what it already found.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{HarvestError, Result};
use crate::models::Record;
use crate::utils::sanitize_field;

pub const COMMENT_PREFIX: char = '#';

/// Comment body written when a listing is refused by an anti-bot check.
pub fn challenge_comment(topic: &str, url: &str) -> String {
    format!(
        "CHALLENGE_DETECTED|{}|{}|",
        sanitize_field(topic),
        sanitize_field(url)
    )
}

/// Comment body written when a listing cannot be fetched for other reasons.
pub fn error_comment(url: &str, reason: &str) -> String {
    format!(
        "ERROR_FETCHING|{}|{}",
        sanitize_field(url),
        sanitize_field(reason)
    )
}

/// Appends records and comments to a file.
pub struct RecordWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    records: usize,
}

impl RecordWriter {
    /// Open the output, truncating unless `append` is set.
    ///
    /// Fails with [`HarvestError::OutputWrite`] before anything is fetched.
    pub fn create(path: impl AsRef<Path>, append: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| HarvestError::OutputWrite {
                path: path.clone(),
                source,
            })?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options
            .open(&path)
            .map_err(|source| HarvestError::OutputWrite {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written by this writer (comments excluded).
    pub fn records_written(&self) -> usize {
        self.records
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.write_line(&record.to_line())?;
        self.records += 1;
        Ok(())
    }

    /// Write `# <body>`.
    pub fn write_comment(&mut self, body: &str) -> Result<()> {
        self.write_line(&format!("{} {}", COMMENT_PREFIX, body))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let path = &self.path;
        let wrap = |source| HarvestError::OutputWrite {
            path: path.clone(),
            source,
        };
        writeln!(self.writer, "{}", line).map_err(wrap)?;
        self.writer.flush().map_err(wrap)
    }
}

/// Reads records back, skipping comments, blanks and malformed lines.
pub struct RecordReader;

impl RecordReader {
    pub fn read_path(path: impl AsRef<Path>) -> Result<Vec<Record>> {
        let file = File::open(path.as_ref())?;
        Self::read(BufReader::new(file))
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for line in reader.lines() {
            if let Some(record) = Record::from_line(&line?) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Comment lines only, without the leading `# `.
    pub fn read_comments(path: impl AsRef<Path>) -> Result<Vec<String>> {
        let file = File::open(path.as_ref())?;
        let mut comments = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Some(body) = line.strip_prefix(COMMENT_PREFIX) {
                comments.push(body.trim_start().to_string());
            }
        }
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> Record {
        Record::new(url, "Neurology", "A title", "Doe A", "2020-01-01")
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut writer = RecordWriter::create(&path, false).unwrap();
        writer.write_record(&record("https://a/1")).unwrap();
        writer
            .write_comment(&challenge_comment("Neurology", "https://a/search?x"))
            .unwrap();
        writer.write_record(&record("https://a/2")).unwrap();
        assert_eq!(writer.records_written(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.lines().nth(1),
            Some("# CHALLENGE_DETECTED|Neurology|https://a/search?x|")
        );

        let records = RecordReader::read_path(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].url, "https://a/2");

        let comments = RecordReader::read_comments(&path).unwrap();
        assert_eq!(comments, vec!["CHALLENGE_DETECTED|Neurology|https://a/search?x|"]);
    }

    #[test]
    fn test_truncate_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        RecordWriter::create(&path, false)
            .unwrap()
            .write_record(&record("https://a/1"))
            .unwrap();
        RecordWriter::create(&path, true)
            .unwrap()
            .write_record(&record("https://a/2"))
            .unwrap();
        assert_eq!(RecordReader::read_path(&path).unwrap().len(), 2);

        RecordWriter::create(&path, false).unwrap();
        assert!(RecordReader::read_path(&path).unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_path_fails_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = RecordWriter::create(blocker.join("out.txt"), false).err().unwrap();
        assert!(matches!(err, HarvestError::OutputWrite { .. }));
    }

    #[test]
    fn test_error_comment_is_single_line() {
        let body = error_comment("https://a/search", "HTTP 500\nInternal | Error");
        assert_eq!(body, "ERROR_FETCHING|https://a/search|HTTP 500 Internal - Error");
    }
}
