use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

enum Entry {
    File {
        name: String,
        content: Vec<u8>,
        mode: Option<u32>,
    },
    Directory(String),
}

/// Builds zip archives in memory, entries in insertion order.
///
/// ```rust,no_run
/// use bundlekeeper::test_utils::ArchiveBuilder;
///
/// let bytes = ArchiveBuilder::new()
///     .file_with_mode("a/b.txt", b"hello", 0o644)
///     .directory("c/")
///     .build();
/// ```
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
}

impl ArchiveBuilder {
    /// Empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with the writer's default mode.
    pub fn file(mut self, name: &str, content: &[u8]) -> Self {
        self.entries.push(Entry::File {
            name: name.to_string(),
            content: content.to_vec(),
            mode: None,
        });
        self
    }

    /// Add a file with explicit Unix permission bits.
    pub fn file_with_mode(mut self, name: &str, content: &[u8], mode: u32) -> Self {
        self.entries.push(Entry::File {
            name: name.to_string(),
            content: content.to_vec(),
            mode: Some(mode),
        });
        self
    }

    /// Add a directory entry. `name` should end in `/`.
    pub fn directory(mut self, name: &str) -> Self {
        self.entries.push(Entry::Directory(name.to_string()));
        self
    }

    /// Serialize the archive.
    ///
    /// # Panics
    ///
    /// Panics if the zip writer rejects an entry.
    pub fn build(self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let base = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for entry in self.entries {
            match entry {
                Entry::File {
                    name,
                    content,
                    mode,
                } => {
                    let options = match mode {
                        Some(mode) => base.unix_permissions(mode),
                        None => base,
                    };
                    writer.start_file(name, options).expect("start zip entry");
                    writer.write_all(&content).expect("write zip entry");
                }
                Entry::Directory(name) => {
                    writer.add_directory(name, base).expect("add zip directory");
                }
            }
        }

        writer.finish().expect("finish zip archive").into_inner()
    }

    /// Serialize the archive to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the archive cannot be built or written.
    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.build()).expect("write zip archive");
    }
}
