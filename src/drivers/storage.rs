// Directory storage - native filesystem backend
//
// Fronts a local directory tree as the console's storage: directories are
// browseable, and files with the `.rvp` extension are reported as programs.
// A FAT32-over-SPI backend would implement the same trait on hardware.

use std::fs::{File, ReadDir};
use std::io::Read;
use std::path::PathBuf;

use super::{StorageDriver, StorageEntry};

/// Extension that marks a loadable program file.
const PROGRAM_EXTENSION: &str = "rvp";

/// Storage rooted at a host directory.
pub struct DirectoryStorage {
    root: PathBuf,
    current_directory: Option<ReadDir>,
    current_file: Option<File>,
    current_file_size: u32,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryStorage {
            root: root.into(),
            current_directory: None,
            current_file: None,
            current_file_size: 0,
        }
    }

    fn absolute_path(&self, relative_path: &str) -> PathBuf {
        let mut path = self.root.clone();
        for component in relative_path.split('/').filter(|part| !part.is_empty()) {
            path.push(component);
        }
        path
    }
}

impl StorageDriver for DirectoryStorage {
    fn open_directory(&mut self, directory_path: &str) -> bool {
        self.close_directory();
        self.current_directory = std::fs::read_dir(self.absolute_path(directory_path)).ok();
        self.current_directory.is_some()
    }

    fn read_directory(&mut self) -> Option<StorageEntry> {
        let directory = self.current_directory.as_mut()?;

        for entry in directory.by_ref().flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            let name = entry.file_name().to_string_lossy().into_owned();

            if file_type.is_dir() {
                return Some(StorageEntry {
                    name,
                    is_directory: true,
                    is_program: false,
                });
            }

            if file_type.is_file() {
                let is_program = entry
                    .path()
                    .extension()
                    .map(|extension| extension.eq_ignore_ascii_case(PROGRAM_EXTENSION))
                    .unwrap_or(false);

                return Some(StorageEntry {
                    name,
                    is_directory: false,
                    is_program,
                });
            }
        }

        None
    }

    fn close_directory(&mut self) {
        self.current_directory = None;
    }

    fn open_file(&mut self, file_path: &str) -> bool {
        self.close_file();

        let path = self.absolute_path(file_path);
        let Ok(file) = File::open(&path) else {
            return false;
        };

        self.current_file_size = file
            .metadata()
            .map(|metadata| metadata.len() as u32)
            .unwrap_or(0);
        self.current_file = Some(file);

        true
    }

    fn file_size(&self) -> u32 {
        self.current_file_size
    }

    fn read_file(&mut self, buffer: &mut [u8]) -> bool {
        let Some(file) = self.current_file.as_mut() else {
            return false;
        };

        file.read_exact(buffer).is_ok()
    }

    fn close_file(&mut self) {
        self.current_file = None;
        self.current_file_size = 0;
    }
}
