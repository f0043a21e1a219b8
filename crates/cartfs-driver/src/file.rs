use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::alloc::FrameAddr;
use crate::error::{DriverError, Result};

/// Stable identifier of a file.
///
/// Handles are issued in order starting at 0 and survive close/reopen of
/// the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FileHandle(u16);

impl FileHandle {
    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u16 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file known to the driver, open or not.
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub name: String,
    pub handle: FileHandle,
    pub length: usize,
    pub open: bool,
    pub position: usize,
    /// Physical frame for each frame index of the file, in order.
    pub frames: Vec<FrameAddr>,
}

impl OpenFile {
    fn new(name: &str, handle: FileHandle) -> Self {
        Self {
            name: name.to_string(),
            handle,
            length: 0,
            open: true,
            position: 0,
            frames: Vec::new(),
        }
    }
}

/// Every file seen since power-on, indexed by handle.
#[derive(Debug)]
pub struct FileTable {
    files: Vec<OpenFile>,
    by_name: HashMap<String, FileHandle>,
    max_files: usize,
}

impl FileTable {
    pub fn new(max_files: usize) -> Self {
        Self {
            files: Vec::new(),
            by_name: HashMap::new(),
            max_files,
        }
    }

    /// Open `name`, creating it if it has never been seen.
    ///
    /// Reopening keeps the handle, length and frames and rewinds to 0.
    pub fn open(&mut self, name: &str) -> Result<FileHandle> {
        if let Some(&handle) = self.by_name.get(name) {
            let file = &mut self.files[handle.index()];
            if file.open {
                return Err(DriverError::AlreadyOpen(name.to_string()));
            }
            file.open = true;
            file.position = 0;
            debug!(name, %handle, length = file.length, "reopened file");
            return Ok(handle);
        }

        if self.files.len() >= self.max_files {
            return Err(DriverError::TooManyFiles(self.max_files));
        }
        let raw = u16::try_from(self.files.len())
            .map_err(|_| DriverError::TooManyFiles(self.files.len()))?;
        let handle = FileHandle(raw);
        self.files.push(OpenFile::new(name, handle));
        self.by_name.insert(name.to_string(), handle);
        debug!(name, %handle, "created file");
        Ok(handle)
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        let file = self.get_open_mut(handle)?;
        file.open = false;
        debug!(name = %file.name, %handle, "closed file");
        Ok(())
    }

    /// Mark every file closed. Returns how many were open.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for file in self.files.iter_mut().filter(|file| file.open) {
            file.open = false;
            closed += 1;
        }
        closed
    }

    /// Any issued handle, open or closed.
    pub fn get(&self, handle: FileHandle) -> Result<&OpenFile> {
        self.files
            .get(handle.index())
            .ok_or(DriverError::InvalidHandle(handle))
    }

    /// An issued handle that is currently open.
    pub fn get_open(&self, handle: FileHandle) -> Result<&OpenFile> {
        let file = self.get(handle)?;
        if !file.open {
            return Err(DriverError::FileNotOpen(file.name.clone()));
        }
        Ok(file)
    }

    pub fn get_open_mut(&mut self, handle: FileHandle) -> Result<&mut OpenFile> {
        let file = self
            .files
            .get_mut(handle.index())
            .ok_or(DriverError::InvalidHandle(handle))?;
        if !file.open {
            return Err(DriverError::FileNotOpen(file.name.clone()));
        }
        Ok(file)
    }

    /// Physical frame behind frame index `index` of the file, if allocated.
    pub fn frame_at(&self, handle: FileHandle, index: usize) -> Option<FrameAddr> {
        self.files
            .get(handle.index())
            .and_then(|file| file.frames.get(index).copied())
    }

    pub fn handle_of(&self, name: &str) -> Option<FileHandle> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpenFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_sequential() {
        let mut table = FileTable::new(8);
        assert_eq!(table.open("a").unwrap(), FileHandle(0));
        assert_eq!(table.open("b").unwrap(), FileHandle(1));
        assert_eq!(table.handle_of("b"), Some(FileHandle(1)));
        assert_eq!(table.handle_of("c"), None);
    }

    #[test]
    fn double_open_is_rejected() {
        let mut table = FileTable::new(8);
        table.open("a").unwrap();
        assert!(matches!(table.open("a"), Err(DriverError::AlreadyOpen(name)) if name == "a"));
    }

    #[test]
    fn reopen_keeps_handle_and_rewinds() {
        let mut table = FileTable::new(8);
        let fd = table.open("a").unwrap();
        {
            let file = table.get_open_mut(fd).unwrap();
            file.length = 40;
            file.position = 40;
            file.frames.push(FrameAddr::new(0, 3));
        }
        table.close(fd).unwrap();
        assert_eq!(table.open("a").unwrap(), fd);

        let file = table.get_open(fd).unwrap();
        assert_eq!(file.position, 0);
        assert_eq!(file.length, 40);
        assert_eq!(table.frame_at(fd, 0), Some(FrameAddr::new(0, 3)));
        assert_eq!(table.frame_at(fd, 1), None);
    }

    #[test]
    fn closed_and_unknown_handles() {
        let mut table = FileTable::new(8);
        let fd = table.open("a").unwrap();
        table.close(fd).unwrap();

        assert!(matches!(table.close(fd), Err(DriverError::FileNotOpen(_))));
        assert!(matches!(table.get_open(fd), Err(DriverError::FileNotOpen(_))));
        assert!(table.get(fd).is_ok());

        let bogus = FileHandle::from_raw(9);
        assert!(matches!(
            table.close(bogus),
            Err(DriverError::InvalidHandle(h)) if h == bogus
        ));
    }

    #[test]
    fn table_limit() {
        let mut table = FileTable::new(2);
        table.open("a").unwrap();
        table.open("b").unwrap();
        assert!(matches!(table.open("c"), Err(DriverError::TooManyFiles(2))));

        // Known names still reopen at the limit.
        table.close_all();
        assert!(table.open("a").is_ok());
    }

    #[test]
    fn close_all_counts_open_files() {
        let mut table = FileTable::new(4);
        let a = table.open("a").unwrap();
        table.open("b").unwrap();
        table.open("c").unwrap();
        table.close(a).unwrap();

        assert_eq!(table.close_all(), 2);
        assert!(table.iter().all(|file| !file.open));
        assert_eq!(table.len(), 3);
    }
}
