// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Files received as part of a `multipart/form-data` request.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use indexmap::IndexMap;
use strum_macros::AsRefStr;
use tracing::{debug, trace};

use crate::{
    Body,
    Error,
    Result,
    Stream,
};

/// The status of an upload, numbered as the `UPLOAD_ERR_*` codes web servers
/// commonly report.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, AsRefStr)]
#[repr(u8)]
pub enum UploadError {
    #[default]
    Ok = 0,

    /// The file exceeds the server-wide size limit.
    IniSize = 1,

    /// The file exceeds the size limit of the form.
    FormSize = 2,

    Partial = 3,
    NoFile = 4,
    NoTmpDir = 6,
    CantWrite = 7,

    /// An extension stopped the upload.
    Extension = 8,
}

impl UploadError {
    #[must_use]
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<i64> for UploadError {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self> {
        Ok(match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            _ => {
                debug!(code, "rejected upload error code");
                return Err(Error::invalid_argument("error", format!("invalid upload error status {code}")));
            }
        })
    }
}

#[derive(Debug)]
enum UploadSource {
    Path(PathBuf),
    Stream(Body),
    None,
}

#[derive(Debug)]
pub struct UploadedFile {
    source: UploadSource,
    size: Option<u64>,
    error: UploadError,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    moved: AtomicBool,
}

impl UploadedFile {
    /// An upload stored at `path`, e.g. in a temporary directory. When the
    /// upload failed, the path is ignored.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>, size: Option<u64>, error: UploadError) -> UploadedFile {
        let source = match error {
            UploadError::Ok => UploadSource::Path(path.into()),
            _ => UploadSource::None,
        };
        UploadedFile::with_source(source, size, error)
    }

    /// An upload whose contents are held by a stream.
    #[must_use]
    pub fn from_stream(body: impl Into<Body>, size: Option<u64>, error: UploadError) -> UploadedFile {
        let source = match error {
            UploadError::Ok => UploadSource::Stream(body.into()),
            _ => UploadSource::None,
        };
        UploadedFile::with_source(source, size, error)
    }

    fn with_source(source: UploadSource, size: Option<u64>, error: UploadError) -> UploadedFile {
        UploadedFile {
            source,
            size,
            error,
            client_filename: None,
            client_media_type: None,
            moved: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_client_filename(mut self, filename: impl Into<String>) -> UploadedFile {
        self.client_filename = Some(filename.into());
        self
    }

    #[must_use]
    pub fn with_client_media_type(mut self, media_type: impl Into<String>) -> UploadedFile {
        self.client_media_type = Some(media_type.into());
        self
    }

    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    #[must_use]
    pub fn error(&self) -> UploadError {
        self.error
    }

    /// The filename as sent by the client. Don't trust it.
    #[must_use]
    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    #[must_use]
    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    #[must_use]
    pub fn is_moved(&self) -> bool {
        self.moved.load(Ordering::Acquire)
    }

    /// The contents of the upload. A file-backed upload is opened anew on
    /// every call.
    pub fn stream(&self) -> Result<Body> {
        self.validate_active()?;

        match &self.source {
            UploadSource::Stream(body) => Ok(body.clone()),
            UploadSource::Path(path) => Ok(Body::new(Stream::open(path, "r+")?)),
            UploadSource::None => Err(Error::unreachable("the upload has no contents")),
        }
    }

    /// Moves the upload to `target`. This can only be done once, also when
    /// the upload is shared between threads.
    pub fn move_to(&self, target: impl AsRef<Path>) -> Result<()> {
        self.validate_active()?;

        let target = target.as_ref();
        if target.as_os_str().is_empty() {
            debug!("rejected empty upload target path");
            return Err(Error::invalid_argument("target", "invalid path provided for move operation; must be a non-empty path"));
        }

        if self.moved.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(Error::unreachable("the upload has already been moved"));
        }

        if let Err(error) = self.move_source(target) {
            self.moved.store(false, Ordering::Release);
            return Err(error);
        }

        trace!(target = %target.display(), "moved upload");
        Ok(())
    }

    fn move_source(&self, target: &Path) -> Result<()> {
        match &self.source {
            UploadSource::Path(path) => move_file(path, target)?,
            UploadSource::Stream(body) => {
                let contents = body.lock().read_all()?;
                fs::write(target, contents)?;
            }
            UploadSource::None => return Err(Error::unreachable("the upload has no contents")),
        }

        Ok(())
    }

    fn validate_active(&self) -> Result<()> {
        if self.error != UploadError::Ok {
            return Err(Error::unreachable(format!("cannot use the upload due to upload error {}", self.error.as_ref())));
        }

        if self.is_moved() {
            return Err(Error::unreachable("the upload has already been moved"));
        }

        Ok(())
    }
}

/// Renames the file, or copies and removes it when the target is on another
/// file system.
fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(error) => {
            debug!(%error, "rename failed, copying upload instead");
            fs::copy(source, target)?;
            fs::remove_file(source)
        }
    }
}

/// A (nested) collection of uploads, e.g. for form fields named
/// `files[avatar]` and `files[gallery][0]`.
#[derive(Clone, Debug)]
pub enum UploadNode {
    Leaf(Arc<UploadedFile>),
    Group(IndexMap<String, UploadNode>),
}

impl UploadNode {
    /// The upload at the end of the path of keys.
    #[must_use]
    pub fn find(&self, keys: &[&str]) -> Option<&Arc<UploadedFile>> {
        match (self, keys.split_first()) {
            (UploadNode::Leaf(file), None) => Some(file),
            (UploadNode::Group(children), Some((key, rest))) => children.get(*key)?.find(rest),
            _ => None,
        }
    }
}

impl From<UploadedFile> for UploadNode {
    fn from(file: UploadedFile) -> Self {
        UploadNode::Leaf(Arc::new(file))
    }
}

impl From<IndexMap<String, UploadNode>> for UploadNode {
    fn from(children: IndexMap<String, UploadNode>) -> Self {
        UploadNode::Group(children)
    }
}

impl PartialEq for UploadNode {
    /// Leaves are equal when they are the same upload.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (UploadNode::Leaf(a), UploadNode::Leaf(b)) => Arc::ptr_eq(a, b),
            (UploadNode::Group(a), UploadNode::Group(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use rstest::rstest;

    #[test]
    fn test_move_file_upload() {
        let directory = tempfile::tempdir().unwrap();
        let source = directory.path().join("upload-3f9a");
        let target = directory.path().join("avatar.png");
        fs::write(&source, b"PNG").unwrap();

        let upload = UploadedFile::from_path(&source, Some(3), UploadError::Ok)
            .with_client_filename("avatar.png")
            .with_client_media_type("image/png");
        assert_eq!(upload.client_filename(), Some("avatar.png"));
        assert_eq!(upload.client_media_type(), Some("image/png"));
        assert_eq!(upload.stream().unwrap().lock().read_all().unwrap(), b"PNG");

        upload.move_to(&target).unwrap();
        assert!(upload.is_moved());
        assert!(!source.exists());
        assert_eq!(fs::read(&target).unwrap(), b"PNG");

        assert_eq!(upload.move_to(&target).unwrap_err().kind(), ErrorKind::UnreachableResource);
        assert_eq!(upload.stream().unwrap_err().kind(), ErrorKind::UnreachableResource);
    }

    #[test]
    fn test_move_stream_upload() {
        let directory = tempfile::tempdir().unwrap();
        let target = directory.path().join("notes.txt");

        let upload = UploadedFile::from_stream("some notes", Some(10), UploadError::Ok);
        upload.stream().unwrap().lock().read(4).unwrap();
        upload.move_to(&target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "some notes");
    }

    #[test]
    fn test_failed_upload_is_unreachable() {
        let upload = UploadedFile::from_path("/nonexistent", None, UploadError::Partial);
        assert_eq!(upload.error().code(), 3);
        assert_eq!(upload.stream().unwrap_err().kind(), ErrorKind::UnreachableResource);
        assert_eq!(upload.move_to("/tmp/x").unwrap_err().kind(), ErrorKind::UnreachableResource);
    }

    #[test]
    fn test_concurrent_moves_happen_once() {
        let directory = tempfile::tempdir().unwrap();
        let upload = Arc::new(UploadedFile::from_stream("contents", None, UploadError::Ok));

        let handles: Vec<_> = (0..8)
            .map(|index| {
                let upload = Arc::clone(&upload);
                let target = directory.path().join(format!("target-{index}"));
                std::thread::spawn(move || upload.move_to(target).is_ok())
            })
            .collect();

        let moves = handles.into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|moved| *moved)
            .count();
        assert_eq!(moves, 1);
        assert!(upload.is_moved());
    }

    #[test]
    fn test_failed_move_can_be_retried() {
        let directory = tempfile::tempdir().unwrap();
        let upload = UploadedFile::from_stream("contents", None, UploadError::Ok);

        let unwritable = directory.path().join("missing").join("file");
        assert!(upload.move_to(&unwritable).is_err());
        assert!(!upload.is_moved());

        upload.move_to(directory.path().join("file")).unwrap();
        assert!(upload.is_moved());
    }

    #[test]
    fn test_empty_target_path() {
        let upload = UploadedFile::from_stream("x", None, UploadError::Ok);
        assert_eq!(upload.move_to("").unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert!(!upload.is_moved());
    }

    #[rstest]
    #[case(0, UploadError::Ok)]
    #[case(4, UploadError::NoFile)]
    #[case(8, UploadError::Extension)]
    fn test_error_codes(#[case] code: i64, #[case] expected: UploadError) {
        assert_eq!(UploadError::try_from(code).unwrap(), expected);
    }

    #[rstest]
    #[case(5)]
    #[case(-1)]
    #[case(9)]
    fn test_invalid_error_codes(#[case] code: i64) {
        assert_eq!(UploadError::try_from(code).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_find_in_tree() {
        let avatar = Arc::new(UploadedFile::from_stream("a", None, UploadError::Ok));
        let tree = UploadNode::Group(IndexMap::from([
            (String::from("files"), UploadNode::Group(IndexMap::from([
                (String::from("avatar"), UploadNode::Leaf(Arc::clone(&avatar))),
            ]))),
        ]));

        assert!(Arc::ptr_eq(tree.find(&["files", "avatar"]).unwrap(), &avatar));
        assert!(tree.find(&["files"]).is_none());
        assert!(tree.find(&["files", "avatar", "deeper"]).is_none());
    }
}
