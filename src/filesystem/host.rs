use crate::filesystem::{
    backing::{Backing, EntityType, Stat},
    path::PathStyle,
};
use futures_util::future::BoxFuture;
use std::{
    fs,
    fs::{Metadata, OpenOptions},
    io,
    io::Write,
    os::unix::fs::{symlink, MetadataExt},
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// The host's own filesystem, addressed with host paths
#[derive(Clone, Copy, Debug, Default)]
pub struct HostFilesystem;

impl HostFilesystem {
    pub fn new() -> Self {
        HostFilesystem
    }

    /// Canonicalize a host directory into a string usable as a jail root
    pub fn canonical_root<P: AsRef<Path>>(path: P) -> io::Result<String> {
        into_string(fs::canonicalize(path)?)
    }
}

fn into_string(path: PathBuf) -> io::Result<String> {
    path.into_os_string().into_string().map_err(|path| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("path is not valid unicode: {:?}", path),
        )
    })
}

fn is_missing(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound || err.raw_os_error() == Some(libc::ENOTDIR)
}

fn entity_type_of(metadata: io::Result<Metadata>) -> io::Result<EntityType> {
    match metadata {
        Ok(metadata) => {
            let file_type = metadata.file_type();
            Ok(if file_type.is_dir() {
                EntityType::Directory
            } else if file_type.is_symlink() {
                EntityType::Link
            } else {
                EntityType::File
            })
        }
        Err(err) if is_missing(&err) => Ok(EntityType::NotFound),
        Err(err) => Err(err),
    }
}

fn unix_time(secs: i64, nsecs: i64) -> Option<SystemTime> {
    if secs < 0 || nsecs < 0 {
        None
    } else {
        Some(UNIX_EPOCH + Duration::new(secs as u64, nsecs as u32))
    }
}

fn stat_of(metadata: io::Result<Metadata>) -> io::Result<Stat> {
    match metadata {
        Ok(metadata) => Ok(Stat {
            changed: unix_time(metadata.ctime(), metadata.ctime_nsec()),
            modified: unix_time(metadata.mtime(), metadata.mtime_nsec()),
            accessed: unix_time(metadata.atime(), metadata.atime_nsec()),
            entity_type: entity_type_of(Ok(metadata.clone()))?,
            mode: metadata.mode() & 0o7777,
            size: metadata.size() as i64,
        }),
        Err(err) if is_missing(&err) => Ok(Stat::not_found()),
        Err(err) => Err(err),
    }
}

fn same_entity(a: &Metadata, b: &Metadata) -> bool {
    a.dev() == b.dev() && a.ino() == b.ino()
}

impl Backing for HostFilesystem {
    fn style(&self) -> PathStyle {
        PathStyle::Posix
    }

    fn create_dir(&self, path: &str) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn create_file(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(contents)
    }

    fn create_link(&self, path: &str, target: &str) -> io::Result<()> {
        symlink(target, path)
    }

    fn entity_type(&self, path: &str, follow_links: bool) -> io::Result<EntityType> {
        entity_type_of(if follow_links {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        })
    }

    fn read_link(&self, path: &str) -> io::Result<String> {
        into_string(fs::read_link(path)?)
    }

    fn stat(&self, path: &str) -> io::Result<Stat> {
        stat_of(fs::metadata(path))
    }

    fn identical(&self, a: &str, b: &str) -> io::Result<bool> {
        Ok(same_entity(
            &fs::symlink_metadata(a)?,
            &fs::symlink_metadata(b)?,
        ))
    }

    fn entity_type_async<'a>(
        &'a self,
        path: &'a str,
        follow_links: bool,
    ) -> BoxFuture<'a, io::Result<EntityType>> {
        Box::pin(async move {
            entity_type_of(if follow_links {
                tokio::fs::metadata(path).await
            } else {
                tokio::fs::symlink_metadata(path).await
            })
        })
    }

    fn read_link_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<String>> {
        Box::pin(async move { into_string(tokio::fs::read_link(path).await?) })
    }

    fn create_dir_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(tokio::fs::create_dir(path))
    }

    fn stat_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<Stat>> {
        Box::pin(async move { stat_of(tokio::fs::metadata(path).await) })
    }

    fn identical_async<'a>(&'a self, a: &'a str, b: &'a str) -> BoxFuture<'a, io::Result<bool>> {
        Box::pin(async move {
            let a = tokio::fs::symlink_metadata(a).await?;
            let b = tokio::fs::symlink_metadata(b).await?;
            Ok(same_entity(&a, &b))
        })
    }
}
