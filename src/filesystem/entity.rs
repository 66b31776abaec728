use crate::{
    errors::JailError,
    filesystem::{
        backing::{Backing, EntityType, Stat},
        jail::JailFilesystem,
        resolve::{NotFoundPolicy, ResolveOptions},
    },
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntityKind {
    Directory,
    File,
    Link,
}

impl EntityKind {
    pub fn entity_type(self) -> EntityType {
        match self {
            EntityKind::Directory => EntityType::Directory,
            EntityKind::File => EntityType::File,
            EntityKind::Link => EntityType::Link,
        }
    }
}

/// A handle to one address in a jail
///
/// The address is stored as given and resolved again on every operation,
/// so a handle tracks whatever is at that path now.
#[derive(Debug)]
pub struct Entity<'fs, B> {
    fs: &'fs JailFilesystem<B>,
    path: String,
    kind: EntityKind,
}

impl<'fs, B> Clone for Entity<'fs, B> {
    fn clone(&self) -> Self {
        Entity {
            fs: self.fs,
            path: self.path.clone(),
            kind: self.kind,
        }
    }
}

impl<B: Backing> JailFilesystem<B> {
    pub fn directory<S: Into<String>>(&self, path: S) -> Entity<'_, B> {
        Entity::new(self, path.into(), EntityKind::Directory)
    }

    pub fn file<S: Into<String>>(&self, path: S) -> Entity<'_, B> {
        Entity::new(self, path.into(), EntityKind::File)
    }

    pub fn link<S: Into<String>>(&self, path: S) -> Entity<'_, B> {
        Entity::new(self, path.into(), EntityKind::Link)
    }
}

impl<'fs, B> Entity<'fs, B> {
    fn new(fs: &'fs JailFilesystem<B>, path: String, kind: EntityKind) -> Self {
        Entity { fs, path, kind }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn file_system(&self) -> &'fs JailFilesystem<B> {
        self.fs
    }

    // a link handle is about the link itself, not where it points
    fn follows_tail(&self) -> bool {
        self.kind != EntityKind::Link
    }
}

impl<'fs, B: Backing> Entity<'fs, B> {
    /// Canonical local path of this entity
    pub fn resolved_path(&self) -> Result<String, JailError> {
        self.fs.resolve(
            &self.path,
            ResolveOptions::new().follow_links(self.follows_tail()),
        )
    }

    pub fn real_path(&self) -> Result<String, JailError> {
        self.fs.to_real(&self.path, true, self.follows_tail())
    }

    /// Whether an entity of this handle's kind is at the address
    pub fn exists(&self) -> Result<bool, JailError> {
        Ok(self.fs.entity_type(&self.path, self.follows_tail())? == self.kind.entity_type())
    }

    pub fn stat(&self) -> Result<Stat, JailError> {
        self.fs.stat(&self.path)
    }

    /// Create an empty directory or file at this address
    ///
    /// Every directory above it must already exist.
    pub fn create(&self) -> Result<(), JailError> {
        let real = self.creation_path()?;
        match self.kind {
            EntityKind::Directory => self.fs.backing().create_dir(&real)?,
            EntityKind::File => self.fs.backing().create_file(&real, &[])?,
            EntityKind::Link => {
                return Err(JailError::InvalidArgument(format!(
                    "a link needs a target, use create_link for {:?}",
                    self.path
                )))
            }
        }
        log::debug!("created {:?} at {:?}", self.kind, real);
        Ok(())
    }

    /// Create a symbolic link at this address
    ///
    /// The target is stored verbatim and read in the jail namespace when
    /// the link is followed.
    pub fn create_link(&self, target: &str) -> Result<(), JailError> {
        if self.kind != EntityKind::Link {
            return Err(JailError::InvalidArgument(format!(
                "{:?} is not a link handle",
                self.path
            )));
        }
        let real = self.creation_path()?;
        self.fs.backing().create_link(&real, target)?;
        log::debug!("created link at {:?} -> {:?}", real, target);
        Ok(())
    }

    fn creation_path(&self) -> Result<String, JailError> {
        let local = self.fs.resolve(
            &self.path,
            ResolveOptions::new()
                .follow_links(self.follows_tail())
                .not_found(NotFoundPolicy::AllowAtTail),
        )?;
        self.fs.to_real(&local, false, false)
    }
}
