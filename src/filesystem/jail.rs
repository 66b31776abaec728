use crate::{
    errors::JailError,
    filesystem::{
        backing::{Backing, EntityType},
        builder::JailBuilder,
        entity::Entity,
        path::PathContext,
        resolve::{self, NotFoundPolicy, ResolveOptions, Walk},
        translate::{Confinement, LOCAL_ROOT, LOCAL_STYLE},
    },
};
use std::io;

const TEMP_ATTEMPTS: usize = 16;

/// A filesystem view confined to one subtree of a backing filesystem
///
/// Every path given to a jail is read in its own namespace, rooted at `/`.
/// `..` stops at that root, and symbolic links are followed by the jail
/// itself, so a link pointing at `/etc` names `/etc` inside the jail.
///
/// This is not an OS sandbox. It confines only the addresses that pass
/// through it; anyone holding the backing filesystem directly can still
/// reach everything.
#[derive(Debug)]
pub struct JailFilesystem<B> {
    backing: B,
    confinement: Confinement,
    cwd: String,
    temp_prefix: String,
    system_temp: Option<String>,
}

/// Something naming a directory: a path string or an entity handle
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathLike<'a> {
    Text(&'a str),
    Handle(String),
}

impl<'a> PathLike<'a> {
    pub fn as_str(&self) -> &str {
        match self {
            PathLike::Text(s) => s,
            PathLike::Handle(s) => s,
        }
    }
}

impl<'a> From<&'a str> for PathLike<'a> {
    fn from(s: &'a str) -> Self {
        PathLike::Text(s)
    }
}

impl<'a> From<&'a String> for PathLike<'a> {
    fn from(s: &'a String) -> Self {
        PathLike::Text(s.as_str())
    }
}

// The handle's address is copied out, so the result doesn't keep the
// handle (or its jail) borrowed.
impl<'a, 'e, 'fs, B> From<&'e Entity<'fs, B>> for PathLike<'a> {
    fn from(entity: &'e Entity<'fs, B>) -> Self {
        PathLike::Handle(entity.path().to_string())
    }
}

impl<B: Backing> JailFilesystem<B> {
    /// Confine `backing` to `root`, which must be absolute and canonical in
    /// the backing's path style
    pub fn new(backing: B, root: &str) -> Result<Self, JailError> {
        JailBuilder::new(backing).root(root).build()
    }

    /// Start configuring a jail over `backing`
    pub fn builder(backing: B) -> JailBuilder<B> {
        JailBuilder::new(backing)
    }

    pub(crate) fn from_parts(backing: B, confinement: Confinement, temp_prefix: String) -> Self {
        JailFilesystem {
            backing,
            confinement,
            cwd: LOCAL_ROOT.to_string(),
            temp_prefix,
            system_temp: None,
        }
    }

    /// The jail root, as a real path
    pub fn root(&self) -> &str {
        self.confinement.root()
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    pub fn confinement(&self) -> &Confinement {
        &self.confinement
    }

    /// Current directory in the jail namespace, always absolute and
    /// canonical
    pub fn current_directory(&self) -> &str {
        &self.cwd
    }

    /// Change the current directory
    ///
    /// The path is resolved against the current directory, and must name an
    /// existing directory. On any failure the current directory is left
    /// unchanged.
    pub fn set_current_directory<'p, P: Into<PathLike<'p>>>(
        &mut self,
        path: P,
    ) -> Result<(), JailError> {
        let path = path.into();
        let local = self.resolve(
            path.as_str(),
            ResolveOptions::new().not_found(NotFoundPolicy::Throw),
        )?;
        let real = self.confinement.to_real(&local)?;
        match self.backing.entity_type(&real, false)? {
            EntityType::Directory => {
                log::debug!("current directory {:?} -> {:?}", self.cwd, local);
                self.cwd = local;
                Ok(())
            }
            EntityType::NotFound => Err(JailError::NotFound(path.as_str().to_string())),
            EntityType::File | EntityType::Link => {
                Err(JailError::NotADirectory(path.as_str().to_string()))
            }
        }
    }

    /// Path operations in the jail namespace, anchored at the current
    /// directory
    pub fn path_context(&self) -> PathContext {
        PathContext::new(LOCAL_STYLE, self.cwd.clone())
    }

    /// Change notification is never available through a jail
    pub fn is_watch_supported(&self) -> bool {
        false
    }

    /// Canonicalize a path in the jail namespace
    pub fn resolve(&self, path: &str, options: ResolveOptions) -> Result<String, JailError> {
        let walk = Walk::new(&self.confinement, path, &self.cwd, &options)?;
        resolve::resolve(&self.backing, walk)
    }

    /// Canonicalize a path using the backing's asynchronous operations
    pub async fn resolve_async(
        &self,
        path: &str,
        options: ResolveOptions,
    ) -> Result<String, JailError> {
        let walk = Walk::new(&self.confinement, path, &self.cwd, &options)?;
        resolve::resolve_async(&self.backing, walk).await
    }

    /// Translate a local path to the backing namespace
    ///
    /// With `resolve` set the path is first canonicalized, following a
    /// final link only if `follow_links` is set. Without it, the path must
    /// already be absolute and canonical.
    pub fn to_real(
        &self,
        local: &str,
        resolve: bool,
        follow_links: bool,
    ) -> Result<String, JailError> {
        if resolve {
            let local = self.resolve(local, ResolveOptions::new().follow_links(follow_links))?;
            self.confinement.to_real(&local)
        } else {
            self.confinement.to_real(local)
        }
    }

    pub(crate) async fn to_real_async(
        &self,
        local: &str,
        follow_links: bool,
    ) -> Result<String, JailError> {
        let local = self
            .resolve_async(local, ResolveOptions::new().follow_links(follow_links))
            .await?;
        self.confinement.to_real(&local)
    }

    /// Translate a real path into the jail namespace
    ///
    /// With `relative` set the answer is relative to the current directory.
    /// Real paths outside the root fail with [JailError::JailViolation]
    /// unless `keep_in_jail` is set, which answers the local root instead.
    pub fn to_local(
        &self,
        real: &str,
        relative: bool,
        keep_in_jail: bool,
    ) -> Result<String, JailError> {
        let local = self.confinement.to_local(real, keep_in_jail)?;
        if relative {
            Ok(self.path_context().relative(&local))
        } else {
            Ok(local)
        }
    }

    /// A scratch directory directly under the jail root
    ///
    /// The first call creates it with a fresh name; later calls make sure it
    /// still exists and return the same path for the life of this jail.
    pub fn system_temp_directory(&mut self) -> Result<String, JailError> {
        if let Some(local) = self.system_temp.clone() {
            let real = self.confinement.to_real(&local)?;
            existing_ok(self.backing.create_dir(&real))?;
            return Ok(local);
        }
        for _ in 0..TEMP_ATTEMPTS {
            let local = self.temp_candidate();
            let real = self.confinement.to_real(&local)?;
            match self.backing.create_dir(&real) {
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                result => result?,
            }
            return Ok(self.remember_temp(local));
        }
        Err(temp_exhausted())
    }

    pub async fn system_temp_directory_async(&mut self) -> Result<String, JailError> {
        if let Some(local) = self.system_temp.clone() {
            let real = self.confinement.to_real(&local)?;
            existing_ok(self.backing.create_dir_async(&real).await)?;
            return Ok(local);
        }
        for _ in 0..TEMP_ATTEMPTS {
            let local = self.temp_candidate();
            let real = self.confinement.to_real(&local)?;
            match self.backing.create_dir_async(&real).await {
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                result => result?,
            }
            return Ok(self.remember_temp(local));
        }
        Err(temp_exhausted())
    }

    fn temp_candidate(&self) -> String {
        format!(
            "{}{}{}-{}",
            LOCAL_ROOT,
            self.temp_prefix,
            std::process::id(),
            rand::random::<u64>()
        )
    }

    fn remember_temp(&mut self, local: String) -> String {
        log::debug!("created system temp directory {:?}", local);
        self.system_temp = Some(local.clone());
        local
    }
}

fn existing_ok(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        other => other,
    }
}

fn temp_exhausted() -> JailError {
    JailError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no unused temp directory name found",
    ))
}
