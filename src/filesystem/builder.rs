//! Configuration for [JailFilesystem] instances

use crate::{
    errors::JailError,
    filesystem::{backing::Backing, jail::JailFilesystem, translate::Confinement},
};
use regex::Regex;
use std::env;

/// Prefix for the name of each jail's system temp directory
pub const DEFAULT_TEMP_PREFIX: &str = ".tmp_";

/// Environment variable naming the default jail root
pub const ROOT_ENV: &str = "JAILFS_ROOT";

/// The jail root configured in the environment, if any
pub fn default_root() -> Result<String, JailError> {
    env::var(ROOT_ENV).map_err(|_| {
        JailError::InvalidArgument(format!("no jail root given and {} is not set", ROOT_ENV))
    })
}

/// Builder for configuring custom [JailFilesystem] instances
#[derive(Debug)]
pub struct JailBuilder<B> {
    backing: B,
    root: Option<String>,
    current_dir: Option<String>,
    temp_prefix: String,
}

impl<B: Backing> JailBuilder<B> {
    /// Start configuring a jail over `backing`
    pub fn new(backing: B) -> Self {
        JailBuilder {
            backing,
            root: None,
            current_dir: None,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
        }
    }

    /// Set the jail root
    ///
    /// This is a real path in the backing's path style, and it must already
    /// be absolute and canonical. If unset, the root comes from
    /// [default_root()].
    pub fn root(mut self, root: &str) -> Self {
        self.root = Some(root.to_string());
        self
    }

    /// Start in this directory instead of the jail root
    ///
    /// The directory is resolved inside the jail and must exist.
    pub fn current_dir(mut self, dir: &str) -> Self {
        self.current_dir = Some(dir.to_string());
        self
    }

    /// Change the name prefix used for the system temp directory
    pub fn temp_prefix(mut self, prefix: &str) -> Self {
        self.temp_prefix = prefix.to_string();
        self
    }

    /// Construct a JailFilesystem using the parameters from this Builder
    pub fn build(self) -> Result<JailFilesystem<B>, JailError> {
        let root = match self.root {
            Some(root) => root,
            None => default_root()?,
        };
        let confinement = Confinement::new(&root, self.backing.style())?;
        check_temp_prefix(&self.temp_prefix)?;
        log::debug!("using jail root {:?}", confinement.root());

        let mut jail = JailFilesystem::from_parts(self.backing, confinement, self.temp_prefix);
        if let Some(dir) = &self.current_dir {
            jail.set_current_directory(dir)?;
        }
        Ok(jail)
    }
}

fn check_temp_prefix(prefix: &str) -> Result<(), JailError> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^[a-zA-Z0-9_\.\-]*$").unwrap();
    }
    if RE.is_match(prefix) {
        Ok(())
    } else {
        Err(JailError::InvalidArgument(format!(
            "bad temp directory prefix {:?}",
            prefix
        )))
    }
}
