//! Mapping between local paths inside the jail and real backing paths

use crate::{errors::JailError, filesystem::path::PathStyle};

/// The jail namespace always looks like a small posix tree
pub(crate) const LOCAL_STYLE: PathStyle = PathStyle::Posix;

/// Root marker of the jail namespace
pub const LOCAL_ROOT: &str = "/";

/// A fixed jail root in some backing namespace
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Confinement {
    root: String,
    style: PathStyle,
}

impl Confinement {
    /// The root must already be absolute and canonical, so that prefix
    /// checks on normalized real paths are exact
    pub fn new(root: &str, style: PathStyle) -> Result<Self, JailError> {
        if !style.is_absolute(root) || style.normalize(root) != root {
            return Err(JailError::InvalidArgument(format!(
                "jail root must be absolute and canonical, got {:?}",
                root
            )));
        }
        Ok(Confinement {
            root: root.to_string(),
            style,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// Real path for an already-canonical list of local segments
    pub(crate) fn real_path<S: AsRef<str>>(&self, segments: &[S]) -> String {
        self.style.join_segments(&self.root, segments)
    }

    /// Translate a canonical local path without resolving it
    pub fn to_real(&self, local: &str) -> Result<String, JailError> {
        if !is_canonical_local(local) {
            return Err(JailError::InvalidArgument(format!(
                "local path must be absolute and canonical, got {:?}",
                local
            )));
        }
        Ok(self.real_path(&LOCAL_STYLE.split(local)))
    }

    /// Translate a real path back into the jail namespace
    ///
    /// Real paths outside the root are a [JailError::JailViolation], or the
    /// local root when `keep_in_jail` is set.
    pub fn to_local(&self, real: &str, keep_in_jail: bool) -> Result<String, JailError> {
        if !self.style.is_absolute(real) {
            return Err(JailError::InvalidArgument(format!(
                "real path must be absolute, got {:?}",
                real
            )));
        }
        let real = self.style.normalize(real);
        let rest = if real == self.root {
            Some("")
        } else {
            let mut prefix = self.root.clone();
            if !prefix.ends_with(self.style.separator()) {
                prefix.push(self.style.separator());
            }
            real.strip_prefix(prefix.as_str())
        };
        match rest {
            Some(rest) => Ok(LOCAL_STYLE.join_segments(LOCAL_ROOT, &self.style.split(rest))),
            None if keep_in_jail => {
                log::debug!("clamping {:?} to the jail root", real);
                Ok(LOCAL_ROOT.to_string())
            }
            None => Err(JailError::JailViolation(real)),
        }
    }
}

pub(crate) fn is_canonical_local(path: &str) -> bool {
    LOCAL_STYLE.is_absolute(path) && LOCAL_STYLE.normalize(path) == path
}
