//! Questions about entities in the jail: stat, type, and identity
//!
//! Asking about a path that doesn't exist, or that can't be reached from
//! inside the jail, is an ordinary question with a not-found answer. Only
//! failures of the backing filesystem itself are errors here.

use crate::{
    errors::JailError,
    filesystem::{
        backing::{Backing, EntityType, Stat},
        jail::JailFilesystem,
        resolve::ResolveOptions,
    },
};

/// Turn a resolution-class failure into `None`, keeping other errors
fn soften(path: &str, result: Result<String, JailError>) -> Result<Option<String>, JailError> {
    match result {
        Ok(local) => Ok(Some(local)),
        Err(err) if err.is_resolution_failure() => {
            log::debug!("query {:?} answered as not found, {}", path, err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

impl<B: Backing> JailFilesystem<B> {
    /// Metadata for the entity at `path`, following links
    pub fn stat(&self, path: &str) -> Result<Stat, JailError> {
        match soften(path, self.resolve(path, ResolveOptions::new()))? {
            None => Ok(Stat::not_found()),
            Some(local) => {
                let real = self.confinement().to_real(&local)?;
                Ok(self.backing().stat(&real)?)
            }
        }
    }

    pub async fn stat_async(&self, path: &str) -> Result<Stat, JailError> {
        match soften(path, self.resolve_async(path, ResolveOptions::new()).await)? {
            None => Ok(Stat::not_found()),
            Some(local) => {
                let real = self.confinement().to_real(&local)?;
                Ok(self.backing().stat_async(&real).await?)
            }
        }
    }

    /// The type of entity at `path`
    ///
    /// With `follow_links` unset, a link in the final segment answers
    /// [EntityType::Link] instead of the type of its target.
    pub fn entity_type(&self, path: &str, follow_links: bool) -> Result<EntityType, JailError> {
        let options = ResolveOptions::new().follow_links(follow_links);
        match soften(path, self.resolve(path, options))? {
            None => Ok(EntityType::NotFound),
            Some(local) => {
                let real = self.confinement().to_real(&local)?;
                Ok(self.backing().entity_type(&real, false)?)
            }
        }
    }

    pub async fn entity_type_async(
        &self,
        path: &str,
        follow_links: bool,
    ) -> Result<EntityType, JailError> {
        let options = ResolveOptions::new().follow_links(follow_links);
        match soften(path, self.resolve_async(path, options).await)? {
            None => Ok(EntityType::NotFound),
            Some(local) => {
                let real = self.confinement().to_real(&local)?;
                Ok(self.backing().entity_type_async(&real, false).await?)
            }
        }
    }

    /// Whether two paths name the same entity
    ///
    /// A link in the final segment of either path is compared as itself,
    /// not as its target.
    pub fn identical(&self, a: &str, b: &str) -> Result<bool, JailError> {
        let a = self.to_real(a, true, false)?;
        let b = self.to_real(b, true, false)?;
        Ok(self.backing().identical(&a, &b)?)
    }

    pub async fn identical_async(&self, a: &str, b: &str) -> Result<bool, JailError> {
        let a = self.to_real_async(a, false).await?;
        let b = self.to_real_async(b, false).await?;
        Ok(self.backing().identical_async(&a, &b).await?)
    }
}
