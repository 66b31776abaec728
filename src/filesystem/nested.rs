//! A jail is itself a backing filesystem, so jails can be stacked
//!
//! The outer jail sees the inner jail's local paths as its real paths.
//! Confinement composes: the outer root is a directory inside the inner
//! jail, and the inner jail never lets anything out of its own root.

use crate::{
    errors::JailError,
    filesystem::{
        backing::{Backing, EntityType, Stat},
        jail::JailFilesystem,
        path::PathStyle,
        resolve::{NotFoundPolicy, ResolveOptions},
        translate::LOCAL_STYLE,
    },
};
use futures_util::future::BoxFuture;
use std::io;

impl<B: Backing> JailFilesystem<B> {
    /// Real path for a new entity whose final segment may not exist yet
    fn creation_real_path(&self, path: &str) -> Result<String, JailError> {
        let local = self.resolve(
            path,
            ResolveOptions::new()
                .no_follow()
                .not_found(NotFoundPolicy::AllowAtTail),
        )?;
        self.confinement().to_real(&local)
    }

    async fn creation_real_path_async(&self, path: &str) -> Result<String, JailError> {
        let local = self
            .resolve_async(
                path,
                ResolveOptions::new()
                    .no_follow()
                    .not_found(NotFoundPolicy::AllowAtTail),
            )
            .await?;
        self.confinement().to_real(&local)
    }
}

impl<B: Backing> Backing for JailFilesystem<B> {
    fn style(&self) -> PathStyle {
        LOCAL_STYLE
    }

    fn create_dir(&self, path: &str) -> io::Result<()> {
        let real = self.creation_real_path(path)?;
        self.backing().create_dir(&real)
    }

    fn create_file(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        let real = self.creation_real_path(path)?;
        self.backing().create_file(&real, contents)
    }

    fn create_link(&self, path: &str, target: &str) -> io::Result<()> {
        let real = self.creation_real_path(path)?;
        self.backing().create_link(&real, target)
    }

    fn entity_type(&self, path: &str, follow_links: bool) -> io::Result<EntityType> {
        Ok(JailFilesystem::entity_type(self, path, follow_links)?)
    }

    fn read_link(&self, path: &str) -> io::Result<String> {
        let real = self.to_real(path, true, false)?;
        self.backing().read_link(&real)
    }

    fn stat(&self, path: &str) -> io::Result<Stat> {
        Ok(JailFilesystem::stat(self, path)?)
    }

    fn identical(&self, a: &str, b: &str) -> io::Result<bool> {
        Ok(JailFilesystem::identical(self, a, b)?)
    }

    fn entity_type_async<'a>(
        &'a self,
        path: &'a str,
        follow_links: bool,
    ) -> BoxFuture<'a, io::Result<EntityType>> {
        Box::pin(async move {
            Ok(JailFilesystem::entity_type_async(self, path, follow_links).await?)
        })
    }

    fn read_link_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<String>> {
        Box::pin(async move {
            let real = self.to_real_async(path, false).await?;
            self.backing().read_link_async(&real).await
        })
    }

    fn create_dir_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let real = self.creation_real_path_async(path).await?;
            self.backing().create_dir_async(&real).await
        })
    }

    fn stat_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<Stat>> {
        Box::pin(async move { Ok(JailFilesystem::stat_async(self, path).await?) })
    }

    fn identical_async<'a>(&'a self, a: &'a str, b: &'a str) -> BoxFuture<'a, io::Result<bool>> {
        Box::pin(async move { Ok(JailFilesystem::identical_async(self, a, b).await?) })
    }
}
