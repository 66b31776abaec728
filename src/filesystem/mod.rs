//! Confined filesystem views and the backings underneath them

#[cfg(test)] mod tests;

mod backing;
mod builder;
mod entity;
#[cfg(unix)] mod host;
mod jail;
mod memory;
mod nested;
mod path;
mod query;
mod resolve;
mod translate;

pub use backing::{Backing, EntityType, Stat};
pub use builder::{default_root, JailBuilder, DEFAULT_TEMP_PREFIX, ROOT_ENV};
pub use entity::{Entity, EntityKind};
#[cfg(unix)] pub use host::HostFilesystem;
pub use jail::{JailFilesystem, PathLike};
pub use memory::MemoryFilesystem;
pub use path::{PathContext, PathStyle};
pub use resolve::{NotFoundPolicy, ResolveOptions};
pub use translate::{Confinement, LOCAL_ROOT};
