use crate::filesystem::path::{PathContext, PathStyle};
use futures_util::future::BoxFuture;
use std::{fmt, io, time::SystemTime};

/// What kind of entity lives at an address
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Directory,
    File,
    Link,
    NotFound,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityType::Directory => "directory",
            EntityType::File => "file",
            EntityType::Link => "link",
            EntityType::NotFound => "not-found",
        })
    }
}

/// Metadata for one entity, following links
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Stat {
    pub changed: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    pub entity_type: EntityType,
    pub mode: u32,
    pub size: i64,
}

impl Stat {
    /// The answer for an address with nothing behind it
    pub fn not_found() -> Self {
        Stat {
            changed: None,
            modified: None,
            accessed: None,
            entity_type: EntityType::NotFound,
            mode: 0,
            size: -1,
        }
    }

    /// Permission bits in `ls` form, like `rwxr-xr-x`
    pub fn mode_string(&self) -> String {
        const FLAGS: [char; 3] = ['r', 'w', 'x'];
        (0..9)
            .map(|bit| {
                if self.mode & (0o400 >> bit) != 0 {
                    FLAGS[bit % 3]
                } else {
                    '-'
                }
            })
            .collect()
    }
}

/// The capabilities a jail needs from the filesystem underneath it
///
/// Addresses are strings in the backing's own [PathStyle]. Every
/// operation has a blocking form; the ones used while resolving paths or
/// answering queries also have an asynchronous twin.
///
/// Probing a missing address is not an error: [Backing::entity_type]
/// answers [EntityType::NotFound] and [Backing::stat] answers
/// [Stat::not_found()].
pub trait Backing: Send + Sync {
    fn style(&self) -> PathStyle;

    fn path_context(&self, current: &str) -> PathContext {
        PathContext::new(self.style(), current)
    }

    /// Create one directory, failing with `AlreadyExists` if anything is
    /// already there
    fn create_dir(&self, path: &str) -> io::Result<()>;

    fn create_file(&self, path: &str, contents: &[u8]) -> io::Result<()>;

    fn create_link(&self, path: &str, target: &str) -> io::Result<()>;

    fn entity_type(&self, path: &str, follow_links: bool) -> io::Result<EntityType>;

    /// Raw target string of a symbolic link
    fn read_link(&self, path: &str) -> io::Result<String>;

    fn stat(&self, path: &str) -> io::Result<Stat>;

    /// Whether two addresses name the same entity. A link is compared as
    /// itself, never as its target.
    fn identical(&self, a: &str, b: &str) -> io::Result<bool>;

    fn entity_type_async<'a>(
        &'a self,
        path: &'a str,
        follow_links: bool,
    ) -> BoxFuture<'a, io::Result<EntityType>>;

    fn read_link_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<String>>;

    fn create_dir_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<()>>;

    fn stat_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<Stat>>;

    fn identical_async<'a>(&'a self, a: &'a str, b: &'a str) -> BoxFuture<'a, io::Result<bool>>;
}
