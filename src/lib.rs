//! Confined filesystem views ("jails") over an arbitrary backing filesystem
//!
//! A [JailFilesystem] reads every path in its own namespace rooted at `/`,
//! maps it onto one subtree of a [Backing] filesystem, and follows
//! symbolic links itself so that nothing outside that subtree can be
//! addressed. Links pointing outward are read as paths inside the jail.
//!
//! All of this happens in user code against the backing's own operations.
//! There are no privileged syscalls, and no protection against anyone who
//! holds the backing filesystem directly.
//!
//! ```
//! use jailfs::{Backing, EntityType, JailFilesystem, MemoryFilesystem};
//!
//! let backing = MemoryFilesystem::new();
//! backing.create_dir("/sandbox").unwrap();
//! backing.create_dir("/etc").unwrap();
//! backing.create_link("/sandbox/config", "/etc").unwrap();
//!
//! let jail = JailFilesystem::new(backing, "/sandbox").unwrap();
//! assert_eq!(jail.to_real("/config", true, true).unwrap(), "/sandbox/etc");
//! assert_eq!(jail.entity_type("/config", true).unwrap(), EntityType::NotFound);
//! assert_eq!(jail.entity_type("/config", false).unwrap(), EntityType::Link);
//! ```

#[macro_use] extern crate lazy_static;
#[macro_use] extern crate serde;

pub mod errors;

mod filesystem;

pub use crate::{errors::JailError, filesystem::*};
