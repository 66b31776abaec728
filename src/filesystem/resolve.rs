//! Canonicalization and symlink following inside the jail
//!
//! A [Walk] holds the state of one resolution: the ledger of segments
//! already resolved, the segments still pending, and a breadcrumb for each
//! link whose target is still being walked. It never touches
//! the backing filesystem itself. Instead it hands out a [Request] and
//! waits for the answer, which lets the blocking and asynchronous drivers
//! below share every decision and issue the same calls in the same order.

use crate::{
    errors::JailError,
    filesystem::{
        backing::{Backing, EntityType},
        translate::{Confinement, LOCAL_ROOT, LOCAL_STYLE},
    },
};
use std::{collections::VecDeque, str::FromStr};

/// Links read during one resolution before it gives up as a loop
const LINK_HOPS: usize = 256;

/// What to do when a path segment doesn't exist
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotFoundPolicy {
    /// Accept missing segments, taking whatever is below them as written
    Allow,
    /// Like `Allow`, but only the final segment may be missing
    AllowAtTail,
    /// Any missing segment is an error
    Throw,
    /// Create missing intermediate directories along the way
    Mkdir,
}

impl Default for NotFoundPolicy {
    fn default() -> Self {
        NotFoundPolicy::Allow
    }
}

impl FromStr for NotFoundPolicy {
    type Err = JailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(NotFoundPolicy::Allow),
            "allow-at-tail" => Ok(NotFoundPolicy::AllowAtTail),
            "throw" => Ok(NotFoundPolicy::Throw),
            "mkdir" => Ok(NotFoundPolicy::Mkdir),
            other => Err(JailError::InvalidArgument(format!(
                "unknown not-found policy {:?}",
                other
            ))),
        }
    }
}

/// Settings for one resolution
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolveOptions {
    from: Option<String>,
    follow_links: bool,
    not_found: NotFoundPolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            from: None,
            follow_links: true,
            not_found: NotFoundPolicy::Allow,
        }
    }
}

impl ResolveOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Anchor relative paths at this local directory instead of the
    /// current directory
    pub fn from<S: Into<String>>(mut self, dir: S) -> Self {
        self.from = Some(dir.into());
        self
    }

    /// Whether a link in the final segment is followed
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn no_follow(self) -> Self {
        self.follow_links(false)
    }

    pub fn not_found(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found = policy;
        self
    }

    pub fn from_dir(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn follows_links(&self) -> bool {
        self.follow_links
    }

    pub fn not_found_policy(&self) -> NotFoundPolicy {
        self.not_found
    }
}

/// The next thing a [Walk] needs from the backing filesystem
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Request {
    /// Classify this real path without following a terminal link
    Probe(String),
    /// Read the target of the link at this real path
    ReadLink(String),
    /// Create a missing intermediate directory at this real path
    CreateDir(String),
    /// Resolution finished with this local path
    Done(String),
}

/// A link being followed, and how many pending segments were left behind
/// it. Once the pending queue is no longer than `rest`, the link's target
/// has been walked completely.
#[derive(Debug)]
struct Breadcrumb {
    real: String,
    rest: usize,
}

pub(crate) struct Walk<'c> {
    confinement: &'c Confinement,
    path: String,
    ledger: Vec<String>,
    pending: VecDeque<String>,
    breadcrumbs: Vec<Breadcrumb>,
    hops: usize,
    // ledger depth of the first missing segment, while walking below it
    missing_at: Option<usize>,
    follow_links: bool,
    policy: NotFoundPolicy,
}

impl<'c> Walk<'c> {
    pub(crate) fn new(
        confinement: &'c Confinement,
        path: &str,
        cwd: &str,
        options: &ResolveOptions,
    ) -> Result<Self, JailError> {
        if path.is_empty() {
            return Err(JailError::NotFound(path.to_string()));
        }
        let ledger = if LOCAL_STYLE.is_absolute(path) {
            Vec::new()
        } else {
            let from = options.from_dir().unwrap_or(cwd);
            let from = LOCAL_STYLE.normalize(&LOCAL_STYLE.join_segments(LOCAL_ROOT, &[from]));
            owned_segments(&from).collect()
        };
        Ok(Walk {
            confinement,
            path: path.to_string(),
            ledger,
            pending: owned_segments(path).collect(),
            breadcrumbs: Vec::new(),
            hops: 0,
            missing_at: None,
            follow_links: options.follows_links(),
            policy: options.not_found_policy(),
        })
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    fn current(&self) -> String {
        LOCAL_STYLE.join_segments(LOCAL_ROOT, &self.ledger)
    }

    fn at_tail(&self) -> bool {
        self.pending.is_empty()
    }

    /// Consume segments until one needs a probe, or until none are left
    ///
    /// Below a missing segment nothing can exist, so segments are taken
    /// without probing until a `..` climbs back out of the missing subtree.
    pub(crate) fn advance(&mut self) -> Request {
        while let Some(segment) = self.pending.pop_front() {
            match segment.as_str() {
                "." => {}
                ".." => {
                    self.ledger.pop();
                    if self.missing_at.map_or(false, |depth| self.ledger.len() < depth) {
                        self.missing_at = None;
                    }
                }
                _ => {
                    self.ledger.push(segment);
                    if self.missing_at.is_none() {
                        return Request::Probe(self.confinement.real_path(&self.ledger));
                    }
                }
            }
        }
        Request::Done(self.current())
    }

    /// Drop breadcrumbs for links whose targets have been walked
    fn settle(&mut self) {
        while let Some(crumb) = self.breadcrumbs.last() {
            if crumb.rest < self.pending.len() {
                break;
            }
            self.breadcrumbs.pop();
        }
    }

    /// Feed in the type found at the address from the last probe
    pub(crate) fn classified(
        &mut self,
        real: String,
        entity_type: EntityType,
    ) -> Result<Request, JailError> {
        match entity_type {
            EntityType::Directory => {
                self.settle();
                Ok(self.advance())
            }
            EntityType::File => {
                self.settle();
                if self.at_tail() {
                    Ok(self.advance())
                } else {
                    Err(JailError::NotADirectory(self.path.clone()))
                }
            }
            EntityType::NotFound => match self.policy {
                NotFoundPolicy::Mkdir if !self.at_tail() => Ok(Request::CreateDir(real)),
                NotFoundPolicy::Mkdir => Ok(self.advance()),
                NotFoundPolicy::AllowAtTail if !self.at_tail() => {
                    Err(JailError::NotFound(self.path.clone()))
                }
                NotFoundPolicy::Allow | NotFoundPolicy::AllowAtTail => {
                    self.settle();
                    self.missing_at = Some(self.ledger.len());
                    Ok(self.advance())
                }
                NotFoundPolicy::Throw => Err(JailError::NotFound(self.path.clone())),
            },
            EntityType::Link => {
                if self.at_tail() && !self.follow_links {
                    Ok(self.advance())
                } else if self.breadcrumbs.iter().any(|crumb| crumb.real == real) {
                    Err(JailError::SymlinkLoop(self.path.clone()))
                } else if self.hops >= LINK_HOPS {
                    log::debug!("resolve {:?} gave up after {} links", self.path, self.hops);
                    Err(JailError::SymlinkLoop(self.path.clone()))
                } else {
                    self.hops += 1;
                    self.breadcrumbs.push(Breadcrumb {
                        real: real.clone(),
                        rest: self.pending.len(),
                    });
                    Ok(Request::ReadLink(real))
                }
            }
        }
    }

    /// Feed in the target of the link from the last [Request::ReadLink]
    ///
    /// Targets are read in the jail's own namespace, so an absolute target
    /// restarts from the jail root no matter where it points for real.
    pub(crate) fn splice(&mut self, target: &str) -> Request {
        if LOCAL_STYLE.is_absolute(target) {
            self.ledger.clear();
        } else {
            self.ledger.pop();
        }
        for segment in owned_segments(target).rev() {
            self.pending.push_front(segment);
        }
        self.advance()
    }

    /// The directory from the last [Request::CreateDir] now exists
    pub(crate) fn created(&mut self) -> Request {
        self.settle();
        self.advance()
    }
}

fn owned_segments(path: &str) -> impl DoubleEndedIterator<Item = String> + '_ {
    LOCAL_STYLE.split(path).into_iter().map(str::to_string)
}

/// Resolve using the blocking backing operations
pub(crate) fn resolve<B: Backing + ?Sized>(
    backing: &B,
    mut walk: Walk<'_>,
) -> Result<String, JailError> {
    let mut request = walk.advance();
    loop {
        log::trace!("resolve {:?}, {:?}", walk.path(), request);
        request = match request {
            Request::Done(local) => {
                log::debug!("resolve {:?} -> {:?}", walk.path(), local);
                return Ok(local);
            }
            Request::Probe(real) => {
                let entity_type = backing.entity_type(&real, false)?;
                walk.classified(real, entity_type)?
            }
            Request::ReadLink(real) => {
                let target = backing.read_link(&real)?;
                walk.splice(&target)
            }
            Request::CreateDir(real) => {
                backing.create_dir(&real)?;
                walk.created()
            }
        };
    }
}

/// Resolve using the asynchronous backing operations, one at a time
pub(crate) async fn resolve_async<B: Backing + ?Sized>(
    backing: &B,
    mut walk: Walk<'_>,
) -> Result<String, JailError> {
    let mut request = walk.advance();
    loop {
        log::trace!("resolve_async {:?}, {:?}", walk.path(), request);
        request = match request {
            Request::Done(local) => {
                log::debug!("resolve_async {:?} -> {:?}", walk.path(), local);
                return Ok(local);
            }
            Request::Probe(real) => {
                let entity_type = backing.entity_type_async(&real, false).await?;
                walk.classified(real, entity_type)?
            }
            Request::ReadLink(real) => {
                let target = backing.read_link_async(&real).await?;
                walk.splice(&target)
            }
            Request::CreateDir(real) => {
                backing.create_dir_async(&real).await?;
                walk.created()
            }
        };
    }
}
