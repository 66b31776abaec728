//! Path conventions for the jail namespace and for backing filesystems
//!
//! Paths are plain strings here. A [PathStyle] knows how to find the root
//! prefix and the separators of one namespace, and a [PathContext] pairs a
//! style with a current directory so relative paths have an anchor.

/// Separator and root conventions of one path namespace
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathStyle {
    /// `/` separated, rooted at `/`
    Posix,
    /// `\` separated (`/` also accepted), rooted at a drive like `C:\`
    Windows,
}

impl PathStyle {
    /// The separator this style writes
    pub fn separator(self) -> char {
        match self {
            PathStyle::Posix => '/',
            PathStyle::Windows => '\\',
        }
    }

    /// Whether a character separates segments in this style
    pub fn is_separator(self, ch: char) -> bool {
        match self {
            PathStyle::Posix => ch == '/',
            PathStyle::Windows => ch == '\\' || ch == '/',
        }
    }

    /// Length in bytes of the root prefix, zero for relative paths
    pub fn root_len(self, path: &str) -> usize {
        match self {
            PathStyle::Posix => {
                if path.starts_with('/') {
                    1
                } else {
                    0
                }
            }
            PathStyle::Windows => {
                let bytes = path.as_bytes();
                if bytes.len() >= 3
                    && bytes[0].is_ascii_alphabetic()
                    && bytes[1] == b':'
                    && self.is_separator(bytes[2] as char)
                {
                    3
                } else if path.chars().next().map_or(false, |ch| self.is_separator(ch)) {
                    1
                } else {
                    0
                }
            }
        }
    }

    pub fn is_absolute(self, path: &str) -> bool {
        self.root_len(path) > 0
    }

    /// The root prefix of an absolute path, written with this style's
    /// separator. Empty for relative paths.
    pub fn root_prefix(self, path: &str) -> String {
        path[..self.root_len(path)]
            .chars()
            .map(|ch| {
                if self.is_separator(ch) {
                    self.separator()
                } else {
                    ch
                }
            })
            .collect()
    }

    /// Non-empty segments after the root prefix
    pub fn split(self, path: &str) -> Vec<&str> {
        path[self.root_len(path)..]
            .split(|ch| self.is_separator(ch))
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// Lexically collapse `.`, `..` and repeated separators
    ///
    /// `..` never rises above the root of an absolute path. Relative paths
    /// keep any leading `..` segments they can't collapse.
    pub fn normalize(self, path: &str) -> String {
        let root = self.root_prefix(path);
        let mut stack: Vec<&str> = Vec::new();
        for segment in self.split(path) {
            match segment {
                "." => {}
                ".." => match stack.last() {
                    Some(&last) if last != ".." => {
                        stack.pop();
                    }
                    _ if !root.is_empty() => {}
                    _ => stack.push(segment),
                },
                _ => stack.push(segment),
            }
        }
        if root.is_empty() && stack.is_empty() {
            return ".".to_string();
        }
        self.join_segments(&root, &stack)
    }

    /// Append segments to a prefix with exactly one separator between each
    pub fn join_segments<S: AsRef<str>>(self, prefix: &str, segments: &[S]) -> String {
        let mut result = prefix.to_string();
        for segment in segments {
            if !result.is_empty() && !result.ends_with(|ch| self.is_separator(ch)) {
                result.push(self.separator());
            }
            result.push_str(segment.as_ref());
        }
        result
    }
}

/// A path style with a current directory for relative operations
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathContext {
    style: PathStyle,
    current: String,
}

impl PathContext {
    pub fn new<S: Into<String>>(style: PathStyle, current: S) -> Self {
        PathContext {
            style,
            current: current.into(),
        }
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn separator(&self) -> char {
        self.style.separator()
    }

    pub fn is_absolute(&self, path: &str) -> bool {
        self.style.is_absolute(path)
    }

    pub fn split<'p>(&self, path: &'p str) -> Vec<&'p str> {
        self.style.split(path)
    }

    pub fn normalize(&self, path: &str) -> String {
        self.style.normalize(path)
    }

    /// Join a child onto a base; an absolute child replaces the base
    pub fn join(&self, base: &str, child: &str) -> String {
        if self.is_absolute(child) {
            child.to_string()
        } else if child.is_empty() {
            base.to_string()
        } else {
            self.style.join_segments(base, &[child])
        }
    }

    /// Normalized absolute form of a path, anchored at the current directory
    pub fn absolute(&self, path: &str) -> String {
        self.normalize(&self.join(&self.current, path))
    }

    /// Express `path` relative to the current directory
    ///
    /// Returns `.` for the current directory itself. Paths under a different
    /// root prefix can't be made relative and come back absolute.
    pub fn relative(&self, path: &str) -> String {
        let target = self.absolute(path);
        let from = self.absolute(&self.current);
        if self.style.root_prefix(&target) != self.style.root_prefix(&from) {
            return target;
        }
        let target_segments = self.split(&target);
        let from_segments = self.split(&from);
        let common = target_segments
            .iter()
            .zip(from_segments.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<&str> = Vec::new();
        parts.extend(std::iter::repeat("..").take(from_segments.len() - common));
        parts.extend(&target_segments[common..]);
        if parts.is_empty() {
            ".".to_string()
        } else {
            self.style.join_segments("", &parts)
        }
    }

    /// Everything before the last segment
    pub fn parent(&self, path: &str) -> String {
        let root = self.style.root_prefix(path);
        let segments = self.split(path);
        match segments.split_last() {
            Some((_, rest)) if !rest.is_empty() || !root.is_empty() => {
                self.style.join_segments(&root, rest)
            }
            _ if !root.is_empty() => root,
            _ => ".".to_string(),
        }
    }

    /// The last segment, or the empty string for a bare root
    pub fn basename<'p>(&self, path: &'p str) -> &'p str {
        self.split(path).last().copied().unwrap_or("")
    }
}
