use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Identity of one stack frame, e.g. `"app::sort::merge_sort:42"`.
///
/// Cloning is a reference-count bump, so paths can be shared freely between
/// producers and the recording worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Frame(Arc<str>);

impl Frame {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Frame {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Frame {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Frame {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered call-stack identity, oldest caller first.
///
/// The empty path addresses the root of an aggregation tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CallPath(Vec<Frame>);

impl CallPath {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self(frames)
    }

    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn frames(&self) -> &[Frame] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `frame` appended as the innermost call.
    pub fn child(&self, frame: impl Into<Frame>) -> Self {
        let mut frames = Vec::with_capacity(self.0.len() + 1);
        frames.extend(self.0.iter().cloned());
        frames.push(frame.into());
        Self(frames)
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.0.push(frame);
    }

    pub(crate) fn pop(&mut self) -> Option<Frame> {
        self.0.pop()
    }
}

impl<F: Into<Frame>> FromIterator<F> for CallPath {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<F: Into<Frame>, const N: usize> From<[F; N]> for CallPath {
    fn from(frames: [F; N]) -> Self {
        frames.into_iter().collect()
    }
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, frame) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            f.write_str(frame.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_from_array() {
        let path = CallPath::from(["main", "run", "sort:12"]);
        assert_eq!(path.len(), 3);
        assert_eq!(path.frames()[2].as_str(), "sort:12");
        assert_eq!(path.to_string(), "main > run > sort:12");
    }

    #[test]
    fn test_child_does_not_modify_parent() {
        let parent = CallPath::from(["main"]);
        let child = parent.child("work");
        assert_eq!(parent.len(), 1);
        assert_eq!(child, CallPath::from(["main", "work"]));
    }

    #[test]
    fn test_root_display() {
        assert!(CallPath::root().is_empty());
        assert_eq!(CallPath::root().to_string(), "<root>");
    }
}
