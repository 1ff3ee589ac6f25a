use std::borrow::Cow;
use std::fmt;

/// One step in a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Key(Cow<'static, str>),
    Index(usize),
}

/// Location of a value inside an envelope, e.g. `journal[2].object.partNums[4]`.
///
/// Decoders keep one path and push/pop as they descend; it is only cloned
/// when an error is raised.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from a single static key.
    pub fn key(key: &'static str) -> Self {
        Self(vec![Segment::Key(Cow::Borrowed(key))])
    }

    pub fn push_key(&mut self, key: &'static str) {
        self.0.push(Segment::Key(Cow::Borrowed(key)));
    }

    /// Push a key that only exists at runtime (e.g. an unknown field name).
    pub fn push_owned_key(&mut self, key: String) {
        self.0.push(Segment::Key(Cow::Owned(key)));
    }

    pub fn push_index(&mut self, index: usize) {
        self.0.push(Segment::Index(index));
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// A copy of this path extended by one key.
    pub fn child(&self, key: &'static str) -> Self {
        let mut path = self.clone();
        path.push_key(key);
        path
    }

    /// A copy of this path extended by one index.
    pub fn at(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.push_index(index);
        path
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Segment::Key(k) if i == 0 => write!(f, "{k}")?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}
