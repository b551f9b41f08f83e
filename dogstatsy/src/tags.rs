use std::borrow::Cow;

use indexmap::IndexMap;

/// An owned or static string used for tag keys and values.
pub type SharedString = Cow<'static, str>;

/// Metadata attached to a metric in the form of a key/value pair.
///
/// Tags are written to the wire as `key:value`. Neither part is escaped, so callers must avoid the protocol delimiters
/// (`:`, `,` and `|`) in both keys and values.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Tag(SharedString, SharedString);

impl Tag {
    /// Creates a [`Tag`] from a key and value.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<SharedString>,
        V: Into<SharedString>,
    {
        Tag(key.into(), value.into())
    }

    /// Creates a [`Tag`] from a static key and value.
    pub const fn from_static_parts(key: &'static str, value: &'static str) -> Self {
        Tag(Cow::Borrowed(key), Cow::Borrowed(value))
    }

    /// Key of this tag.
    pub fn key(&self) -> &str {
        self.0.as_ref()
    }

    /// Value of this tag.
    pub fn value(&self) -> &str {
        self.1.as_ref()
    }

    /// Consumes this [`Tag`], returning the key and value.
    pub fn into_parts(self) -> (SharedString, SharedString) {
        (self.0, self.1)
    }
}

impl<K, V> From<(K, V)> for Tag
where
    K: Into<SharedString>,
    V: Into<SharedString>,
{
    fn from(pair: (K, V)) -> Tag {
        Tag::new(pair.0, pair.1)
    }
}

/// An insertion-ordered set of tags with unique keys.
///
/// Used for the default tags of a client. Inserting a key that already exists replaces its value but keeps its original
/// position, so the order in which tags are written is always the order in which their keys were first inserted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: IndexMap<SharedString, SharedString>,
}

impl TagSet {
    /// Creates an empty `TagSet`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag, returning the previous value if the key was already present.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<SharedString>
    where
        K: Into<SharedString>,
        V: Into<SharedString>,
    {
        self.tags.insert(key.into(), value.into())
    }

    /// Returns the value for the given key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(AsRef::as_ref)
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates over the tags as `(key, value)` pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_ref(), v.as_ref()))
    }
}

impl Extend<Tag> for TagSet {
    fn extend<I: IntoIterator<Item = Tag>>(&mut self, iter: I) {
        for tag in iter {
            let (key, value) = tag.into_parts();
            self.tags.insert(key, value);
        }
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        tags.extend(iter);
        tags
    }
}
