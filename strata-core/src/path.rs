//! Addressing primitives: keys, key-sets, paths and path-sets.
//!
//! A [`Path`] names exactly one location in a JSON graph. A [`PathSet`] names
//! many locations at once: each of its segments is a [`KeySet`] (a single key,
//! an inclusive integer [`Range`], or a list of either), and the path-set
//! addresses the Cartesian product of its segment expansions.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// One segment of a concrete path.
///
/// Integer keys and string keys share one key space: the string `"7"` is the
/// same key as the integer `7`, as in JSON object semantics. Constructors
/// canonicalize accordingly. Integer keys order before string keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Integer(i64),
    Name(String),
}

impl Key {
    /// Build a key from a string, canonicalizing integer spellings.
    pub fn name(name: impl Into<String>) -> Self {
        let name = name.into();
        match canonical_integer(&name) {
            Some(n) => Key::Integer(n),
            None => Key::Name(name),
        }
    }

    /// The integer value of this key, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Key::Integer(n) => Some(*n),
            Key::Name(_) => None,
        }
    }

    /// JSON rendering: a number for integer keys, a string otherwise.
    pub fn to_json(&self) -> Value {
        match self {
            Key::Integer(n) => Value::from(*n),
            Key::Name(s) => Value::from(s.as_str()),
        }
    }
}

/// JSON array rendering of a path, as used in messages and references.
pub fn path_to_json(path: &[Key]) -> Value {
    Value::Array(path.iter().map(Key::to_json).collect())
}

fn canonical_integer(s: &str) -> Option<i64> {
    let n = s.parse::<i64>().ok()?;
    (n.to_string() == s).then_some(n)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Integer(n) => write!(f, "{n}"),
            Key::Name(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Integer(n)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::name(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::name(s)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Key::Integer(n) => serializer.serialize_i64(*n),
            Key::Name(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawKey {
            Integer(i64),
            Name(String),
        }

        Ok(match RawKey::deserialize(deserializer)? {
            RawKey::Integer(n) => Key::Integer(n),
            RawKey::Name(s) => Key::name(s),
        })
    }
}

/// A concrete path: one key per level of the graph.
pub type Path = Vec<Key>;

/// Inclusive integer range `{from, to}`.
///
/// A range whose `to` is below its `from` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub from: i64,
    pub to: i64,
}

impl Range {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// Range covering `length` keys starting at `from`.
    pub fn with_length(from: i64, length: i64) -> Self {
        Self {
            from,
            to: from.saturating_add(length).saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }

    /// Number of keys in the range, saturating at `u64::MAX` for the full
    /// `i64` span.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.to.abs_diff(self.from).saturating_add(1)
        }
    }

    /// Keys in ascending order.
    pub fn iter(&self) -> std::ops::RangeInclusive<i64> {
        self.from..=self.to
    }
}

impl<'de> Deserialize<'de> for Range {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct RawRange {
            #[serde(default)]
            from: i64,
            to: Option<i64>,
            length: Option<i64>,
        }

        let raw = RawRange::deserialize(deserializer)?;
        match (raw.to, raw.length) {
            (Some(to), None) => Ok(Range::new(raw.from, to)),
            (None, Some(length)) => Ok(Range::with_length(raw.from, length)),
            (Some(_), Some(_)) => Err(de::Error::custom(
                "range must specify either `to` or `length`, not both",
            )),
            (None, None) => Err(de::Error::custom("range must specify `to` or `length`")),
        }
    }
}

/// One segment of a path-set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySet {
    Key(Key),
    Range(Range),
    /// Ordered alternatives; items may themselves be ranges.
    List(Vec<KeySet>),
}

impl KeySet {
    /// List key-set from anything convertible into key-sets.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<KeySet>,
    {
        KeySet::List(items.into_iter().map(Into::into).collect())
    }

    /// Concrete keys in visiting order: list order, ranges ascending.
    pub fn keys(&self) -> Box<dyn Iterator<Item = Key> + '_> {
        match self {
            KeySet::Key(key) => Box::new(std::iter::once(key.clone())),
            KeySet::Range(range) => Box::new(range.iter().map(Key::Integer)),
            KeySet::List(items) => Box::new(items.iter().flat_map(|item| item.keys())),
        }
    }

    /// Build the most compact key-set for an ordered list of keys.
    ///
    /// Runs of consecutive integers become ranges; a single resulting item is
    /// returned unwrapped.
    pub fn from_keys(keys: Vec<Key>) -> Self {
        let mut items: Vec<KeySet> = Vec::new();
        let mut run: Option<Range> = None;

        for key in keys {
            match key {
                Key::Integer(n) => {
                    let extends = matches!(run, Some(r) if r.to.checked_add(1) == Some(n));
                    if extends {
                        if let Some(r) = run.as_mut() {
                            r.to = n;
                        }
                    } else {
                        flush_run(&mut items, run.take());
                        run = Some(Range::new(n, n));
                    }
                }
                Key::Name(_) => {
                    flush_run(&mut items, run.take());
                    items.push(KeySet::Key(key));
                }
            }
        }
        flush_run(&mut items, run);

        if items.len() == 1 {
            items.remove(0)
        } else {
            KeySet::List(items)
        }
    }
}

fn flush_run(items: &mut Vec<KeySet>, run: Option<Range>) {
    match run {
        Some(r) if r.from == r.to => items.push(KeySet::Key(Key::Integer(r.from))),
        Some(r) => items.push(KeySet::Range(r)),
        None => {}
    }
}

impl From<Key> for KeySet {
    fn from(key: Key) -> Self {
        KeySet::Key(key)
    }
}

impl From<&str> for KeySet {
    fn from(s: &str) -> Self {
        KeySet::Key(Key::name(s))
    }
}

impl From<String> for KeySet {
    fn from(s: String) -> Self {
        KeySet::Key(Key::name(s))
    }
}

impl From<i64> for KeySet {
    fn from(n: i64) -> Self {
        KeySet::Key(Key::Integer(n))
    }
}

impl From<Range> for KeySet {
    fn from(range: Range) -> Self {
        KeySet::Range(range)
    }
}

impl From<Vec<KeySet>> for KeySet {
    fn from(items: Vec<KeySet>) -> Self {
        KeySet::List(items)
    }
}

/// Ordered sequence of key-sets addressing many concrete paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathSet(Vec<KeySet>);

impl PathSet {
    pub fn new(segments: Vec<KeySet>) -> Self {
        Self(segments)
    }

    /// Path-set addressing exactly one concrete path.
    pub fn from_path(path: &[Key]) -> Self {
        Self(path.iter().cloned().map(KeySet::Key).collect())
    }

    pub fn segments(&self) -> &[KeySet] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every concrete path addressed, in traversal order.
    pub fn expand(&self) -> Vec<Path> {
        if self.0.is_empty() {
            return Vec::new();
        }
        self.0.iter().fold(vec![Vec::new()], |prefixes, segment| {
            prefixes
                .iter()
                .flat_map(|prefix| {
                    segment.keys().map(move |key| {
                        let mut path = prefix.clone();
                        path.push(key);
                        path
                    })
                })
                .collect()
        })
    }
}

impl From<Vec<KeySet>> for PathSet {
    fn from(segments: Vec<KeySet>) -> Self {
        Self(segments)
    }
}

impl FromIterator<KeySet> for PathSet {
    fn from_iter<I: IntoIterator<Item = KeySet>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Build a [`Path`] from key literals: `path!["users", 1, "name"]`.
#[macro_export]
macro_rules! path {
    ($($key:expr),* $(,)?) => {{
        let path: $crate::Path = vec![$($crate::Key::from($key)),*];
        path
    }};
}

/// Build a [`PathSet`] from key-set literals: `path_set!["users", Range::new(0, 2), "name"]`.
#[macro_export]
macro_rules! path_set {
    ($($segment:expr),* $(,)?) => {
        $crate::PathSet::new(vec![$($crate::KeySet::from($segment)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_strings_are_canonicalized() {
        assert_eq!(Key::from("7"), Key::Integer(7));
        assert_eq!(Key::from("-3"), Key::Integer(-3));
        assert_eq!(Key::from("07"), Key::Name("07".to_string()));
        assert_eq!(Key::from("+7"), Key::Name("+7".to_string()));
        assert_eq!(Key::from("name"), Key::Name("name".to_string()));
    }

    #[test]
    fn test_integers_order_before_names() {
        let mut keys = vec![Key::from("b"), Key::from(10), Key::from("a"), Key::from(2)];
        keys.sort();
        assert_eq!(
            keys,
            vec![Key::from(2), Key::from(10), Key::from("a"), Key::from("b")]
        );
    }

    #[test]
    fn test_range_len_and_emptiness() {
        assert_eq!(Range::new(0, 2).len(), 3);
        assert!(Range::new(3, 2).is_empty());
        assert_eq!(Range::new(3, 2).len(), 0);
        assert_eq!(Range::with_length(5, 3), Range::new(5, 7));
        assert!(Range::with_length(5, 0).is_empty());
    }

    #[test]
    fn test_range_len_saturates_on_full_span() {
        assert_eq!(Range::new(i64::MIN, i64::MAX).len(), u64::MAX);
        assert_eq!(Range::new(i64::MIN, i64::MIN).len(), 1);
    }

    #[test]
    fn test_keyset_keys_visit_in_order() {
        let set = KeySet::List(vec![Range::new(0, 1).into(), 24.into(), "x".into()]);
        let keys: Vec<Key> = set.keys().collect();
        assert_eq!(keys, vec![Key::from(0), Key::from(1), Key::from(24), Key::from("x")]);
    }

    #[test]
    fn test_keyset_from_keys_builds_ranges() {
        let set = KeySet::from_keys(vec![
            Key::from(0),
            Key::from(1),
            Key::from(2),
            Key::from(5),
            Key::from("name"),
        ]);
        assert_eq!(
            set,
            KeySet::List(vec![Range::new(0, 2).into(), 5.into(), "name".into()])
        );

        assert_eq!(KeySet::from_keys(vec![Key::from("a")]), KeySet::from("a"));
        assert_eq!(
            KeySet::from_keys(vec![Key::from(3), Key::from(4)]),
            KeySet::Range(Range::new(3, 4))
        );
    }

    #[test]
    fn test_path_set_deserializes_complex_segments() {
        let sets: Vec<PathSet> = serde_json::from_value(json!([
            ["byId", [{"from": 0, "to": 1}, 24], "msg"],
            ["list", {"from": 2, "length": 2}, ["a", "b"]]
        ]))
        .expect("valid path sets");

        assert_eq!(
            sets[0],
            path_set![
                "byId",
                vec![KeySet::from(Range::new(0, 1)), KeySet::from(24)],
                "msg"
            ]
        );
        assert_eq!(
            sets[1],
            path_set!["list", Range::new(2, 3), KeySet::list(["a", "b"])]
        );
    }

    #[test]
    fn test_range_rejects_ambiguous_bounds() {
        let result: Result<Range, _> =
            serde_json::from_value(json!({"from": 0, "to": 1, "length": 2}));
        assert!(result.is_err());
        let result: Result<Range, _> = serde_json::from_value(json!({"from": 0}));
        assert!(result.is_err());
    }

    #[test]
    fn test_path_set_expand_is_cartesian() {
        let set = path_set!["u", Range::new(0, 1), KeySet::list(["a", "b"])];
        assert_eq!(
            set.expand(),
            vec![
                path!["u", 0, "a"],
                path!["u", 0, "b"],
                path!["u", 1, "a"],
                path!["u", 1, "b"],
            ]
        );
        assert!(PathSet::default().expand().is_empty());
    }

    #[test]
    fn test_key_serializes_as_scalar() {
        let path = path!["u", 1, "name"];
        assert_eq!(serde_json::to_value(&path).expect("serialize"), json!(["u", 1, "name"]));
    }
}
