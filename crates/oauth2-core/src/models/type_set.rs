use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An immutable, order-independent collection of string tokens.
///
/// Response types such as `code id_token` are sets: a request for
/// `id_token code` must match a handler registered for `code id_token`.
/// Equality is therefore set equality, while [`fmt::Display`] keeps the
/// original insertion order so the wire form can be reproduced.
#[derive(Debug, Clone, Default)]
pub struct TypeSet {
    items: Vec<String>,
}

impl TypeSet {
    /// Build a set from a space-delimited string.
    pub fn parse(value: &str) -> Self {
        Self {
            items: value.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.items.iter().any(|item| item == token)
    }

    pub fn contains_any<I, S>(&self, tokens: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens.into_iter().any(|t| self.contains(t.as_ref()))
    }

    /// Order-independent set equality.
    pub fn equal_to(&self, other: &TypeSet) -> bool {
        self.len() == other.len()
            && other.iter().all(|t| self.contains(t))
            && self.iter().all(|t| other.contains(t))
    }

    /// Set equality against a raw token list.
    pub fn equal_to_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        self.equal_to(&TypeSet::from_tokens(tokens.iter().map(|t| t.as_ref())))
    }
}

impl PartialEq for TypeSet {
    fn eq(&self, other: &Self) -> bool {
        self.equal_to(other)
    }
}

impl Eq for TypeSet {}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.items.join(" "))
    }
}

impl From<&str> for TypeSet {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for TypeSet {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Vec<String>> for TypeSet {
    fn from(items: Vec<String>) -> Self {
        Self { items }
    }
}

impl From<Vec<&str>> for TypeSet {
    fn from(items: Vec<&str>) -> Self {
        Self::from_tokens(items)
    }
}

impl Serialize for TypeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TypeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Joined(String),
            Tokens(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Joined(s) => TypeSet::parse(&s),
            Repr::Tokens(items) => TypeSet::from(items),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token() {
        let set = TypeSet::from(vec!["a"]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.to_string(), "a");
        assert!(set.equal_to(&TypeSet::from(vec!["a"])));
        assert!(set.equal_to_tokens(&["a"]));
        assert!(!set.equal_to(&TypeSet::from(vec!["a", "b"])));
    }

    #[test]
    fn equality_ignores_order() {
        let ab = TypeSet::from(vec!["a", "b"]);
        let ba = TypeSet::from(vec!["b", "a"]);
        assert!(ab.equal_to(&ba));
        assert!(ba.equal_to(&ab));
        assert!(ab.equal_to(&ab));
        assert_eq!(ab, ba);
    }

    #[test]
    fn subsets_and_supersets_are_not_equal() {
        let ab = TypeSet::from(vec!["a", "b"]);
        assert!(!ab.equal_to(&TypeSet::from(vec!["a"])));
        assert!(!ab.equal_to(&TypeSet::from(vec!["a", "b", "c"])));
    }

    #[test]
    fn duplicates_do_not_fake_equality() {
        let aa = TypeSet::from(vec!["a", "a"]);
        let ab = TypeSet::from(vec!["a", "b"]);
        assert!(!aa.equal_to(&ab));
        assert!(!ab.equal_to(&aa));
    }

    #[test]
    fn contains_and_contains_any() {
        let set = TypeSet::parse("a b");
        assert!(set.contains("a"));
        assert!(set.contains("b"));
        assert!(!set.contains("c"));
        assert!(set.contains_any(["1", "a"]));
        assert!(set.contains_any(["2", "b"]));
        assert!(!set.contains_any(["3", "c"]));
    }

    #[test]
    fn parses_space_separated_strings_in_order() {
        let set = TypeSet::parse("foo bar");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["foo", "bar"]);
        assert_eq!(set.to_string(), "foo bar");

        let single = TypeSet::parse("foobar");
        assert_eq!(single.len(), 1);
        assert_eq!(single.to_string(), "foobar");
    }

    #[test]
    fn serde_accepts_string_or_list() {
        let from_str: TypeSet = serde_json::from_str("\"code id_token\"").unwrap();
        let from_list: TypeSet = serde_json::from_str("[\"id_token\",\"code\"]").unwrap();
        assert_eq!(from_str, from_list);
        assert_eq!(serde_json::to_string(&from_str).unwrap(), "\"code id_token\"");
    }
}
