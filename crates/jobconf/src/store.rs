use std::collections::BTreeMap;
use tracing::warn;

/// String-keyed job configuration with Hadoop-style typed accessors.
///
/// Implementors only provide raw string access and full key enumeration;
/// numeric and list encodings are layered on top by the provided methods so
/// every store agrees on the persisted representation.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str);

    /// All key/value pairs currently held by the store, in store order.
    fn entries(&self) -> Vec<(String, String)>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get_i32(&self, key: &str) -> Option<i32> {
        let raw = self.get(key)?;
        match parse_i64(&raw).and_then(|v| i32::try_from(v).ok()) {
            Some(value) => Some(value),
            None => {
                warn!(key, value = %raw, "Ignoring non-integer configuration value");
                None
            }
        }
    }

    fn get_i32_or(&self, key: &str, default: i32) -> i32 {
        self.get_i32(key).unwrap_or(default)
    }

    fn set_i32(&mut self, key: &str, value: i32) {
        self.set(key, &value.to_string());
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        let raw = self.get(key)?;
        match parse_i64(&raw) {
            Some(value) => Some(value),
            None => {
                warn!(key, value = %raw, "Ignoring non-integer configuration value");
                None
            }
        }
    }

    fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get_i64(key).unwrap_or(default)
    }

    fn set_i64(&mut self, key: &str, value: i64) {
        self.set(key, &value.to_string());
    }

    /// Comma-delimited list. An empty stored value is an empty list.
    fn get_strings(&self, key: &str) -> Option<Vec<String>> {
        let raw = self.get(key)?;
        if raw.is_empty() {
            return Some(Vec::new());
        }
        Some(raw.split(',').map(str::to_string).collect())
    }

    fn set_strings(&mut self, key: &str, values: &[&str]) {
        self.set(key, &values.join(","));
    }

    fn entries_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        strip_prefixed(self.entries(), prefix)
    }
}

/// Selects the entries living under `prefix` and returns them with the prefix
/// removed. A key equal to the prefix itself carries no name and is skipped.
pub fn strip_prefixed<I, K, V>(entries: I, prefix: &str) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    entries
        .into_iter()
        .filter_map(|(key, value)| {
            let name = key.as_ref().strip_prefix(prefix)?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.into()))
        })
        .collect()
}

/// Decimal, or hexadecimal with a `0x` / `-0x` prefix.
fn parse_i64(raw: &str) -> Option<i64> {
    let value = raw.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        let magnitude = i64::from_str_radix(hex, 16).ok()?;
        return Some(if negative { -magnitude } else { magnitude });
    }

    value.parse().ok()
}

/// In-memory job configuration, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobConf {
    entries: BTreeMap<String, String>,
}

impl JobConf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unset(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ConfigStore for JobConf {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for JobConf {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.entries.insert(key.into(), value.into());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobConf {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut conf = JobConf::new();
        conf.extend(iter);
        conf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_string() {
        let mut conf = JobConf::new();
        assert_eq!(conf.get("a.b"), None);
        assert!(!conf.contains("a.b"));

        conf.set("a.b", "value");
        assert_eq!(conf.get("a.b"), Some("value".to_string()));
        assert!(conf.contains("a.b"));

        conf.set("a.b", "other");
        assert_eq!(conf.get("a.b"), Some("other".to_string()));
        assert_eq!(conf.len(), 1);
    }

    #[test]
    fn test_integers() {
        let mut conf = JobConf::new();
        conf.set_i32("chunks", 42);
        conf.set_i64("min", -1);
        conf.set_i64("max", i64::MAX);

        assert_eq!(conf.get("chunks"), Some("42".to_string()));
        assert_eq!(conf.get_i32("chunks"), Some(42));
        assert_eq!(conf.get_i64("min"), Some(-1));
        assert_eq!(conf.get_i64("max"), Some(i64::MAX));
        assert_eq!(conf.get_i32_or("missing", 10), 10);
        assert_eq!(conf.get_i64_or("missing", 7), 7);
    }

    #[test]
    fn test_hex_and_whitespace() {
        let conf: JobConf = [("h", "0x1F"), ("n", "-0x10"), ("w", "  12 ")]
            .into_iter()
            .collect();

        assert_eq!(conf.get_i32("h"), Some(31));
        assert_eq!(conf.get_i64("n"), Some(-16));
        assert_eq!(conf.get_i32("w"), Some(12));
    }

    #[test]
    fn test_unparsable_integer_falls_back() {
        let conf: JobConf = [("bad", "ten"), ("big", "9999999999")].into_iter().collect();

        assert_eq!(conf.get_i32("bad"), None);
        assert_eq!(conf.get_i32_or("bad", 10), 10);
        // Fits an i64 but not an i32.
        assert_eq!(conf.get_i32("big"), None);
        assert_eq!(conf.get_i64("big"), Some(9_999_999_999));
    }

    #[test]
    fn test_strings_preserve_order() {
        let mut conf = JobConf::new();
        conf.set_strings("cols", &["id", "name", "created_at"]);

        assert_eq!(conf.get("cols"), Some("id,name,created_at".to_string()));
        assert_eq!(
            conf.get_strings("cols"),
            Some(vec![
                "id".to_string(),
                "name".to_string(),
                "created_at".to_string()
            ])
        );
        assert_eq!(conf.get_strings("missing"), None);

        conf.set_strings("empty", &[]);
        assert_eq!(conf.get_strings("empty"), Some(Vec::new()));
    }

    #[test]
    fn test_strip_prefixed() {
        let entries = vec![
            ("driver.ssl", "true"),
            ("driver.", "nameless"),
            ("other.key", "x"),
            ("driver.fetchSize", "50"),
        ];

        let stripped = strip_prefixed(entries, "driver.");
        assert_eq!(
            stripped,
            vec![
                ("ssl".to_string(), "true".to_string()),
                ("fetchSize".to_string(), "50".to_string())
            ]
        );
    }

    #[test]
    fn test_entries_with_prefix_scans_store() {
        let mut conf = JobConf::new();
        conf.set("p.a", "1");
        conf.set("q.b", "2");
        conf.set("p.c", "3");

        let found = conf.entries_with_prefix("p.");
        assert_eq!(
            found,
            vec![
                ("a".to_string(), "1".to_string()),
                ("c".to_string(), "3".to_string())
            ]
        );
    }

    #[test]
    fn test_unset() {
        let mut conf = JobConf::new();
        conf.set("k", "v");
        assert_eq!(conf.unset("k"), Some("v".to_string()));
        assert!(conf.is_empty());
    }
}
