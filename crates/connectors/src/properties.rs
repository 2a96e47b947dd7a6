use std::{collections::BTreeMap, fmt};

/// Key under which the configured username is handed to drivers.
pub const USER_KEY: &str = "user";
/// Key under which the configured password is handed to drivers.
pub const PASSWORD_KEY: &str = "password";

const REDACTED: &str = "***";

const SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "auth",
    "credential",
    "private",
];

/// Whether a property name looks like it carries a secret.
pub fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_PATTERNS.iter().any(|pattern| key.contains(pattern))
}

/// Named string values handed to a driver alongside the URL: credentials
/// under `user`/`password` plus any ad-hoc driver settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DriverProperties {
    inner: BTreeMap<String, String>,
}

impl DriverProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.inner.remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn user(&self) -> Option<&str> {
        self.get(USER_KEY)
    }

    pub fn password(&self) -> Option<&str> {
        self.get(PASSWORD_KEY)
    }

    /// Everything except `user` and `password`, which drivers apply through
    /// their dedicated credential setters.
    pub fn without_credentials(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .filter(|(key, _)| *key != USER_KEY && *key != PASSWORD_KEY)
    }

    /// Copy safe to print or log, with sensitive values masked.
    pub fn redacted(&self) -> BTreeMap<String, String> {
        self.inner
            .iter()
            .map(|(key, value)| {
                let shown = if is_sensitive(key) {
                    REDACTED.to_string()
                } else {
                    value.clone()
                };
                (key.clone(), shown)
            })
            .collect()
    }
}

impl fmt::Debug for DriverProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.redacted()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DriverProperties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut props = DriverProperties::new();
        props.extend(iter);
        props
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for DriverProperties {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.inner.insert(key.into(), value.into());
        }
    }
}

impl IntoIterator for DriverProperties {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}
