use crate::{
    error::JobConfError,
    store::{ConfigStore, JobConf},
};
use std::{fs, path::Path};
use tracing::debug;

impl JobConf {
    /// Parse `key=value` lines. Blank lines and `#` comments are skipped and
    /// values may be wrapped in single or double quotes.
    pub fn parse(content: &str) -> Result<Self, JobConfError> {
        let mut conf = JobConf::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some(eq_pos) = line.find('=') else {
                return Err(JobConfError::Malformed {
                    line: line_num + 1,
                    reason: "expected KEY=VALUE".to_string(),
                });
            };

            let key = line[..eq_pos].trim();
            if key.is_empty() {
                return Err(JobConfError::Malformed {
                    line: line_num + 1,
                    reason: "empty key".to_string(),
                });
            }

            let value = unquote_value(&line[eq_pos + 1..]);
            conf.set(key, value);
        }

        Ok(conf)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, JobConfError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| JobConfError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let conf = Self::parse(&content)?;
        debug!(path = %path.display(), entries = conf.len(), "Loaded job file");
        Ok(conf)
    }

    /// Like [`JobConf::load`], but a missing file yields an empty configuration.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, JobConfError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(JobConf::new());
        }
        Self::load(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), JobConfError> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| JobConfError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        fs::write(path, self.render()).map_err(io_err)?;
        debug!(path = %path.display(), entries = self.len(), "Saved job file");
        Ok(())
    }

    /// Values with surrounding whitespace or quotes are written quoted so
    /// they survive a reload unchanged.
    fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.iter() {
            out.push_str(key);
            out.push('=');
            if needs_quotes(value) {
                out.push('"');
                out.push_str(value);
                out.push('"');
            } else {
                out.push_str(value);
            }
            out.push('\n');
        }
        out
    }
}

fn needs_quotes(value: &str) -> bool {
    value != value.trim() || value.starts_with('"') || value.starts_with('\'')
}

fn unquote_value(value: &str) -> &str {
    let value = value.trim();

    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        return &value[1..value.len() - 1];
    }

    value
}
