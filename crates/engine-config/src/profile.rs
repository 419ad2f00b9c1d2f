use crate::error::ConfigError;
use connectors::profile::PrivateKeyPem;
use serde::Deserialize;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

/// Contents of `profile.json`. Optional connection fields override the
/// matching `snowflake.*` properties.
#[derive(Clone, Deserialize)]
pub struct ProfileFile {
    pub account: String,
    pub user: String,
    pub url: String,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

impl fmt::Debug for ProfileFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileFile")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("url", &self.url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("private_key_file", &self.private_key_file)
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .finish()
    }
}

impl ProfileFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Profile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Inline key wins over `private_key_file`. A relative key file path is
    /// resolved against the profile's directory.
    pub fn resolve_private_key(&self, profile_dir: &Path) -> Result<PrivateKeyPem, ConfigError> {
        if let Some(pem) = self.private_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(PrivateKeyPem::new(pem));
        }

        let Some(file) = &self.private_key_file else {
            return Err(ConfigError::MissingKey(
                "private_key or private_key_file".to_string(),
            ));
        };

        let path = if file.is_absolute() {
            file.clone()
        } else {
            profile_dir.join(file)
        };
        let pem = fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?;
        Ok(PrivateKeyPem::new(pem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn loads_inline_key() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"account":"xy12345","user":"ingest","url":"https://xy12345.snowflakecomputing.com","private_key":"MIIE","warehouse":"WH"}}"#
        )
        .unwrap();

        let profile = ProfileFile::load(file.path()).unwrap();
        assert_eq!(profile.account, "xy12345");
        assert_eq!(profile.warehouse.as_deref(), Some("WH"));
        assert_eq!(profile.role, None);

        let key = profile.resolve_private_key(Path::new(".")).unwrap();
        assert_eq!(key.expose(), "MIIE");
        assert!(!format!("{profile:?}").contains("MIIE"));
    }

    #[test]
    fn resolves_relative_key_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("rsa_key.p8"), "PEM BODY").unwrap();

        let profile: ProfileFile = serde_json::from_str(
            r#"{"account":"a","user":"u","url":"https://a","private_key_file":"rsa_key.p8"}"#,
        )
        .unwrap();

        let key = profile.resolve_private_key(dir.path()).unwrap();
        assert_eq!(key.expose(), "PEM BODY");
    }

    #[test]
    fn missing_key_material_is_an_error() {
        let profile: ProfileFile =
            serde_json::from_str(r#"{"account":"a","user":"u","url":"https://a"}"#).unwrap();
        assert!(matches!(
            profile.resolve_private_key(Path::new(".")),
            Err(ConfigError::MissingKey(_))
        ));
    }

    #[test]
    fn malformed_json_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(
            ProfileFile::load(file.path()),
            Err(ConfigError::Profile { .. })
        ));
    }
}
