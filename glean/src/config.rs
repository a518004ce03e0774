use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{GleanError, Result};

/// Character budget applied to aggregated OCR output when none is given.
pub const DEFAULT_MAX_CHARS: usize = 4000;

const DEFAULT_RESOURCE_DIR: &str = "/var/lib/glean/ocr";
const DEFAULT_SERVICE_CONF: &str = "conf/service_conf.yaml";

const DEFAULT_STORE_HOST: &str = "minio:9000";
const DEFAULT_STORE_USER: &str = "rag_flow";
const DEFAULT_STORE_PASSWORD: &str = "infini_rag_flow";

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ocr: OcrConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Directory holding the primary engine's detection and recognition models.
    pub resource_dir: PathBuf,
    pub language: String,
    pub angle_classification: bool,
    pub tessdata_dir: Option<PathBuf>,
    pub max_chars: usize,
    pub max_image_dimension: u32,
}

impl OcrConfig {
    pub fn detection_model_path(&self) -> PathBuf {
        self.resource_dir.join("text-detection.rten")
    }

    pub fn recognition_model_path(&self) -> PathBuf {
        self.resource_dir.join("text-recognition.rten")
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            resource_dir: env::var("OCR_RESOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_RESOURCE_DIR)),
            language: env::var("OCR_LANG").unwrap_or_else(|_| "ch".to_string()),
            angle_classification: parse_env_or("OCR_ANGLE_CLS", true),
            tessdata_dir: env::var("OCR_TESSDATA_DIR").ok().map(PathBuf::from),
            max_chars: parse_env_or("OCR_MAX_CHARS", DEFAULT_MAX_CHARS),
            max_image_dimension: parse_env_or("OCR_MAX_DIMENSION", 4096),
        }
    }
}

/// Object-store connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Either a bare `host:port` or a full `http(s)://host:port` URL.
    pub host: String,
    pub access_key: String,
    pub secret_key: String,
    pub timeout_secs: u64,
}

/// The `minio` section of the service configuration file.
#[derive(Debug, Default, Deserialize)]
struct MinioSection {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

fn load_minio_section(path: &Path) -> MinioSection {
    let settings = ::config::Config::builder()
        .add_source(
            ::config::File::from(path)
                .format(::config::FileFormat::Yaml)
                .required(false),
        )
        .build();

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Unreadable service config: {}. Using defaults.", e);
            return MinioSection::default();
        }
    };

    match settings.get::<MinioSection>("minio") {
        Ok(section) => section,
        Err(::config::ConfigError::NotFound(_)) => MinioSection::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Invalid minio section: {}. Using defaults.", e);
            MinioSection::default()
        }
    }
}

impl StorageConfig {
    /// Build storage settings from a YAML service config, then apply
    /// `OBJECT_STORE_*` environment overrides.
    pub fn load(service_conf: &Path) -> Self {
        let section = load_minio_section(service_conf);

        Self {
            host: env::var("OBJECT_STORE_HOST")
                .ok()
                .or(section.host)
                .unwrap_or_else(|| DEFAULT_STORE_HOST.to_string()),
            access_key: env::var("OBJECT_STORE_ACCESS_KEY")
                .ok()
                .or(section.user)
                .unwrap_or_else(|| DEFAULT_STORE_USER.to_string()),
            secret_key: env::var("OBJECT_STORE_SECRET_KEY")
                .ok()
                .or(section.password)
                .unwrap_or_else(|| DEFAULT_STORE_PASSWORD.to_string()),
            timeout_secs: parse_env_or("OBJECT_STORE_TIMEOUT", 30),
        }
    }

    pub fn endpoint(&self) -> Result<ObjectStoreEndpoint> {
        ObjectStoreEndpoint::parse(&self.host)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let path = env::var("SERVICE_CONF").unwrap_or_else(|_| DEFAULT_SERVICE_CONF.to_string());
        Self::load(Path::new(&path))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreEndpoint {
    /// `host[:port]` without scheme.
    pub endpoint: String,
    pub secure: bool,
}

impl ObjectStoreEndpoint {
    pub fn parse(host: &str) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(GleanError::Config("object store host is empty".to_string()));
        }

        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Ok(Self {
                endpoint: host.trim_end_matches('/').to_string(),
                secure: false,
            });
        }

        let url = Url::parse(host)?;
        let hostname = url
            .host_str()
            .ok_or_else(|| GleanError::Config(format!("object store host has no hostname: {host}")))?;
        let endpoint = match url.port() {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname.to_string(),
        };

        Ok(Self {
            endpoint,
            secure: url.scheme() == "https",
        })
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.endpoint)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_storage_env() {
        env::remove_var("OBJECT_STORE_HOST");
        env::remove_var("OBJECT_STORE_ACCESS_KEY");
        env::remove_var("OBJECT_STORE_SECRET_KEY");
        env::remove_var("OBJECT_STORE_TIMEOUT");
    }

    #[test]
    #[serial]
    fn test_ocr_config_defaults() {
        env::remove_var("OCR_RESOURCE_DIR");
        env::remove_var("OCR_LANG");
        env::remove_var("OCR_ANGLE_CLS");
        env::remove_var("OCR_MAX_CHARS");

        let config = OcrConfig::default();
        assert_eq!(config.resource_dir, PathBuf::from(DEFAULT_RESOURCE_DIR));
        assert_eq!(config.language, "ch");
        assert!(config.angle_classification);
        assert_eq!(config.max_chars, 4000);
        assert_eq!(
            config.detection_model_path(),
            PathBuf::from(DEFAULT_RESOURCE_DIR).join("text-detection.rten")
        );
    }

    #[test]
    #[serial]
    fn test_ocr_config_from_env() {
        env::set_var("OCR_RESOURCE_DIR", "/models");
        env::set_var("OCR_LANG", "en");
        env::set_var("OCR_ANGLE_CLS", "false");
        env::set_var("OCR_MAX_CHARS", "not-a-number");

        let config = OcrConfig::default();
        assert_eq!(config.resource_dir, PathBuf::from("/models"));
        assert_eq!(config.language, "en");
        assert!(!config.angle_classification);
        assert_eq!(config.max_chars, DEFAULT_MAX_CHARS);

        env::remove_var("OCR_RESOURCE_DIR");
        env::remove_var("OCR_LANG");
        env::remove_var("OCR_ANGLE_CLS");
        env::remove_var("OCR_MAX_CHARS");
    }

    #[test]
    #[serial]
    fn test_storage_config_missing_file_uses_default_tuple() {
        clear_storage_env();
        let config = StorageConfig::load(Path::new("/nonexistent/service_conf.yaml"));
        assert_eq!(config.host, "minio:9000");
        assert_eq!(config.access_key, "rag_flow");
        assert_eq!(config.secret_key, "infini_rag_flow");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    #[serial]
    fn test_storage_config_reads_minio_section() {
        clear_storage_env();
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "mysql:\n  host: db\nminio:\n  host: 'https://store.internal:9443'\n  user: reader\n  password: s3cret"
        )
        .unwrap();

        let config = StorageConfig::load(file.path());
        assert_eq!(config.host, "https://store.internal:9443");
        assert_eq!(config.access_key, "reader");
        assert_eq!(config.secret_key, "s3cret");
    }

    #[test]
    #[serial]
    fn test_storage_config_without_minio_section() {
        clear_storage_env();
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "redis:\n  host: cache").unwrap();

        let config = StorageConfig::load(file.path());
        assert_eq!(config.host, "minio:9000");
    }

    #[test]
    #[serial]
    fn test_storage_env_overrides_file() {
        clear_storage_env();
        env::set_var("OBJECT_STORE_HOST", "localhost:9000");

        let config = StorageConfig::load(Path::new("/nonexistent/service_conf.yaml"));
        assert_eq!(config.host, "localhost:9000");
        assert_eq!(config.access_key, "rag_flow");

        clear_storage_env();
    }

    #[test]
    fn test_endpoint_bare_host() {
        let endpoint = ObjectStoreEndpoint::parse("minio:9000").unwrap();
        assert_eq!(endpoint.endpoint, "minio:9000");
        assert!(!endpoint.secure);
        assert_eq!(endpoint.base_url(), "http://minio:9000");
    }

    #[test]
    fn test_endpoint_with_scheme() {
        let endpoint = ObjectStoreEndpoint::parse("https://store.internal:9443").unwrap();
        assert_eq!(endpoint.endpoint, "store.internal:9443");
        assert!(endpoint.secure);

        let endpoint = ObjectStoreEndpoint::parse("http://minio:9000/").unwrap();
        assert_eq!(endpoint.endpoint, "minio:9000");
        assert!(!endpoint.secure);
    }

    #[test]
    fn test_endpoint_rejects_empty_host() {
        assert!(ObjectStoreEndpoint::parse("  ").is_err());
    }
}
