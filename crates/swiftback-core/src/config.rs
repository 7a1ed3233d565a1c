use crate::CoreError;
use std::path::PathBuf;
use swiftback_source::ExcludeSet;

pub const DEFAULT_CONTAINER: &str = "default";

/// Segment threshold for the large-object protocol. Files at most this
/// size go up as a single PUT; larger files are split into segments of at
/// most this many bytes plus a manifest.
pub const DEFAULT_SEGMENT_SIZE: u64 = 64 * 1024 * 1024;

/// Typed run configuration, assembled by the CLI from its recognized
/// options and immutable once the pipeline starts.
#[derive(Debug, Clone)]
pub struct Config {
    pub login: String,
    pub password: String,
    pub auth_url: String,
    pub src_folder: PathBuf,
    pub excludes: ExcludeSet,
    pub container: String,
    pub dst_folder: String,
    pub crypt_password: Option<String>,
    pub segment_size: u64,
}

impl Config {
    /// Check the parts of the configuration that can fail before any
    /// pipeline thread starts.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.src_folder.exists() {
            return Err(CoreError::Config(format!(
                "src folder '{}' doesn't exist",
                self.src_folder.display()
            )));
        }
        if !self.src_folder.is_dir() {
            return Err(CoreError::Config(format!(
                "src folder '{}' is not a folder",
                self.src_folder.display()
            )));
        }
        if self.container.is_empty() {
            return Err(CoreError::Config("container name is empty".to_owned()));
        }
        if self.dst_folder.is_empty() {
            return Err(CoreError::Config("destination folder is empty".to_owned()));
        }
        if self.segment_size == 0 {
            return Err(CoreError::Config("segment size must be at least 1".to_owned()));
        }
        Ok(())
    }

    pub fn encrypting(&self) -> bool {
        self.crypt_password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config(src: PathBuf) -> Config {
        Config {
            login: "user".to_owned(),
            password: "pw".to_owned(),
            auth_url: "http://auth.example".to_owned(),
            src_folder: src,
            excludes: ExcludeSet::new(),
            container: DEFAULT_CONTAINER.to_owned(),
            dst_folder: "backup".to_owned(),
            crypt_password: None,
            segment_size: DEFAULT_SEGMENT_SIZE,
        }
    }

    #[test]
    fn valid_config_passes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(valid_config(dir.path().to_path_buf()).validate().is_ok());
    }

    #[test]
    fn missing_src_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = valid_config(dir.path().join("absent"));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn src_file_instead_of_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, "x").unwrap();
        assert!(valid_config(file).validate().is_err());
    }

    #[test]
    fn empty_dst_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path().to_path_buf());
        cfg.dst_folder = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_segment_size_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path().to_path_buf());
        cfg.segment_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn encrypting_reflects_password() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path().to_path_buf());
        assert!(!cfg.encrypting());
        cfg.crypt_password = Some("secret".to_owned());
        assert!(cfg.encrypting());
    }
}
