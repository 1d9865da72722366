use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ssh_config::HostBlock;

/// Get the config file path (~/.config/ec2dev/config.toml)
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("ec2dev").join("config.toml"))
}

/// Operator settings for the one managed instance.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// EC2 instance ID (required, non-empty).
    pub instance_id: String,
    /// Overrides the profile's default region when set.
    #[serde(default)]
    pub region: Option<String>,
    /// SSH host alias written to the config file.
    pub host: String,
    /// Remote login user.
    pub user: String,
    /// Local-forward port (forwarded to the same port on the instance).
    pub port: u16,
    /// Private key path; tilde is expanded.
    pub identity_file: String,
    /// SSH config file to reconcile. Defaults to ~/.ssh/config.
    #[serde(default)]
    pub ssh_config: Option<String>,
}

impl Settings {
    /// Load settings from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load settings from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let settings: Settings =
            toml::from_str(&content).context("Invalid config.toml format")?;

        if settings.instance_id.trim().is_empty() {
            bail!("You must supply an instance ID (instance_id in {})", path.display());
        }

        Ok(settings)
    }

    /// Path of the SSH config file to reconcile.
    pub fn ssh_config_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.ssh_config {
            return Ok(PathBuf::from(shellexpand::tilde(path).as_ref()));
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".ssh").join("config"))
    }

    /// Build the replacement host block for a running instance.
    pub fn host_block(&self, public_ip: &str) -> HostBlock {
        HostBlock {
            alias: self.host.clone(),
            user: self.user.clone(),
            hostname: public_ip.to_string(),
            port: self.port,
            identity_file: shellexpand::tilde(&self.identity_file).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_full_config() {
        let file = write_config(
            r#"
instance_id = "i-0abc"
region = "ap-northeast-1"
host = "dev"
user = "ubuntu"
port = 8080
identity_file = "~/.ssh/dev.pem"
"#,
        );
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.instance_id, "i-0abc");
        assert_eq!(settings.region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(settings.host, "dev");
        assert_eq!(settings.port, 8080);
        assert!(settings.ssh_config.is_none());
    }

    #[test]
    fn region_is_optional() {
        let file = write_config(
            r#"
instance_id = "i-0abc"
host = "dev"
user = "ubuntu"
port = 8080
identity_file = "/keys/dev.pem"
"#,
        );
        let settings = Settings::load_from(file.path()).unwrap();
        assert!(settings.region.is_none());
    }

    #[test]
    fn empty_instance_id_is_fatal() {
        let file = write_config(
            r#"
instance_id = ""
host = "dev"
user = "ubuntu"
port = 8080
identity_file = "/keys/dev.pem"
"#,
        );
        let err = Settings::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("instance ID"));
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(Settings::load_from(Path::new("/nonexistent/config.toml")).is_err());
    }

    #[test]
    fn malformed_toml_is_fatal() {
        let file = write_config("instance_id = [");
        assert!(Settings::load_from(file.path()).is_err());
    }

    #[test]
    fn host_block_expands_identity_tilde() {
        let file = write_config(
            r#"
instance_id = "i-0abc"
host = "dev"
user = "ubuntu"
port = 8080
identity_file = "~/.ssh/dev.pem"
"#,
        );
        let settings = Settings::load_from(file.path()).unwrap();
        let block = settings.host_block("203.0.113.5");
        assert_eq!(block.hostname, "203.0.113.5");
        assert_eq!(block.port, 8080);
        assert!(!block.identity_file.starts_with('~'));
        assert!(block.identity_file.ends_with(".ssh/dev.pem"));
    }
}
