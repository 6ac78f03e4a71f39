use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{Error, Result};
use crate::objects;

#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Base URL assembled objects are served from.
    pub public_url: Option<String>,
    /// R2 account id; `https://pub-<account_id>.r2.dev` is used when `public_url` is unset.
    pub account_id: Option<String>,
    /// Directory served for every non-API path.
    pub static_dir: Option<PathBuf>,
    pub objects: objects::Config,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 13030))
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config> {
        let mut file = File::open(path)?;
        let mut s = String::new();
        file.read_to_string(&mut s)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Base URL used to build the location of completed uploads.
    pub fn public_base_url(&self) -> Result<String> {
        match (&self.public_url, &self.account_id) {
            (Some(url), _) if !url.is_empty() => Ok(url.clone()),
            (_, Some(account_id)) if !account_id.is_empty() => {
                Ok(format!("https://pub-{account_id}.r2.dev"))
            }
            _ => Err(Error::ConfigError(String::from(
                "one of public_url or account_id must be set",
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_memory_backend() {
        let config: Config = serde_yaml::from_str(
            r#"
account_id: acct
static_dir: ./public
objects:
  type: Memory
"#,
        )
        .unwrap();
        assert_eq!(config.listen, default_listen());
        assert!(matches!(config.objects, objects::Config::Memory));
        assert_eq!(config.public_base_url().unwrap(), "https://pub-acct.r2.dev");
    }

    #[test]
    fn parses_s3_backend() {
        let config: Config = serde_yaml::from_str(
            r#"
listen: 127.0.0.1:8080
public_url: https://files.example.com
objects:
  type: S3
  access_key: AKIA
  secret_key: secret
  hostname: acct.r2.cloudflarestorage.com
  bucket_name: uploads
"#,
        )
        .unwrap();
        assert_eq!(config.listen.port(), 8080);
        assert!(matches!(config.objects, objects::Config::S3(_)));
        assert_eq!(
            config.public_base_url().unwrap(),
            "https://files.example.com"
        );
    }

    #[test]
    fn public_url_is_required_somehow() {
        let config: Config = serde_yaml::from_str("objects:\n  type: Memory\n").unwrap();
        let err = config.public_base_url().unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
