use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tool identifier carried in the `Created-By` manifest attribute.
pub const TOOL_NAME: &str = "keymod";

/// Paths of the keymap resources inside the APK templates. These are fixed
/// by the prebuilt templates (aapt mangles the resource file names).
pub const LAYOUT_PATH: &str = "res/Q2.kcm";
pub const LAYOUT2_PATH: &str = "res/_f.kcm";

/// Unsigned template file names, relative to the resources directory.
pub const ONE_LAYOUT_APK: &str = "app-one-layout-unsigned.apk";
pub const TWO_LAYOUT_APK: &str = "app-two-layouts-unsigned.apk";

/// Combined PEM bundle (certificate + private key) probed before the
/// separate cert/key pair.
pub const PEM_BUNDLE: &str = "keymod.pem";

pub const APK_MIME: &str = "application/vnd.android.package-archive";
pub const APK_DOWNLOAD_NAME: &str = "KeyboardLayout.apk";

pub const CONFIG_FILE: &str = "keymod.toml";
pub const RESOURCES_ENV: &str = "KEYMOD_RESOURCES";

/// Resources directory holding templates, signing material, `kcm/` base
/// layouts and the `public/` web root.
pub fn resources_dir() -> PathBuf {
    env::var(RESOURCES_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("resources"))
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct AppConfig {
    /// Every section carries `#[serde(default)]` so that an invalid or
    /// omitted section falls back to its defaults without breaking the
    /// unrelated sections.
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub signing: SigningConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SigningConfig {
    /// Combined PEM bundle, relative to the resources directory. When set
    /// it takes precedence over the cert/key pair.
    pub bundle: Option<String>,
    #[serde(default = "default_cert")]
    pub cert: String,
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_cert() -> String {
    "keymod_cert.pem".to_string()
}

fn default_key() -> String {
    "keymod_key.pem".to_string()
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            bundle: None,
            cert: default_cert(),
            key: default_key(),
        }
    }
}

/// Read the config file, falling back to the defaults when the file is
/// missing or malformed so the user can fix it while the tool keeps
/// working.
pub fn parse_config(path: impl AsRef<Path>) -> AppConfig {
    let path = path.as_ref();
    let Ok(content) = std::fs::read_to_string(path) else {
        return AppConfig::default();
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("malformed `{}`, using defaults: {err}", path.display());
            AppConfig::default()
        }
    }
}
