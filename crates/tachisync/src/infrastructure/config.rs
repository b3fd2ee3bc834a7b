use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
};

pub static GLOBAL_CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Deserialize, Serialize, Clone)]
pub struct GalleryConfig {
    #[serde(default = "default_gallery_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub member_id: String,
    #[serde(default)]
    pub pass_hash: String,
    /// only needed for exhentai
    #[serde(default)]
    pub igneous: Option<String>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            base_url: default_gallery_base_url(),
            member_id: String::new(),
            pass_hash: String::new(),
            igneous: None,
        }
    }
}

// credentials never reach the logs
impl fmt::Debug for GalleryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &str) -> &'static str {
            if value.is_empty() { "" } else { "<redacted>" }
        }

        f.debug_struct("GalleryConfig")
            .field("base_url", &self.base_url)
            .field("member_id", &redact(&self.member_id))
            .field("pass_hash", &redact(&self.pass_hash))
            .field("igneous", &self.igneous.as_deref().map(redact))
            .finish()
    }
}

impl GalleryConfig {
    pub fn is_logged_in(&self) -> bool {
        !self.member_id.is_empty() && !self.pass_hash.is_empty()
    }

    pub fn cookie(&self) -> String {
        let mut cookie = format!(
            "ipb_member_id={}; ipb_pass_hash={}; sl=dm_1",
            self.member_id, self.pass_hash
        );
        if let Some(igneous) = self.igneous.as_ref().filter(|i| !i.is_empty()) {
            cookie.push_str(&format!("; igneous={igneous}"));
        }

        cookie
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FavoritesConfig {
    /// never write local changes back to the gallery site
    #[serde(default)]
    pub read_only: bool,
    /// collect per-gallery failures instead of aborting the sync
    #[serde(default)]
    pub lenient: bool,
    /// seconds between favorites syncs run by the daemon, `0` disables them
    #[serde(default = "default_favorites_sync_interval")]
    pub sync_interval: u64,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            lenient: false,
            sync_interval: default_favorites_sync_interval(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_create_database")]
    pub create_database: bool,
    /// seconds between library update checks, `0` disables the periodic check
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub favorites: FavoritesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: tachisync_home().join("config.yml"),
            database_path: default_database_path(),
            create_database: default_create_database(),
            update_interval: default_update_interval(),
            gallery: GalleryConfig::default(),
            favorites: FavoritesConfig::default(),
        }
    }
}

pub fn tachisync_home() -> PathBuf {
    match std::env::var("TACHISYNC_HOME") {
        Ok(path) => PathBuf::from(path),
        Err(_) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tachisync"),
    }
}

fn default_gallery_base_url() -> String {
    "https://exhentai.org".to_string()
}

fn default_update_interval() -> u64 {
    3600
}

fn default_favorites_sync_interval() -> u64 {
    86400
}

fn default_database_path() -> String {
    let path = tachisync_home();
    if !path.exists() {
        let _ = std::fs::create_dir_all(&path);
    }
    path.join("tachisync.db").display().to_string()
}

fn default_create_database() -> bool {
    true
}

impl Config {
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Config, anyhow::Error> {
        let config_path = match path {
            Some(p) => PathBuf::new().join(p),
            None => tachisync_home().join("config.yml"),
        };

        match std::fs::File::open(&config_path) {
            Ok(file) => {
                info!("Open config from {:?}", config_path);
                let mut cfg: Self = serde_yml::from_reader(file)?;
                cfg.path = config_path;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Config {
                    path: config_path,
                    ..Default::default()
                };
                cfg.save()?;
                info!("Write default config at {:?}", cfg.path);
                Ok(cfg)
            }
        }
    }

    pub fn save(&self) -> Result<(), anyhow::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_yml::to_string(&self)?)?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
