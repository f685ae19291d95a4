use anyhow::{Context, Result};
use std::path::PathBuf;

/// Largest queue preview Discord renders comfortably in one message.
const MAX_QUEUE_PREVIEW: usize = 25;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // register commands on one guild while developing

    // Herramientas externas
    pub ffmpeg_bin: Option<PathBuf>,
    pub ytdlp_bin: String,
    pub default_search: String,

    // Comandos
    pub queue_preview_size: usize,

    // Logging
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key → value source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            discord_token: get("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?,
            guild_id: match non_empty("GUILD_ID") {
                Some(id) => Some(id.trim().parse().context("GUILD_ID must be a numeric id")?),
                None => None,
            },

            ffmpeg_bin: non_empty("FFMPEG_BIN").map(PathBuf::from),
            ytdlp_bin: get("YTDLP_BIN").unwrap_or(defaults.ytdlp_bin),
            default_search: get("DEFAULT_SEARCH").unwrap_or(defaults.default_search),

            queue_preview_size: match non_empty("QUEUE_PREVIEW_SIZE") {
                Some(size) => size
                    .trim()
                    .parse()
                    .context("QUEUE_PREVIEW_SIZE must be a number")?,
                None => defaults.queue_preview_size,
            },

            // LOG_FILE vacío desactiva el log a archivo
            log_file: match get("LOG_FILE") {
                Some(path) if path.trim().is_empty() => None,
                Some(path) => Some(PathBuf::from(path)),
                None => defaults.log_file,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Sanity checks that catch common mistakes before connecting.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        if self.ytdlp_bin.trim().is_empty() {
            anyhow::bail!("YTDLP_BIN must not be empty");
        }

        if self.default_search.trim().is_empty() {
            anyhow::bail!("DEFAULT_SEARCH must not be empty");
        }

        if !(1..=MAX_QUEUE_PREVIEW).contains(&self.queue_preview_size) {
            anyhow::bail!(
                "Queue preview size must be between 1 and {}, got: {}",
                MAX_QUEUE_PREVIEW,
                self.queue_preview_size
            );
        }

        Ok(())
    }

    /// Summary for the startup log. Never includes the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {}\n  \
            Tools: yt-dlp={} (search: {}), ffmpeg={}\n  \
            Queue preview: {} entries\n  \
            Log file: {}",
            self.guild_id
                .map_or("global".to_string(), |id| format!("on guild {id}")),
            self.ytdlp_bin,
            self.default_search,
            self.ffmpeg_bin
                .as_ref()
                .map_or("auto-detect".to_string(), |p| p.display().to_string()),
            self.queue_preview_size,
            self.log_file
                .as_ref()
                .map_or("disabled".to_string(), |p| p.display().to_string()),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin valores por defecto, debe definirse)
            discord_token: String::new(),
            guild_id: None,

            ffmpeg_bin: None,
            ytdlp_bin: "yt-dlp".to_string(),
            default_search: "ytsearch".to_string(),

            queue_preview_size: 10,

            log_file: Some(PathBuf::from("discord.log")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DISCORD_TOKEN", "abc")]).unwrap();

        assert_eq!(config.ytdlp_bin, "yt-dlp");
        assert_eq!(config.default_search, "ytsearch");
        assert_eq!(config.queue_preview_size, 10);
        assert_eq!(config.log_file, Some(PathBuf::from("discord.log")));
        assert_eq!(config.guild_id, None);
        assert_eq!(config.ffmpeg_bin, None);
    }

    #[test]
    fn test_token_is_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("GUILD_ID", "123456789"),
            ("FFMPEG_BIN", "/opt/homebrew/bin/ffmpeg"),
            ("QUEUE_PREVIEW_SIZE", "5"),
            ("LOG_FILE", ""),
        ])
        .unwrap();

        assert_eq!(config.guild_id, Some(123456789));
        assert_eq!(config.ffmpeg_bin, Some(PathBuf::from("/opt/homebrew/bin/ffmpeg")));
        assert_eq!(config.queue_preview_size, 5);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_preview_size_bounds() {
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("QUEUE_PREVIEW_SIZE", "0")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("QUEUE_PREVIEW_SIZE", "26")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("QUEUE_PREVIEW_SIZE", "ten")]).is_err());
    }

    #[test]
    fn test_summary_hides_token() {
        let config = load(&[("DISCORD_TOKEN", "super-secret")]).unwrap();

        let summary = config.summary();

        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("commands global"));
    }
}
