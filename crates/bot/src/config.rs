use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result, anyhow, bail};
use matrix_sdk::ruma::{OwnedRoomOrAliasId, OwnedUserId, RoomOrAliasId, UserId};
use plugin_core::PluginSpec;
use serde::Deserialize;

const DEFAULT_ACKNOWLEDGEMENT: &str = "umu";

/// Optional YAML file next to the binary.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub(crate) struct BotConfig {
    /// Word sent back when someone says the bot's nickname.
    #[serde(default = "default_acknowledgement")]
    pub(crate) acknowledgement: String,
    #[serde(default)]
    pub(crate) plugins: Option<Vec<PluginSpec>>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            acknowledgement: default_acknowledgement(),
            plugins: None,
        }
    }
}

fn default_acknowledgement() -> String {
    DEFAULT_ACKNOWLEDGEMENT.to_owned()
}

/// A missing file means defaults; a broken one is an error.
pub(crate) fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        return Ok(BotConfig::default());
    }
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    if yaml.trim().is_empty() {
        return Ok(BotConfig::default());
    }
    serde_yaml::from_str(&yaml).with_context(|| format!("parsing YAML config at {}", path.display()))
}

/// Everything the running bot needs, resolved once at startup.
#[derive(Debug, Clone)]
pub(crate) struct BotSettings {
    pub(crate) room: OwnedRoomOrAliasId,
    pub(crate) nick: String,
    pub(crate) owner: Option<OwnedUserId>,
    pub(crate) acknowledgement: String,
    pub(crate) config_path: PathBuf,
    pub(crate) plugins_dir: PathBuf,
}

/// Raw values from CLI/env, before prompting and validation.
#[derive(Debug, Default)]
pub(crate) struct SettingsInput<'a> {
    pub(crate) room: Option<&'a str>,
    pub(crate) nick: Option<&'a str>,
    pub(crate) owner: Option<&'a str>,
    pub(crate) config_path: &'a Path,
    pub(crate) plugins_dir: &'a Path,
}

impl BotSettings {
    /// `prompt` is asked for the room and nickname when they were not given.
    pub(crate) fn resolve(
        input: &SettingsInput<'_>,
        config: &BotConfig,
        mut prompt: impl FnMut(&str) -> Result<String>,
    ) -> Result<Self> {
        let room = match non_empty(input.room) {
            Some(room) => room.to_owned(),
            None => prompt("Room (!id:server or #alias:server): ")?,
        };
        let room = RoomOrAliasId::parse(room.trim())
            .map_err(|e| anyhow!("invalid room {:?}: {e}", room.trim()))?;

        let nick = match non_empty(input.nick) {
            Some(nick) => nick.to_owned(),
            None => prompt("Nickname: ")?,
        };
        let nick = nick.trim().to_owned();
        if nick.is_empty() {
            bail!("nickname must not be empty");
        }

        let owner = non_empty(input.owner)
            .map(|owner| UserId::parse(owner).map_err(|e| anyhow!("invalid owner user id {owner:?}: {e}")))
            .transpose()?;

        Ok(Self {
            room,
            nick,
            owner,
            acknowledgement: config.acknowledgement.clone(),
            config_path: input.config_path.to_owned(),
            plugins_dir: input.plugins_dir.to_owned(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
