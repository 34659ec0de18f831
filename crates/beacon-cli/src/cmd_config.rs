use std::io::Write;

use anyhow::Result;
use beacon_core::ContextMode;
use beacon_store::{ApiUrlSource, BeaconConfig, ConfigFile, StorePaths, KNOWN_KEYS};
use clap::Subcommand;
use tracing::warn;

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (api_url, context_mode)
        key: String,
        /// Value; true/false and numbers are stored typed
        value: String,
    },
    /// Show a config value; api_url shows the effective URL and its source
    Get {
        /// Config key
        key: String,
    },
    /// Remove a config value
    Unset {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

pub fn run(cmd: ConfigCmd) -> Result<()> {
    let paths = StorePaths::discover();
    let mut out = std::io::stdout().lock();
    match cmd {
        ConfigCmd::Set { key, value } => set(&paths, &key, &value, &mut out),
        ConfigCmd::Get { key } => get(&paths, &key, &mut out),
        ConfigCmd::Unset { key } => unset(&paths, &key, &mut out),
        ConfigCmd::List => list(&paths, &mut out),
    }
}

/// `beacon config set <key> <value>`
fn set(paths: &StorePaths, key: &str, raw: &str, out: &mut impl Write) -> Result<()> {
    if key == "context_mode" {
        raw.parse::<ContextMode>()?;
    }
    if !KNOWN_KEYS.contains(&key) {
        warn!(key, "not a key beacon reads");
    }
    let mut file = ConfigFile::load(&paths.config_json)?;
    let stored = file.set(key, raw).clone();
    file.save(&paths.config_json)?;
    writeln!(out, "{key} = {stored}")?;
    Ok(())
}

/// `beacon config get <key>`
fn get(paths: &StorePaths, key: &str, out: &mut impl Write) -> Result<()> {
    if key == "api_url" {
        let config = BeaconConfig::load(paths);
        let source = match config.api_url_source {
            ApiUrlSource::Env => "from BEACON_API_URL",
            ApiUrlSource::File => "from config.json",
            ApiUrlSource::Default => "default",
        };
        writeln!(out, "{} ({source})", config.api_url)?;
        return Ok(());
    }
    let file = ConfigFile::load(&paths.config_json)?;
    match file.get(key) {
        Some(val) => writeln!(out, "{val}")?,
        None => writeln!(out, "(not set)")?,
    }
    Ok(())
}

/// `beacon config unset <key>`
fn unset(paths: &StorePaths, key: &str, out: &mut impl Write) -> Result<()> {
    let mut file = ConfigFile::load(&paths.config_json)?;
    if file.unset(key).is_none() {
        writeln!(out, "{key} was not set")?;
        return Ok(());
    }
    file.save(&paths.config_json)?;
    writeln!(out, "Removed {key}")?;
    Ok(())
}

/// `beacon config list`
fn list(paths: &StorePaths, out: &mut impl Write) -> Result<()> {
    let file = ConfigFile::load(&paths.config_json)?;
    if file.is_empty() {
        writeln!(out, "(no config set)")?;
    }
    for (key, val) in file.entries() {
        writeln!(out, "{key} = {val}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn set_list_unset() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::at(tmp.path());
        let mut out = Vec::new();
        set(&paths, "context_mode", "priorities", &mut out).unwrap();
        set(&paths, "retries", "3", &mut out).unwrap();
        assert_eq!(text(out), "context_mode = \"priorities\"\nretries = 3\n");

        assert_eq!(
            BeaconConfig::load(&paths).context_mode.as_deref(),
            Some("priorities")
        );

        let mut out = Vec::new();
        unset(&paths, "retries", &mut out).unwrap();
        unset(&paths, "retries", &mut out).unwrap();
        list(&paths, &mut out).unwrap();
        assert_eq!(
            text(out),
            "Removed retries\nretries was not set\ncontext_mode = \"priorities\"\n"
        );
    }

    #[test]
    fn get_reports_api_url_source() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::at(tmp.path());
        if std::env::var_os(beacon_store::API_URL_ENV).is_some() {
            return;
        }
        let mut out = Vec::new();
        get(&paths, "api_url", &mut out).unwrap();
        set(&paths, "api_url", "https://api.example.test/", &mut Vec::new()).unwrap();
        get(&paths, "api_url", &mut out).unwrap();
        get(&paths, "context_mode", &mut out).unwrap();
        assert_eq!(
            text(out),
            format!(
                "{} (default)\nhttps://api.example.test (from config.json)\n(not set)\n",
                beacon_store::DEFAULT_API_URL
            )
        );
    }

    #[test]
    fn rejects_unknown_context_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::at(tmp.path());
        assert!(set(&paths, "context_mode", "goals", &mut Vec::new()).is_err());
        assert!(!paths.config_json.exists());
    }
}
