//! Config command implementation.

use std::path::Path;

use chrono::Local;
use colored::Colorize;

use crate::cli::{ConfigCommands, ConfigSetArgs};
use crate::config::{ConfigStore, FileConfigStore, SyncConfig};
use crate::error::{Error, Result};
use crate::sync::Checkpoint;

/// Execute config commands.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written, or a value is
/// invalid.
pub fn execute(command: &ConfigCommands, config_path: Option<&Path>, json: bool) -> Result<()> {
    let store = FileConfigStore::resolve(config_path)?;
    match command {
        ConfigCommands::Show => show(&store, json),
        ConfigCommands::Path => path(&store, json),
        ConfigCommands::Set(args) => set(&store, args, json),
    }
}

/// Hide all but the last four characters of a secret.
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        String::new()
    } else if count <= 8 {
        "****".to_string()
    } else {
        let tail: String = secret.chars().skip(count - 4).collect();
        format!("****{tail}")
    }
}

fn masked(config: &SyncConfig) -> SyncConfig {
    SyncConfig {
        access_token: mask(&config.access_token),
        siyuan_token: mask(&config.siyuan_token),
        ..config.clone()
    }
}

fn show(store: &FileConfigStore, json: bool) -> Result<()> {
    let config = masked(&store.load()?);
    if json {
        println!("{}", serde_json::to_string(&config)?);
    } else {
        println!("{}", store.path().display().to_string().dimmed());
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(())
}

fn path(store: &FileConfigStore, json: bool) -> Result<()> {
    let path = store.path().display().to_string();
    if json {
        println!("{}", serde_json::json!({ "path": path }));
    } else {
        println!("{path}");
    }
    Ok(())
}

fn set(store: &FileConfigStore, args: &ConfigSetArgs, json: bool) -> Result<()> {
    let mut config = store.load()?;
    let changed = apply(&mut config, args)?;
    if changed.is_empty() {
        return Err(Error::InvalidArgument(
            "No settings given. See `memos-sync config set --help`.".into(),
        ));
    }
    store.save(&config)?;

    if json {
        println!("{}", serde_json::json!({ "updated": changed }));
    } else {
        println!("{} Updated {}", "✓".green(), changed.join(", "));
    }
    Ok(())
}

/// Copy every given setting into `config`; returns the camelCase names of
/// the fields that were set.
fn apply(config: &mut SyncConfig, args: &ConfigSetArgs) -> Result<Vec<&'static str>> {
    let mut changed = Vec::new();

    macro_rules! set_field {
        ($arg:ident, $field:ident, $name:literal) => {
            if let Some(value) = &args.$arg {
                config.$field = value.clone();
                changed.push($name);
            }
        };
    }

    if let Some(url) = &args.base_url {
        config.base_url = url.trim().trim_end_matches('/').to_string();
        changed.push("baseUrl");
    }
    set_field!(access_token, access_token, "accessToken");
    if let Some(url) = &args.siyuan_base_url {
        config.siyuan_base_url = url.trim().trim_end_matches('/').to_string();
        changed.push("siyuanBaseUrl");
    }
    set_field!(siyuan_token, siyuan_token, "siyuanToken");
    if let Some(raw) = &args.last_sync_time {
        let offset = *Local::now().fixed_offset().offset();
        let checkpoint = Checkpoint::parse(raw, offset).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "lastSyncTime must look like 2024-01-31 08:00:00, got {raw:?}"
            ))
        })?;
        config.last_sync_time = checkpoint.to_string();
        changed.push("lastSyncTime");
    }
    if let Some(mode) = args.sync_mode {
        config.sync_mode = Some(mode);
        changed.push("syncMode");
    }
    set_field!(notebook_id, notebook_id, "notebookId");
    set_field!(page_path, page_path, "pagePath");
    set_field!(mark_mode, mark_mode, "markMode");
    set_field!(image_layout, image_layout, "imageLayout");
    if let Some(tag) = &args.parent_tag {
        config.parent_tag = Some(tag.clone()).filter(|t| !t.trim().is_empty());
        changed.push("parentTag");
    }
    set_field!(resource_download_mode, resource_download_mode, "resourceDownloadMode");
    set_field!(bidirectional_links, bidirectional_links, "bidirectionalLinks");
    set_field!(subject_path, subject_path, "subjectPath");
    set_field!(video_optimization, video_optimization, "videoOptimization");
    set_field!(video_extensions, video_extensions, "videoExtensions");
    set_field!(debug, debug, "debug");
    set_field!(update_checkpoint_in_debug, update_checkpoint_in_debug, "updateCheckpointInDebug");
    set_field!(tag_scope, tag_scope, "tagScope");

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MarkMode, SyncMode};
    use tempfile::TempDir;

    #[test]
    fn test_mask_keeps_tail_of_long_secrets() {
        assert_eq!(mask(""), "");
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("abcdefghijkl"), "****ijkl");
    }

    #[test]
    fn test_apply_sets_only_given_fields() {
        let mut config = SyncConfig::default();
        let args = ConfigSetArgs {
            base_url: Some("https://memos.example.com/".into()),
            sync_mode: Some(SyncMode::Page),
            mark_mode: Some(MarkMode::Embed),
            parent_tag: Some("  ".into()),
            ..ConfigSetArgs::default()
        };

        let changed = apply(&mut config, &args).unwrap();
        assert_eq!(changed, vec!["baseUrl", "syncMode", "markMode", "parentTag"]);
        assert_eq!(config.base_url, "https://memos.example.com");
        assert_eq!(config.sync_mode, Some(SyncMode::Page));
        assert_eq!(config.mark_mode, MarkMode::Embed);
        assert_eq!(config.parent_tag, None);
        assert_eq!(config.notebook_id, "");
    }

    #[test]
    fn test_apply_rejects_bad_checkpoint() {
        let mut config = SyncConfig::default();
        let args = ConfigSetArgs {
            last_sync_time: Some("last tuesday".into()),
            ..ConfigSetArgs::default()
        };
        let err = apply(&mut config, &args).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(config.last_sync_time, SyncConfig::default().last_sync_time);
    }

    #[test]
    fn test_set_persists_to_file() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.json"));
        let args = ConfigSetArgs {
            notebook_id: Some("20240101120000-abcdefg".into()),
            ..ConfigSetArgs::default()
        };

        set(&store, &args, true).unwrap();
        assert_eq!(store.load().unwrap().notebook_id, "20240101120000-abcdefg");
    }
}
