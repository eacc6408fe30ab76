//! Resource resolution.
//!
//! Turns a memo attachment into the markdown embedded in SiYuan and, for
//! server-hosted files, the asset path the binary is downloaded to.

use crate::config::{DownloadMode, SyncConfig};
use crate::model::{ResolvedResource, ResourceRef};

/// Asset directory inside the SiYuan data folder.
pub const MEMOS_ASSETS_DIR: &str = "assets/memos";

/// Resolution settings taken from the sync configuration.
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    pub video_optimization: bool,
    /// Lowercase MIME subtypes rendered as inline video.
    pub video_extensions: Vec<String>,
}

impl ResourceOptions {
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            video_optimization: config.video_optimization,
            video_extensions: config
                .video_extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    fn plays_inline(&self, format_text: &str) -> bool {
        self.video_optimization
            && self
                .video_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(format_text))
    }
}

/// Split a MIME type into `(type, subtype)`.
#[must_use]
pub fn split_mime(mime: &str) -> (&str, &str) {
    match mime.split_once('/') {
        Some((type_text, format_text)) => (type_text, format_text),
        None => (mime, ""),
    }
}

/// Deterministic local asset path for a server-hosted resource.
///
/// `assets/memos/<id>_<createdTs>.<ext>`; a filename without an extension
/// yields `assets/memos/<id>_<createdTs>`.
#[must_use]
pub fn local_asset_path(resource: &ResourceRef) -> String {
    let stem = format!("{MEMOS_ASSETS_DIR}/{}_{}", resource.id, resource.created_ts);
    match file_extension(&resource.filename) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn file_extension(filename: &str) -> Option<&str> {
    let (base, ext) = filename.rsplit_once('.')?;
    let valid = !base.is_empty()
        && !ext.is_empty()
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}

/// Resolve one attachment.
#[must_use]
pub fn resolve_resource(resource: &ResourceRef, options: &ResourceOptions) -> ResolvedResource {
    let (type_text, format_text) = split_mime(&resource.mime_type);

    let (link, download_target) = if resource.is_external() {
        (resource.external_link.trim().to_string(), String::new())
    } else {
        let path = local_asset_path(resource);
        (path.clone(), path)
    };

    let name = if resource.filename.is_empty() {
        resource.id.to_string()
    } else {
        resource.filename.clone()
    };

    let markdown_link = if type_text == "image" {
        format!("![{name}]({link})")
    } else if type_text == "video" && options.plays_inline(format_text) {
        format!("<video controls=\"controls\" src=\"{link}\" data-src=\"{link}\"></video>")
    } else {
        format!("[{name}]({link})")
    };

    ResolvedResource {
        markdown_link,
        download_target,
        resource_id: resource.id,
        type_text: type_text.to_string(),
    }
}

/// The path segment the Memos download endpoint is addressed with.
///
/// Falls back to the numeric id when the server did not send the
/// requested field.
#[must_use]
pub fn download_key(resource: &ResourceRef, mode: DownloadMode) -> String {
    let alternate = match mode {
        DownloadMode::Id => None,
        DownloadMode::Name => resource.name.as_deref(),
        DownloadMode::Uid => resource.uid.as_deref(),
    };
    alternate
        .filter(|s| !s.is_empty())
        .map_or_else(|| resource.id.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: i64, filename: &str, mime: &str) -> ResourceRef {
        ResourceRef {
            id,
            name: Some(format!("res-{id}")),
            uid: None,
            filename: filename.to_string(),
            mime_type: mime.to_string(),
            external_link: String::new(),
            created_ts: 1_700_000_000,
        }
    }

    #[test]
    fn test_local_image_link_and_target() {
        let r = resolve_resource(&resource(7, "cat.png", "image/png"), &ResourceOptions::default());
        assert_eq!(r.markdown_link, "![cat.png](assets/memos/7_1700000000.png)");
        assert_eq!(r.download_target, "assets/memos/7_1700000000.png");
        assert!(r.is_image());
        assert!(r.needs_download());
    }

    #[test]
    fn test_external_link_has_no_download() {
        let mut res = resource(3, "doc.pdf", "application/pdf");
        res.external_link = "https://example.com/doc.pdf".into();
        let r = resolve_resource(&res, &ResourceOptions::default());
        assert_eq!(r.markdown_link, "[doc.pdf](https://example.com/doc.pdf)");
        assert!(!r.needs_download());
        assert_eq!(r.type_text, "application");
    }

    #[test]
    fn test_video_embed_only_when_enabled_and_allowed() {
        let res = resource(9, "clip.mp4", "video/mp4");
        let plain = resolve_resource(&res, &ResourceOptions::default());
        assert_eq!(plain.markdown_link, "[clip.mp4](assets/memos/9_1700000000.mp4)");

        let options = ResourceOptions {
            video_optimization: true,
            video_extensions: vec!["mp4".into()],
        };
        let video = resolve_resource(&res, &options);
        assert!(video.markdown_link.starts_with("<video controls=\"controls\""));
        assert!(video.markdown_link.contains("src=\"assets/memos/9_1700000000.mp4\""));

        let avi = resolve_resource(&resource(10, "clip.avi", "video/x-msvideo"), &options);
        assert!(avi.markdown_link.starts_with('['));
    }

    #[test]
    fn test_filename_without_extension_does_not_produce_suffix() {
        let r = resolve_resource(&resource(5, "README", "text/plain"), &ResourceOptions::default());
        assert_eq!(r.download_target, "assets/memos/5_1700000000");

        let hidden = resolve_resource(&resource(6, ".env", "text/plain"), &ResourceOptions::default());
        assert_eq!(hidden.download_target, "assets/memos/6_1700000000");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let res = resource(11, "photo.jpeg", "image/jpeg");
        let options = ResourceOptions::default();
        assert_eq!(resolve_resource(&res, &options), resolve_resource(&res, &options));
    }

    #[test]
    fn test_download_key_modes() {
        let res = resource(4, "a.png", "image/png");
        assert_eq!(download_key(&res, DownloadMode::Id), "4");
        assert_eq!(download_key(&res, DownloadMode::Name), "res-4");
        // uid missing -> id
        assert_eq!(download_key(&res, DownloadMode::Uid), "4");
    }

    #[test]
    fn test_options_normalize_extensions() {
        let config = SyncConfig {
            video_optimization: true,
            video_extensions: vec![" .MP4 ".into(), String::new()],
            ..SyncConfig::default()
        };
        let options = ResourceOptions::from_config(&config);
        assert_eq!(options.video_extensions, vec!["mp4".to_string()]);
        assert!(options.plays_inline("mp4"));
    }
}
