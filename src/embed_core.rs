use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

/// One entry of the vault index: relative path plus the short display name
/// used in wikilink embeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultFile {
    pub path: String,
    pub name: String,
}

impl VaultFile {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path.as_str())
            .to_string();
        Self { path, name }
    }
}

/// The most recent right-click that landed on an image. A single slot,
/// last write wins; cleared when a right-click misses every image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingImageClick {
    pub source: String,
    pub is_external: bool,
    /// Set once the editing view's menu builder has offered the copy entry
    /// for this interaction, so the popup-injection fallback skips it.
    pub offered_in_menu: bool,
}

impl PendingImageClick {
    pub fn capture(source: impl Into<String>) -> Self {
        let source = source.into();
        let is_external = is_external_source(&source);
        Self {
            source,
            is_external,
            offered_in_menu: false,
        }
    }
}

/// Web-transfer schemes count as external; everything else, including
/// application-internal schemes like asset:// or data:, is local.
pub fn is_external_source(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn decode_lossy(source: &str) -> Cow<'_, str> {
    urlencoding::decode(source).unwrap_or(Cow::Borrowed(source))
}

/// Resolves a local source string to a vault file: first by suffix/equality
/// against relative paths, then by final-segment equality against short
/// names. The index is sorted, so the first match is deterministic.
pub fn resolve_vault_file<'a>(source: &str, files: &'a [VaultFile]) -> Option<&'a VaultFile> {
    static RE_APP_URL: OnceLock<Regex> = OnceLock::new();
    let re_app_url = RE_APP_URL
        .get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://[^/]+/(.*)$").unwrap());

    let decoded = decode_lossy(source);
    let mut candidate: &str = decoded.as_ref();
    if let Some(caps) = re_app_url.captures(candidate) {
        candidate = caps.get(1).map(|m| m.as_str()).unwrap_or(candidate);
    }
    let candidate = candidate.split('?').next().unwrap_or(candidate);
    if candidate.is_empty() {
        return None;
    }

    if let Some(file) = files.iter().find(|file| candidate.ends_with(&file.path)) {
        return Some(file);
    }

    let filename = candidate.rsplit(['/', '\\']).next().unwrap_or(candidate);
    if filename.is_empty() {
        return None;
    }
    files.iter().find(|file| file.name == filename)
}

/// Pulls a trailing `name.ext` segment out of a raw source string. When
/// percent decoding fails the raw string is searched with a regex instead.
pub fn extract_filename(source: &str) -> Option<String> {
    static RE_EXTENSION: OnceLock<Regex> = OnceLock::new();
    static RE_TRAILING: OnceLock<Regex> = OnceLock::new();
    let re_extension = RE_EXTENSION.get_or_init(|| Regex::new(r"\.\w+$").unwrap());
    let re_trailing =
        RE_TRAILING.get_or_init(|| Regex::new(r"([^/\\?]+\.\w+)(?:\?.*)?$").unwrap());

    match urlencoding::decode(source) {
        Ok(decoded) => {
            let stripped = decoded.split('?').next().unwrap_or_default();
            let last = stripped.rsplit(['/', '\\']).next().unwrap_or_default();
            if !last.is_empty() && re_extension.is_match(last) {
                Some(last.to_string())
            } else {
                None
            }
        }
        Err(_) => re_trailing
            .captures(source)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()),
    }
}

/// Produces the embed snippet for a captured click, or `None` when neither
/// structured resolution nor filename extraction can name the image.
pub fn embed_code_for(click: &PendingImageClick, files: &[VaultFile]) -> Option<String> {
    if click.is_external {
        return Some(format!("![]({})", click.source));
    }
    if let Some(file) = resolve_vault_file(&click.source, files) {
        return Some(format!("![[{}]]", file.name));
    }
    extract_filename(&click.source).map(|name| format!("![[{name}]]"))
}

/// Rewrites `![[image.png]]` and `![[image.png|alt]]` embeds into standard
/// markdown image syntax pointing at the asset protocol, so local images
/// show up in the rendered preview. Unresolved or non-image targets are
/// left untouched.
pub fn expand_wiki_embeds(text: &str, vault_root: &str, files: &[VaultFile]) -> String {
    static RE_EMBED: OnceLock<Regex> = OnceLock::new();
    let re_embed =
        RE_EMBED.get_or_init(|| Regex::new(r"!\[\[([^\]|]+)(?:\|([^\]]*))?\]\]").unwrap());

    re_embed
        .replace_all(text, |caps: &Captures| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let target = caps.get(1).map(|m| m.as_str()).unwrap_or_default().trim();
            if target.is_empty() || !has_image_extension(target) {
                return whole.to_string();
            }
            let Some(file) = files
                .iter()
                .find(|file| file.path == target || file.name == target)
            else {
                return whole.to_string();
            };
            let alt = caps
                .get(2)
                .map(|m| m.as_str())
                .filter(|alias| !alias.is_empty())
                .unwrap_or(&file.name);
            let src = format!(
                "asset://localhost/{}",
                urlencoding::encode(&format!("{vault_root}/{}", file.path))
            );
            format!("![{alt}]({src})")
        })
        .into_owned()
}

fn has_image_extension(name: &str) -> bool {
    let ext = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    matches!(
        ext.as_str(),
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(paths: &[&str]) -> Vec<VaultFile> {
        paths.iter().map(|path| VaultFile::new(*path)).collect()
    }

    #[test]
    fn classifies_web_schemes_only() {
        assert!(is_external_source("http://example.com/cat.png"));
        assert!(is_external_source("https://example.com/cat.png"));
        assert!(!is_external_source("asset://localhost/photo.png"));
        assert!(!is_external_source("app://abc123/Attachments/photo.png"));
        assert!(!is_external_source("data:image/png;base64,AAAA"));
        assert!(!is_external_source("Attachments/photo.png"));
    }

    #[test]
    fn external_source_passes_through_unmodified() {
        let click = PendingImageClick::capture("https://example.com/cat.png");
        assert!(click.is_external);
        assert_eq!(
            embed_code_for(&click, &[]),
            Some("![](https://example.com/cat.png)".to_string())
        );
    }

    #[test]
    fn resolves_app_url_to_vault_file_short_name() {
        let files = index(&["Attachments/photo.png", "Notes/todo.md"]);
        let click = PendingImageClick::capture("app://abc123/Attachments/photo.png?1700000000");
        assert_eq!(
            embed_code_for(&click, &files),
            Some("![[photo.png]]".to_string())
        );
    }

    #[test]
    fn resolves_by_suffix_against_absolute_path() {
        let files = index(&["Attachments/photo.png"]);
        let resolved =
            resolve_vault_file("/home/user/QuarryVault/Attachments/photo.png", &files);
        assert_eq!(resolved.map(|f| f.name.as_str()), Some("photo.png"));
    }

    #[test]
    fn uses_short_name_never_full_path() {
        let files = index(&["Notes/Attachments/diagram.png"]);
        let click = PendingImageClick::capture("Notes/Attachments/diagram.png");
        assert_eq!(
            embed_code_for(&click, &files),
            Some("![[diagram.png]]".to_string())
        );
    }

    #[test]
    fn resolves_by_short_name_when_path_differs() {
        let files = index(&["Attachments/photo.png"]);
        let resolved = resolve_vault_file("cache/photo.png", &files);
        assert_eq!(resolved.map(|f| f.path.as_str()), Some("Attachments/photo.png"));
    }

    #[test]
    fn picks_first_entry_of_sorted_index_among_same_named_files() {
        let files = index(&["A/photo.png", "B/photo.png"]);
        let resolved = resolve_vault_file("photo.png", &files);
        assert_eq!(resolved.map(|f| f.path.as_str()), Some("A/photo.png"));
    }

    #[test]
    fn falls_back_to_filename_extraction_with_percent_decoding() {
        let click = PendingImageClick::capture("Notes/diagram%20final.png");
        assert_eq!(
            embed_code_for(&click, &[]),
            Some("![[diagram final.png]]".to_string())
        );
    }

    #[test]
    fn strips_query_before_extraction() {
        assert_eq!(
            extract_filename("img/cat.png?v=2"),
            Some("cat.png".to_string())
        );
    }

    #[test]
    fn invalid_percent_encoding_falls_back_to_raw_string() {
        // %FF decodes to invalid UTF-8, so the raw string is searched instead.
        assert_eq!(
            extract_filename("Attachments/photo%FF.png"),
            Some("photo%FF.png".to_string())
        );
        assert!(resolve_vault_file("photo%FF.png", &index(&["A/photo.png"])).is_none());
    }

    #[test]
    fn no_embed_code_for_data_url() {
        let click = PendingImageClick::capture("data:image/png;base64,iVBORw0KGgo");
        assert_eq!(embed_code_for(&click, &[]), None);
    }

    #[test]
    fn no_filename_without_extension_segment() {
        assert_eq!(extract_filename("Attachments/"), None);
        assert_eq!(extract_filename("justaname"), None);
    }

    #[test]
    fn expands_image_wikilink_embeds() {
        let files = index(&["Attachments/photo.png"]);
        let out = expand_wiki_embeds("before ![[photo.png]] after", "/v", &files);
        assert_eq!(
            out,
            "before ![photo.png](asset://localhost/%2Fv%2FAttachments%2Fphoto.png) after"
        );
    }

    #[test]
    fn embed_alias_becomes_alt_text() {
        let files = index(&["Attachments/photo.png"]);
        let out = expand_wiki_embeds("![[photo.png|a cat]]", "/v", &files);
        assert!(out.starts_with("![a cat]("));
    }

    #[test]
    fn leaves_note_embeds_and_unknown_targets_alone() {
        let files = index(&["Attachments/photo.png"]);
        assert_eq!(
            expand_wiki_embeds("![[Other Note]]", "/v", &files),
            "![[Other Note]]"
        );
        assert_eq!(
            expand_wiki_embeds("![[missing.png]]", "/v", &files),
            "![[missing.png]]"
        );
    }
}
