//! Static asset handling for bundled stylesheets.
//!
//! `url(...)` references whose extension has the `File` loader are copied
//! into the output directory under a content-hashed name, and the
//! reference is rewritten to point at the copy.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::build::{BuildConfig, Loader};

/// Error while copying a referenced asset.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The referenced file exists in none of the search directories
    #[error("Could not resolve \"{reference}\" referenced from {}", importer.display())]
    NotFound { reference: String, importer: PathBuf },
    /// Reading or writing the asset failed
    #[error("Failed to copy asset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)\s]*))\s*\)"#).expect("valid regex")
    })
}

/// Whether a reference points outside the local filesystem tree.
pub fn is_external(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    reference.is_empty()
        || lower.starts_with("data:")
        || lower.starts_with("http:")
        || lower.starts_with("https:")
        || reference.starts_with('/')
        || reference.starts_with('#')
}

/// Split `path?query#fragment` into the path and the untouched suffix.
fn split_suffix(reference: &str) -> (&str, &str) {
    match reference.find(&['?', '#'][..]) {
        Some(i) => reference.split_at(i),
        None => (reference, ""),
    }
}

/// Output name for an asset: `<stem>-<HASH>.<ext>`, where HASH is the
/// first 8 uppercase hex digits of the content's SHA-256.
pub fn hashed_name(path: &Path, contents: &[u8]) -> String {
    let digest = Sha256::digest(contents);
    let hash: String = digest.iter().take(4).map(|b| format!("{:02X}", b)).collect();
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, hash, ext.to_string_lossy()),
        None => format!("{}-{}", stem, hash),
    }
}

/// Result of asset processing.
#[derive(Debug, Clone, Default)]
pub struct AssetOutput {
    /// CSS with rewritten references
    pub css: String,
    /// Paths of the copied files in the output directory
    pub copied: Vec<PathBuf>,
    /// Source files that were copied
    pub sources: Vec<PathBuf>,
}

/// Copies `File`-loader assets referenced by a bundle.
#[derive(Debug)]
pub struct AssetCopier<'a> {
    config: &'a BuildConfig,
    search_dirs: Vec<PathBuf>,
}

impl<'a> AssetCopier<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        let mut search_dirs = vec![config.resolve_dir().to_path_buf()];
        if let Some(sass) = config.sass_options() {
            search_dirs.extend(sass.include_paths.iter().cloned());
        }
        Self { config, search_dirs }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        self.search_dirs.iter().map(|dir| dir.join(path)).find(|candidate| candidate.is_file())
    }

    fn wants(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|ext| self.config.loader_for(&ext.to_string_lossy()))
            .is_some_and(|loader| loader == Loader::File)
    }

    /// Copy every referenced asset and rewrite the references.
    ///
    /// Every reference is resolved before anything is written, so a
    /// missing asset leaves the output directory untouched. The output
    /// directory must already exist.
    pub fn process(&self, css: &str) -> Result<AssetOutput, AssetError> {
        let mut output = AssetOutput { css: String::with_capacity(css.len()), ..Default::default() };
        let mut contents: Vec<Vec<u8>> = Vec::new();
        let mut last = 0;

        for caps in url_pattern().captures_iter(css) {
            let Some(whole) = caps.get(0) else { continue };
            let reference = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)).map_or("", |m| m.as_str());

            if is_external(reference) {
                continue;
            }
            let (path, suffix) = split_suffix(reference);
            if !self.wants(path) {
                continue;
            }

            let source = self.resolve(path).ok_or_else(|| AssetError::NotFound {
                reference: reference.to_string(),
                importer: self.config.entry.clone(),
            })?;
            let bytes = std::fs::read(&source).map_err(|e| AssetError::Io { path: source.clone(), source: e })?;
            let name = hashed_name(&source, &bytes);
            let target = self.config.out_dir.join(&name);

            if !output.copied.contains(&target) {
                output.copied.push(target);
                output.sources.push(source);
                contents.push(bytes);
            }

            output.css.push_str(&css[last..whole.start()]);
            output.css.push_str(&format!("url(\"./{}{}\")", name, suffix));
            last = whole.end();
        }
        output.css.push_str(&css[last..]);

        for ((target, source), bytes) in output.copied.iter().zip(&output.sources).zip(&contents) {
            std::fs::write(target, bytes).map_err(|e| AssetError::Io { path: target.clone(), source: e })?;
            tracing::debug!(from = %source.display(), to = %target.display(), "copied asset");
        }
        Ok(output)
    }
}
