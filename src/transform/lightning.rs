//! Stages backed by lightningcss.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Features, Targets};

use super::{Stage, StageError, DOWNLEVEL, MINIFY, NESTING, VENDOR_PREFIXES};
use crate::config::BrowsersConfig;

/// Convert configured major versions into lightningcss browser targets.
///
/// lightningcss encodes versions as `major << 16 | minor << 8 | patch`.
pub fn browser_targets(config: &BrowsersConfig) -> Browsers {
    let version = |major: Option<u32>| major.map(|v| v << 16);
    Browsers {
        android: version(config.android),
        chrome: version(config.chrome),
        edge: version(config.edge),
        firefox: version(config.firefox),
        ie: version(config.ie),
        ios_saf: version(config.ios_saf),
        opera: version(config.opera),
        safari: version(config.safari),
        samsung: version(config.samsung),
    }
}

/// Parse, optionally optimize, and print a stylesheet.
fn process(css: &str, optimize: Option<Targets>, targets: Targets, minify: bool) -> Result<String, StageError> {
    let mut sheet = StyleSheet::parse(css, ParserOptions::default())?;
    if let Some(targets) = optimize {
        sheet.minify(MinifyOptions { targets, ..MinifyOptions::default() })?;
    }
    let printed = sheet.to_css(PrinterOptions { minify, targets, ..PrinterOptions::default() })?;
    Ok(printed.code)
}

/// Flattens nested selectors regardless of browser support.
#[derive(Debug, Default)]
pub struct NestingStage;

impl NestingStage {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for NestingStage {
    fn name(&self) -> &'static str {
        NESTING
    }

    fn run(&self, css: &str) -> Result<String, StageError> {
        let targets = Targets { browsers: None, include: Features::Nesting, exclude: Features::empty() };
        process(css, None, targets, false)
    }
}

/// Adds vendor prefixes; every other lowering is excluded.
#[derive(Debug)]
pub struct PrefixStage {
    browsers: Browsers,
}

impl PrefixStage {
    pub fn new(browsers: Browsers) -> Self {
        Self { browsers }
    }
}

impl Stage for PrefixStage {
    fn name(&self) -> &'static str {
        VENDOR_PREFIXES
    }

    fn run(&self, css: &str) -> Result<String, StageError> {
        // Prefixes are added by the declaration handlers, which only run
        // during optimization.
        let targets = Targets {
            browsers: Some(self.browsers),
            include: Features::empty(),
            exclude: Features::all().difference(Features::VendorPrefixes),
        };
        process(css, Some(targets), targets, false)
    }
}

/// Compresses the stylesheet. Targets are pinned so no rewrite produces
/// syntax the configured browsers cannot handle, and existing prefixes
/// are kept.
#[derive(Debug)]
pub struct MinifyStage {
    browsers: Browsers,
}

impl MinifyStage {
    pub fn new(browsers: Browsers) -> Self {
        Self { browsers }
    }
}

impl Stage for MinifyStage {
    fn name(&self) -> &'static str {
        MINIFY
    }

    fn run(&self, css: &str) -> Result<String, StageError> {
        let targets =
            Targets { browsers: Some(self.browsers), include: Features::empty(), exclude: Features::all() };
        process(css, Some(targets), targets, true)
    }
}

/// Lowers modern syntax (colors, media ranges, selectors) at print time.
///
/// No optimization pass runs here: it would merge the flex longhands
/// written by the previous stage back into a shorthand.
#[derive(Debug)]
pub struct DownlevelStage {
    browsers: Browsers,
    compact: bool,
}

impl DownlevelStage {
    pub fn new(browsers: Browsers, compact: bool) -> Self {
        Self { browsers, compact }
    }
}

impl Stage for DownlevelStage {
    fn name(&self) -> &'static str {
        DOWNLEVEL
    }

    fn run(&self, css: &str) -> Result<String, StageError> {
        let targets = Targets {
            browsers: Some(self.browsers),
            include: Features::empty(),
            exclude: Features::VendorPrefixes,
        };
        process(css, None, targets, self.compact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browsers() -> Browsers {
        browser_targets(&BrowsersConfig::default())
    }

    #[test]
    fn test_browser_targets_encoding() {
        let b = browsers();
        assert_eq!(b.chrome, Some(80 << 16));
        assert_eq!(b.safari, Some(13 << 16));
        assert_eq!(b.ie, None);
    }

    #[test]
    fn test_nesting_flattens() {
        let out = NestingStage::new().run(".card { .title { font-weight: bold; } }").unwrap();
        assert!(out.contains(".card .title"));
        assert!(!out.contains(".card {\n  .title"));
    }

    #[test]
    fn test_nesting_keeps_unknown_at_rules() {
        let out = NestingStage::new().run("@tailwind base;\na { color: red; }").unwrap();
        assert!(out.contains("@tailwind base"));
    }

    #[test]
    fn test_prefix_adds_webkit_for_old_safari() {
        let old_safari = Browsers { safari: Some(8 << 16), ..Browsers::default() };
        let out = PrefixStage::new(old_safari).run(".a { user-select: none; }").unwrap();
        assert!(out.contains("-webkit-user-select: none"));
    }

    #[test]
    fn test_minify_collapses_whitespace() {
        let out = MinifyStage::new(browsers()).run("a {\n  color: red;\n}\n\nb {\n  margin: 0;\n}\n").unwrap();
        assert_eq!(out.trim(), "a{color:red}b{margin:0}");
    }

    #[test]
    fn test_downlevel_keeps_flex_longhands() {
        let css = ".x { flex-grow: 1; flex-shrink: 1; flex-basis: 0%; }";
        let out = DownlevelStage::new(browsers(), false).run(css).unwrap();
        assert!(out.contains("flex-grow: 1"));
        assert!(out.contains("flex-basis: 0%"));
    }

    #[test]
    fn test_downlevel_compact_when_minifying() {
        let out = DownlevelStage::new(browsers(), true).run("a {\n  color: red;\n}\n").unwrap();
        assert_eq!(out.trim(), "a{color:red}");
    }
}
