/*!
 * Font rewriting for ASS subtitle lines.
 *
 * Each line goes through three rules in a fixed order:
 * - `\fsp` spacing overrides are stripped when spacing removal is enabled
 * - `Style:` definitions get their font field remapped
 * - any other line gets every inline `\fn` override remapped
 *
 * Everything else is passed through untouched, including line terminators.
 */

use regex::{Captures, Regex};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::app_config::{Config, FontMapping};

/// Font-spacing override: `\fsp` with optional sign, digits and fraction
static FONT_SPACING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\fsp[-+]?\d*(?:\.\d+)?").unwrap()
});

/// Style definition: name in the first field, font in the second
static STYLE_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Style:\s*(.+?),(.+?),").unwrap()
});

/// Inline font override, running to the next backslash, brace or end of line
static INLINE_FONT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\fn([^\\}\r\n]+)").unwrap()
});

/// How a line is treated by the rewriter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `Style:` definition; only its font field is rewritten
    Style,
    /// Contains at least one `\fn` override
    InlineFont,
    /// Passed through verbatim
    Other,
}

/// Rewrites font references in subtitle lines
///
/// Holds an immutable snapshot of the mapping, so one instance can be shared
/// across a whole batch.
#[derive(Debug, Clone)]
pub struct FontRewriter {
    replacements: HashMap<String, String>,
    default_font: String,
    remove_spacing: bool,
}

impl FontRewriter {
    /// Create a rewriter with an explicit fallback font
    pub fn new(mapping: &FontMapping, default_font: impl Into<String>, remove_spacing: bool) -> Self {
        let replacements = mapping
            .iter()
            .map(|e| (e.font_before.clone(), e.font_after.clone()))
            .collect();

        Self {
            replacements,
            default_font: default_font.into(),
            remove_spacing,
        }
    }

    /// Create a rewriter from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.fonts, config.default_font(), config.remove_font_spacing)
    }

    pub fn default_font(&self) -> &str {
        &self.default_font
    }

    pub fn removes_spacing(&self) -> bool {
        self.remove_spacing
    }

    /// Replacement for a font name, falling back to the default font
    pub fn replacement_for(&self, font_name: &str) -> &str {
        self.replacements
            .get(font_name)
            .map(String::as_str)
            .unwrap_or(self.default_font.as_str())
    }

    /// Classify a line the way [`FontRewriter::rewrite_line`] will treat it
    ///
    /// Classification looks at the line after spacing removal, since that runs first.
    pub fn classify(&self, line: &str) -> LineKind {
        let line = self.strip_spacing(line);
        if STYLE_LINE_REGEX.is_match(&line) {
            LineKind::Style
        } else if INLINE_FONT_REGEX.is_match(&line) {
            LineKind::InlineFont
        } else {
            LineKind::Other
        }
    }

    /// Rewrite a single line (without its terminator)
    pub fn rewrite_line(&self, line: &str) -> String {
        let line = self.strip_spacing(line);

        if let Some(caps) = STYLE_LINE_REGEX.captures(&line) {
            let font_name = caps[2].trim();
            if font_name.is_empty() {
                return line.to_string();
            }

            // First textual occurrence, which may sit inside the style name
            let new_font = self.replacement_for(font_name);
            return line.replacen(font_name, new_font, 1);
        }

        if INLINE_FONT_REGEX.is_match(&line) {
            return INLINE_FONT_REGEX
                .replace_all(&line, |caps: &Captures| {
                    format!("\\fn{}", self.replacement_for(&caps[1]))
                })
                .into_owned();
        }

        line.into_owned()
    }

    /// Rewrite a sequence of lines, one output line per input line
    pub fn rewrite_lines<S: AsRef<str>>(&self, lines: &[S]) -> Vec<String> {
        lines.iter().map(|line| self.rewrite_line(line.as_ref())).collect()
    }

    /// Rewrite a whole file's text, keeping every line terminator as it was
    pub fn rewrite_text(&self, text: &str) -> String {
        let mut output = String::with_capacity(text.len());

        for raw_line in text.split_inclusive('\n') {
            let (content, terminator) = split_terminator(raw_line);
            output.push_str(&self.rewrite_line(content));
            output.push_str(terminator);
        }

        output
    }

    fn strip_spacing<'a>(&self, line: &'a str) -> std::borrow::Cow<'a, str> {
        if self.remove_spacing {
            FONT_SPACING_REGEX.replace_all(line, "")
        } else {
            std::borrow::Cow::Borrowed(line)
        }
    }
}

// @returns: (line content, "\r\n" | "\n" | "")
fn split_terminator(raw_line: &str) -> (&str, &str) {
    if let Some(content) = raw_line.strip_suffix("\r\n") {
        (content, &raw_line[content.len()..])
    } else if let Some(content) = raw_line.strip_suffix('\n') {
        (content, &raw_line[content.len()..])
    } else {
        (raw_line, "")
    }
}
