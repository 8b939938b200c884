use std::fmt::Write as _;

use syntect::{
    dumps::from_uncompressed_data,
    easy::HighlightLines,
    highlighting::{Color, FontStyle, Style, Theme, ThemeSet},
    html::{IncludeBackground, styled_line_to_highlighted_html},
    parsing::{SyntaxReference, SyntaxSet},
};
use thiserror::Error;
use tracing::debug;

use crate::application::render::options::CodeOptions;
use crate::domain::{nodes::CODE_CSS_CLASS, types::OutputTarget};

const HTML_THEME: &str = "base16-ocean.dark";
const LATEX_THEME: &str = "InspiredGitHub";

#[derive(Debug, Clone, Error)]
pub enum HighlightError {
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
}

/// In-process highlighter for one output target. Holds the syntax pack and
/// the theme fixed for that target.
pub struct CodeHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
    target: OutputTarget,
}

impl CodeHighlighter {
    pub fn new(target: OutputTarget) -> Self {
        let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
        let syntax_set: SyntaxSet =
            from_uncompressed_data(syntax_bytes).expect("syntax pack must be valid");
        let theme_name = match target {
            OutputTarget::Html => HTML_THEME,
            OutputTarget::Latex => LATEX_THEME,
        };
        let theme = ThemeSet::load_defaults()
            .themes
            .remove(theme_name)
            .unwrap_or_default();

        Self {
            syntax_set,
            theme,
            target,
        }
    }

    pub fn target(&self) -> OutputTarget {
        self.target
    }

    /// Highlight `lines` as `language`, falling back to plain text when the
    /// language is unknown. `anchor` is the directive's source line, used to
    /// key per-line anchors.
    pub fn highlight(
        &self,
        language: &str,
        lines: &[String],
        options: &CodeOptions,
        anchor: u32,
    ) -> Result<String, HighlightError> {
        let syntax = match find_syntax(&self.syntax_set, language) {
            Some(syntax) => syntax,
            None => {
                debug!(
                    target = "application::render::code",
                    language,
                    "Unknown language; highlighting as plain text"
                );
                self.syntax_set.find_syntax_plain_text()
            }
        };

        let regions = self.tokenize(syntax, language, lines)?;

        match self.target {
            OutputTarget::Html => self.format_html(language, &regions, options, anchor),
            OutputTarget::Latex => Ok(self.format_latex(&regions, options)),
        }
    }

    fn tokenize(
        &self,
        syntax: &SyntaxReference,
        language: &str,
        lines: &[String],
    ) -> Result<Vec<Vec<(Style, String)>>, HighlightError> {
        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut tokenized = Vec::with_capacity(lines.len());

        for line in lines {
            let with_newline = format!("{line}\n");
            let regions = highlighter
                .highlight_line(&with_newline, &self.syntax_set)
                .map_err(|err| highlighting_error(language, err))?;
            let owned = regions
                .into_iter()
                .map(|(style, text)| (style, text.trim_end_matches('\n').to_string()))
                .filter(|(_, text)| !text.is_empty())
                .collect();
            tokenized.push(owned);
        }

        Ok(tokenized)
    }

    fn format_html(
        &self,
        language: &str,
        regions: &[Vec<(Style, String)>],
        options: &CodeOptions,
        anchor: u32,
    ) -> Result<String, HighlightError> {
        let numbers = LineNumbers::new(options, regions.len());
        let mut html = String::new();

        let _ = write!(html, "<div class=\"{CODE_CSS_CLASS}\"><pre");
        let mut pre_style = String::new();
        if let Some(background) = self.theme.settings.background {
            let _ = write!(pre_style, "background-color:{};", hex(background));
        }
        if let Some(foreground) = self.theme.settings.foreground {
            let _ = write!(pre_style, "color:{};", hex(foreground));
        }
        if !pre_style.is_empty() {
            let _ = write!(html, " style=\"{pre_style}\"");
        }
        html.push('>');

        for (index, line) in regions.iter().enumerate() {
            let number = options.linenostart.saturating_add(index as u32);

            if options.lineanchors {
                let _ = write!(
                    html,
                    "<a id=\"{anchor}-{number}\" name=\"{anchor}-{number}\"></a>"
                );
            }
            if options.linenos {
                let _ = write!(
                    html,
                    "<span class=\"lineno\">{} </span>",
                    numbers.label(number)
                );
            }

            let borrowed: Vec<(Style, &str)> = line
                .iter()
                .map(|(style, text)| (*style, text.as_str()))
                .collect();
            let body = styled_line_to_highlighted_html(&borrowed, IncludeBackground::No)
                .map_err(|err| highlighting_error(language, err))?;

            if options.hl_lines.contains(&(index as u32 + 1)) {
                let _ = write!(html, "<span class=\"hll\">{body}</span>");
            } else {
                html.push_str(&body);
            }
            html.push('\n');
        }

        html.push_str("</pre></div>\n");
        Ok(html)
    }

    fn format_latex(&self, regions: &[Vec<(Style, String)>], options: &CodeOptions) -> String {
        let default_fg = self.theme.settings.foreground;
        let mut latex = String::from("\\begin{Verbatim}[commandchars=\\\\\\{\\}");
        if options.linenos {
            let _ = write!(
                latex,
                ",numbers=left,firstnumber={},stepnumber={}",
                options.linenostart,
                options.linenostep.max(1)
            );
        }
        latex.push_str("]\n");

        for line in regions {
            for (style, text) in line {
                latex.push_str(&latex_token(style, text, default_fg));
            }
            latex.push('\n');
        }

        latex.push_str("\\end{Verbatim}\n");
        latex
    }
}

/// Line number labels padded to a common width. Lines that fall between
/// steps get blank labels.
struct LineNumbers {
    width: usize,
    step: u32,
}

impl LineNumbers {
    fn new(options: &CodeOptions, count: usize) -> Self {
        let last = options
            .linenostart
            .saturating_add(count.saturating_sub(1) as u32);
        Self {
            width: last.to_string().len(),
            step: options.linenostep.max(1),
        }
    }

    fn label(&self, number: u32) -> String {
        if number % self.step == 0 {
            format!("{number:>width$}", width = self.width)
        } else {
            " ".repeat(self.width)
        }
    }
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.trim().to_ascii_lowercase();
    if lowercase.is_empty() {
        return None;
    }
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token.trim()))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

fn latex_token(style: &Style, text: &str, default_fg: Option<Color>) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\char92{}"),
            '{' => escaped.push_str("\\char123{}"),
            '}' => escaped.push_str("\\char125{}"),
            other => escaped.push(other),
        }
    }

    if text.trim().is_empty() {
        return escaped;
    }

    let mut token = escaped;
    if style.font_style.contains(FontStyle::ITALIC) {
        token = format!("\\textit{{{token}}}");
    }
    if style.font_style.contains(FontStyle::BOLD) {
        token = format!("\\textbf{{{token}}}");
    }
    if Some(style.foreground) != default_fg {
        let color = hex(style.foreground);
        token = format!("\\textcolor[HTML]{{{}}}{{{token}}}", &color[1..]);
    }
    token
}

fn hex(color: Color) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

fn highlighting_error(language: &str, err: syntect::Error) -> HighlightError {
    HighlightError::Highlighting {
        language: language.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let highlighter = CodeHighlighter::new(OutputTarget::Html);
        let html = highlighter
            .highlight(
                "not-a-real-language",
                &lines(&["a=1"]),
                &CodeOptions::default(),
                1,
            )
            .expect("plain text highlight");

        assert!(html.starts_with("<div class=\"code\"><pre"));
        assert!(html.contains("a=1"));
    }

    #[test]
    fn html_escapes_markup_in_code() {
        let highlighter = CodeHighlighter::new(OutputTarget::Html);
        let html = highlighter
            .highlight("text", &lines(&["<b>&</b>"]), &CodeOptions::default(), 1)
            .expect("highlight");
        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn line_numbers_respect_start_and_step() {
        let highlighter = CodeHighlighter::new(OutputTarget::Html);
        let options = CodeOptions {
            linenos: true,
            linenostart: 9,
            linenostep: 2,
            ..CodeOptions::default()
        };
        let html = highlighter
            .highlight("text", &lines(&["a", "b", "c"]), &options, 1)
            .expect("highlight");

        assert!(html.contains("<span class=\"lineno\">   </span>"));
        assert!(html.contains("<span class=\"lineno\">10 </span>"));
        assert!(!html.contains("<span class=\"lineno\"> 9 </span>"));
        assert_eq!(html.matches("class=\"lineno\"").count(), 3);
    }

    #[test]
    fn anchors_are_keyed_by_directive_line() {
        let highlighter = CodeHighlighter::new(OutputTarget::Html);
        let options = CodeOptions {
            lineanchors: true,
            ..CodeOptions::default()
        };
        let html = highlighter
            .highlight("rust", &lines(&["fn main() {}", "// done"]), &options, 42)
            .expect("highlight");

        assert!(html.contains("<a id=\"42-1\" name=\"42-1\"></a>"));
        assert!(html.contains("<a id=\"42-2\" name=\"42-2\"></a>"));
    }

    #[test]
    fn highlighted_lines_are_wrapped() {
        let highlighter = CodeHighlighter::new(OutputTarget::Html);
        let options = CodeOptions {
            hl_lines: vec![2],
            ..CodeOptions::default()
        };
        let html = highlighter
            .highlight("text", &lines(&["one", "two", "three"]), &options, 1)
            .expect("highlight");

        assert_eq!(html.matches("<span class=\"hll\">").count(), 1);
        let marked = html.split("<span class=\"hll\">").nth(1).expect("hll span");
        assert!(marked.contains("two"));
        assert!(!marked.split('\n').next().unwrap_or_default().contains("one"));
    }

    #[test]
    fn latex_output_is_a_verbatim_block() {
        let highlighter = CodeHighlighter::new(OutputTarget::Latex);
        let options = CodeOptions {
            linenos: true,
            hl_lines: vec![1],
            lineanchors: true,
            ..CodeOptions::default()
        };
        let latex = highlighter
            .highlight("python", &lines(&["x = {'a': '\\\\'}"]), &options, 3)
            .expect("highlight");

        assert!(latex.starts_with("\\begin{Verbatim}[commandchars=\\\\\\{\\},numbers=left"));
        assert!(latex.ends_with("\\end{Verbatim}\n"));
        assert!(latex.contains("\\char123{}"));
        assert!(latex.contains("\\char92{}"));
        assert!(!latex.contains("hll"));
        assert!(!latex.contains("<a "));
    }

    #[test]
    fn language_lookup_accepts_names_and_extensions() {
        let highlighter = CodeHighlighter::new(OutputTarget::Html);
        let plain = highlighter.syntax_set.find_syntax_plain_text().name.clone();

        for token in ["rust", "rs", "Python", "py"] {
            let syntax = find_syntax(&highlighter.syntax_set, token).expect("known syntax");
            assert_ne!(syntax.name, plain, "{token} resolved to plain text");
        }
        assert!(find_syntax(&highlighter.syntax_set, "not-a-real-language").is_none());
        assert!(find_syntax(&highlighter.syntax_set, "  ").is_none());
    }
}
