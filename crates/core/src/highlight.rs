//! Syntax markup of a parsed token stream.
//!
//! Styles are the ones the parser recorded while reading each token, so a
//! word is marked as a keyword, function, variable or type by the role it
//! actually played.

use crate::lexer::{Style, TokenKind, TokenList};
use crate::mangle::call_name;
use crate::morphology::Case;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `<span class="...">` runs inside a `<pre>` block.
    Html,
    Markdown,
    /// A complete LaTeX document.
    Latex,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Html, Format::Markdown, Format::Latex];

    pub fn name(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Markdown => "markdown",
            Format::Latex => "latex",
        }
    }

    pub fn from_name(name: &str) -> Option<Format> {
        Format::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Comments starting a line are headings; the rest annotate the code
/// around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Style(Style),
    LineComment,
    InlineComment,
}

pub fn render(tokens: &TokenList, format: Format) -> String {
    let mut marks = Vec::with_capacity(tokens.tokens().len());
    let mut line_start = true;
    for (token, style) in tokens.tokens().iter().zip(tokens.styles()) {
        let mark = match token.kind {
            TokenKind::Comment if line_start => Mark::LineComment,
            TokenKind::Comment => Mark::InlineComment,
            _ => Mark::Style(*style),
        };
        marks.push((token.text.as_str(), mark));
        match token.kind {
            TokenKind::Space => line_start |= token.text.contains('\n'),
            _ => line_start = false,
        }
    }
    tracing::debug!(tokens = marks.len(), format = format.name(), "rendering markup");

    match format {
        Format::Html => html(&marks),
        Format::Markdown => markdown(&marks),
        Format::Latex => latex(&marks),
    }
}

/// A standalone page: the marked-up source beside an output pane whose
/// script runs the compiled program and then the page's opening handler.
pub fn page(tokens: &TokenList, code: &str) -> String {
    let entry = call_name("avautua", &[], Some(Case::Nominative));
    let mut out = String::from(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\" /><title>Tampio</title>\
         <link rel=\"stylesheet\" type=\"text/css\" href=\"syntax.css\"></head><body>\
         <div style=\"max-height:98vh;overflow:auto;float:left;width:50%;\">",
    );
    out.push_str(&render(tokens, Format::Html));
    out.push_str(
        "</div><div style=\"max-height:98vh;overflow:auto;float:right;\
         width:calc(50% - 5px);padding-left:5px;\"><div id=\"output\">\
         <script type=\"text/javascript\">\n",
    );
    // "</script" inside the code would close the element early.
    out.push_str(&code.replace("</", "<\\/"));
    out.push_str(&format!(
        "\ndocument.{}();\n</script></div></div></body></html>\n",
        entry
    ));
    out
}

// ──────────────────────────────────────────────
// Renderers
// ──────────────────────────────────────────────

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn html(marks: &[(&str, Mark)]) -> String {
    let mut out = String::from("<pre class=\"tampio\">");
    for (text, mark) in marks {
        let class = match mark {
            Mark::Style(s) => s.class_name(),
            Mark::LineComment => "comment-global",
            Mark::InlineComment => "comment-inline",
        };
        if class.is_empty() {
            out.push_str(&escape_html(text));
        } else {
            out.push_str(&format!("<span class=\"{}\">{}</span>", class, escape_html(text)));
        }
    }
    out.push_str("</pre>");
    out
}

fn markdown(marks: &[(&str, Mark)]) -> String {
    let mut out = String::new();
    for (text, mark) in marks {
        let code = match mark {
            Mark::Style(Style::Keyword) => "**",
            Mark::Style(Style::Function) => "_",
            Mark::Style(Style::Literal) => "`",
            _ => "",
        };
        out.push_str(code);
        out.push_str(text);
        out.push_str(code);
    }
    out
}

fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '&' | '%' | '#' | '_' | '{' | '}' | '$' => {
                out.push('\\');
                out.push(c);
            }
            '"' => out.push_str("''"),
            c => out.push(c),
        }
    }
    out
}

fn latex(marks: &[(&str, Mark)]) -> String {
    let mut out = String::from(
        "\\documentclass{article}\\usepackage[utf8]{inputenc}\\usepackage[T1]{fontenc}\
         \\usepackage[finnish]{babel}\\title{Tampiokoodi}\
         \\begin{document}\\setlength\\emergencystretch{\\hsize}\n",
    );
    for (text, mark) in marks {
        let command = match mark {
            Mark::Style(Style::Keyword) => Some("\\textbf"),
            Mark::Style(Style::Function) => Some("\\emph"),
            Mark::Style(Style::Variable) | Mark::Style(Style::Type) => Some("\\textsc"),
            Mark::LineComment => Some("\\section"),
            Mark::InlineComment => Some("\\footnote"),
            Mark::Style(_) => None,
        };
        let body = match mark {
            Mark::LineComment | Mark::InlineComment => text.trim_start_matches('#').trim(),
            _ => text,
        };
        match command {
            Some(c) => out.push_str(&format!("{}{{{}}}", c, escape_latex(body))),
            None => out.push_str(&escape_latex(body)),
        }
    }
    out.push_str("\n\\end{document}\n");
    out
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
