use serde::Serialize;

/// Which part of the pipeline produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Syntax,
    Include,
    UnresolvedClass,
    DuplicateClass,
    UnresolvedMember,
    UnresolvedSymbol,
    EmptyType,
}

impl DiagnosticKind {
    fn label(self) -> &'static str {
        match self {
            DiagnosticKind::Syntax => "Syntax error",
            DiagnosticKind::Include => "Include error",
            DiagnosticKind::UnresolvedClass => "Unresolved class",
            DiagnosticKind::DuplicateClass => "Duplicate class",
            DiagnosticKind::UnresolvedMember => "Unresolved member",
            DiagnosticKind::UnresolvedSymbol => "Unresolved symbol",
            DiagnosticKind::EmptyType => "Type error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A compiler diagnostic tied to a source position.
///
/// Syntax errors come from the parser, everything else from the hierarchy
/// and validation passes. Columns and lengths count characters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub len: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        file: &str,
        line: u32,
        column: u32,
        len: u32,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Error,
            file: file.to_owned(),
            line,
            column,
            len,
            message: message.into(),
        }
    }

    pub fn syntax(file: &str, line: u32, column: u32, len: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Syntax, file, line, column, len, message)
    }

    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Serialize with every field present, `null` where a position is unknown.
    pub fn to_json_value(&self) -> serde_json::Value {
        let position = |v: u32| {
            if v == 0 {
                serde_json::Value::Null
            } else {
                serde_json::Value::from(v)
            }
        };
        serde_json::json!({
            "column":   position(self.column),
            "file":     self.file,
            "kind":     self.kind,
            "len":      self.len,
            "line":     position(self.line),
            "message":  self.message,
            "severity": self.severity,
        })
    }

    /// Render as a message line, the offending source line and a pointer
    /// under the offending token.
    pub fn render(&self, source: Option<&str>) -> String {
        let label = match self.severity {
            Severity::Error => self.kind.label(),
            Severity::Warning => "Warning",
        };
        let mut out = format!("{}: {}", label, self.message);
        let Some(text) = source.and_then(|s| s.lines().nth(self.line.saturating_sub(1) as usize))
        else {
            return out;
        };
        if self.line == 0 {
            return out;
        }
        let prefix = format!("Line {}: ", self.line);
        let shown = text.replace('\t', " ");
        out.push('\n');
        out.push_str(&prefix);
        out.push_str(&shown);
        out.push('\n');
        let indent = prefix.chars().count() + self.column.saturating_sub(1) as usize;
        out.push_str(&" ".repeat(indent));
        out.push('^');
        out.push_str(&"~".repeat(self.len.saturating_sub(1) as usize));
        out
    }
}

/// Failures that stop compilation before any diagnostics can be collected.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid lexicon {origin}: {message}")]
    Lexicon { origin: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_points_at_token() {
        let d = Diagnostic::syntax("a.itp", 2, 8, 3, "unexpected word");
        let src = "Olkoon x 1.\nOlkoon y foo bar.\n";
        let rendered = d.render(Some(src));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Syntax error: unexpected word");
        assert_eq!(lines[1], "Line 2: Olkoon y foo bar.");
        let caret = lines[2].find('^').unwrap();
        assert_eq!(&lines[1][caret..caret + 3], "y f");
        assert!(lines[2].ends_with("^~~"));
    }

    #[test]
    fn warning_renders_with_warning_label() {
        let d = Diagnostic::new(DiagnosticKind::UnresolvedMember, "a.itp", 0, 0, 0, "hmm").warning();
        assert_eq!(d.render(None), "Warning: hmm");
        assert!(!d.is_error());
    }

    #[test]
    fn json_has_all_fields() {
        let d = Diagnostic::new(DiagnosticKind::UnresolvedClass, "b.itp", 0, 0, 0, "no class");
        let v = d.to_json_value();
        assert_eq!(v["kind"], "unresolved_class");
        assert_eq!(v["severity"], "error");
        assert!(v["line"].is_null());
        assert!(v["column"].is_null());
    }

    #[test]
    fn duplicate_class_kind_label_and_json() {
        let d = Diagnostic::new(DiagnosticKind::DuplicateClass, "c.itp", 0, 0, 0, "again");
        assert_eq!(d.render(None), "Duplicate class: again");
        assert_eq!(d.to_json_value()["kind"], "duplicate_class");
    }
}
