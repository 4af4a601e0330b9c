use std::ops::Range;
use thiserror::Error;

pub type SegmentResult<T> = Result<T, SegmentError>;

/// Failures that prevent a file from being segmented at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Malformed comment at byte {offset}: '{opening}' is never closed by '{closing}'")]
    MalformedComment {
        offset: usize,
        opening: String,
        closing: String,
    },
}

impl SegmentError {
    pub fn unsupported(language: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(language.into())
    }

    pub fn malformed(offset: usize, opening: impl Into<String>, closing: impl Into<String>) -> Self {
        Self::MalformedComment {
            offset,
            opening: opening.into(),
            closing: closing.into(),
        }
    }

    /// Byte range of the offending text, if the error has one
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            SegmentError::UnsupportedLanguage(_) => None,
            SegmentError::MalformedComment { offset, opening, .. } => {
                Some(*offset..*offset + opening.len())
            }
        }
    }

    /// Short message suitable for showing to the author
    pub fn user_message(&self) -> &'static str {
        match self {
            SegmentError::UnsupportedLanguage(_) => "cannot open this file type",
            SegmentError::MalformedComment { .. } => "this file is malformed",
        }
    }
}

/// Pretty-print an error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &SegmentError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span().unwrap_or(0..source.len().min(1));

    let label_message = match error {
        SegmentError::UnsupportedLanguage(_) => "no language profile for this file".to_string(),
        SegmentError::MalformedComment { closing, .. } => {
            format!("comment opened here, expected '{}' before end of file", closing)
        }
    };

    let report = Report::build(ReportKind::Error, filename, span.start)
        .with_message(format!("{}: {}", error.user_message(), error))
        .with_label(
            Label::new((filename, span))
                .with_color(Color::Red)
                .with_message(label_message),
        )
        .finish();

    let mut output = Vec::new();
    if report
        .write((filename, Source::from(source)), &mut output)
        .is_err()
    {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_span_covers_opener() {
        let err = SegmentError::malformed(4, "/*", "*/");
        assert_eq!(err.span(), Some(4..6));
        assert_eq!(err.user_message(), "this file is malformed");
    }

    #[cfg(feature = "pretty-errors")]
    #[test]
    fn test_format_error_mentions_closer() {
        let source = "x = 1\n/* never closed\n";
        let err = SegmentError::malformed(6, "/*", "*/");
        let report = format_error(source, "main.c", &err);
        assert!(report.contains("*/"));
    }
}
