//! Batch framing: several SVG documents in one text stream.
//!
//! ```text
//! SVG_CONTENT_START
//! <first document>
//! SVG_CONTENT_SEPARATOR
//! <second document>
//! SVG_CONTENT_END
//! ```
//!
//! Each marker sits on its own line. Documents are written verbatim
//! with trailing newlines trimmed.

/// Line opening a framed stream.
pub const SVG_START: &str = "SVG_CONTENT_START";
/// Line between two documents.
pub const SVG_SEPARATOR: &str = "SVG_CONTENT_SEPARATOR";
/// Line closing a framed stream.
pub const SVG_END: &str = "SVG_CONTENT_END";

/// Errors from reading a framed stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// No `SVG_CONTENT_START` line was found.
    #[error("framed output is missing the SVG_CONTENT_START marker")]
    MissingStart,

    /// The stream ended without an `SVG_CONTENT_END` line.
    #[error("framed output is missing the SVG_CONTENT_END marker")]
    MissingEnd,
}

/// Frame documents between start, separator and end markers.
///
/// An empty slice gives just the start and end lines.
///
/// # Examples
///
/// ```
/// use edgeline_export::frame_documents;
///
/// let framed = frame_documents(&["<svg/>".to_string(), "<svg/>".to_string()]);
/// assert_eq!(
///     framed,
///     "SVG_CONTENT_START\n<svg/>\nSVG_CONTENT_SEPARATOR\n<svg/>\nSVG_CONTENT_END\n"
/// );
/// ```
#[must_use]
pub fn frame_documents(documents: &[String]) -> String {
    let mut out = String::new();
    out.push_str(SVG_START);
    out.push('\n');
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str(SVG_SEPARATOR);
            out.push('\n');
        }
        out.push_str(doc.trim_end_matches('\n'));
        out.push('\n');
    }
    out.push_str(SVG_END);
    out.push('\n');
    out
}

/// Split a framed stream back into its documents.
///
/// Text before the start marker and after the end marker is ignored.
///
/// # Errors
///
/// Returns [`ExportError::MissingStart`] or [`ExportError::MissingEnd`]
/// when a marker line is absent.
pub fn parse_framed(text: &str) -> Result<Vec<String>, ExportError> {
    let mut lines = text.lines();
    if !lines.by_ref().any(|line| line.trim_end() == SVG_START) {
        return Err(ExportError::MissingStart);
    }

    let mut documents = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in lines {
        match line.trim_end() {
            SVG_END => {
                if !current.is_empty() || !documents.is_empty() {
                    documents.push(current.join("\n"));
                }
                return Ok(documents);
            }
            SVG_SEPARATOR => documents.push(std::mem::take(&mut current).join("\n")),
            _ => current.push(line),
        }
    }
    Err(ExportError::MissingEnd)
}
