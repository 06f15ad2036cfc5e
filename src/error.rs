use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The record text breaks the level/tag structure. `line` is 1-based.
    MalformedRecord { line: usize, reason: String },
    DateFormat(String),
    UnresolvedReference { xref: String, context: String },
    ImageAccess { url: String, reason: String },
    ImageGeometry {
        width: f32,
        height: f32,
        max_width: f32,
        max_height: f32,
    },
    Locale(String),
    Io(std::io::Error),
    Render(String),
}

impl Error {
    /// Per-image failures the composer recovers from by skipping the image page.
    pub fn is_image_local(&self) -> bool {
        matches!(self, Error::ImageAccess { .. } | Error::ImageGeometry { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedRecord { line, reason } => {
                write!(f, "malformed record at line {line}: {reason}")
            }
            Error::DateFormat(raw) => write!(f, "unexpected date {raw:?}"),
            Error::UnresolvedReference { xref, context } => {
                write!(f, "unresolved reference {xref} ({context})")
            }
            Error::ImageAccess { url, reason } => write!(f, "cannot access image {url}: {reason}"),
            Error::ImageGeometry {
                width,
                height,
                max_width,
                max_height,
            } => write!(
                f,
                "cannot place {width}x{height} image in {max_width}x{max_height} box"
            ),
            Error::Locale(tag) => write!(f, "unknown locale {tag:?}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Render(msg) => write!(f, "render error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
