//! EPUB core media types.
//!
//! Maps file extensions and MIME strings onto the core media types a reading
//! system must support without fallbacks.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// A core media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// Raster and vector images.
    Image(ImageType),
    /// Content documents, fonts and other `application/*` resources.
    Application(ApplicationType),
    /// Audio resources.
    Audio(AudioType),
    /// Style sheets and scripts.
    Text(TextType),
}

/// Image media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    /// `image/gif`
    Gif,
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
    /// `image/svg+xml`
    Svg,
}

/// Application media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationType {
    /// XHTML content documents and the navigation document.
    Xhtml,
    /// OpenType and TrueType fonts.
    OpenType,
    /// WOFF fonts.
    Woff,
    /// Media overlay documents.
    MediaOverlays,
    /// Text-to-speech pronunciation lexicons.
    Pls,
    /// EPUB 2 navigation control file.
    Ncx,
    /// Package document.
    Opf,
}

/// Audio media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioType {
    /// MP3 audio.
    Mpeg,
    /// AAC LC audio in an MP4 container.
    Mp4,
}

/// Text media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextType {
    /// Cascading style sheets.
    Css,
    /// Scripts.
    Js,
}

impl MediaType {
    /// Map a file extension (without the dot) to its core media type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MediaType`] if the extension is not recognised.
    pub fn from_extension(ext: &str) -> Result<Self> {
        let ext = ext.to_ascii_lowercase();
        let media_type = match ext.as_str() {
            "gif" => Self::Image(ImageType::Gif),
            "jpeg" | "jpg" | "jpe" => Self::Image(ImageType::Jpeg),
            "png" => Self::Image(ImageType::Png),
            "svg" | "svgz" => Self::Image(ImageType::Svg),
            "xhtml" | "xht" | "html" | "htm" => Self::Application(ApplicationType::Xhtml),
            "otf" | "otc" | "ttf" | "ttc" => Self::Application(ApplicationType::OpenType),
            "woff" | "woff2" => Self::Application(ApplicationType::Woff),
            "smil" => Self::Application(ApplicationType::MediaOverlays),
            "pls" => Self::Application(ApplicationType::Pls),
            "ncx" => Self::Application(ApplicationType::Ncx),
            "opf" => Self::Application(ApplicationType::Opf),
            "mp3" => Self::Audio(AudioType::Mpeg),
            "aac" | "mp4" | "m4a" => Self::Audio(AudioType::Mp4),
            "css" => Self::Text(TextType::Css),
            "js" => Self::Text(TextType::Js),
            _ => return Err(Error::media_type(ext)),
        };
        Ok(media_type)
    }

    /// The MIME subtype, e.g. `svg+xml` for [`ImageType::Svg`].
    #[must_use]
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Image(t) => t.subtype(),
            Self::Application(t) => t.subtype(),
            Self::Audio(t) => t.subtype(),
            Self::Text(t) => t.subtype(),
        }
    }

    /// The MIME top-level type.
    #[must_use]
    pub fn top_level(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Application(_) => "application",
            Self::Audio(_) => "audio",
            Self::Text(_) => "text",
        }
    }

    /// Whether this is an XHTML content document.
    #[must_use]
    pub fn is_xhtml(&self) -> bool {
        matches!(self, Self::Application(ApplicationType::Xhtml))
    }
}

impl ImageType {
    fn subtype(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Svg => "svg+xml",
        }
    }
}

impl ApplicationType {
    fn subtype(self) -> &'static str {
        match self {
            Self::Xhtml => "xhtml+xml",
            Self::OpenType => "vnd.ms-opentype",
            Self::Woff => "font-woff",
            Self::MediaOverlays => "smil+xml",
            Self::Pls => "pls+xml",
            Self::Ncx => "x-dtbncx+xml",
            Self::Opf => "oebps-package+xml",
        }
    }
}

impl AudioType {
    fn subtype(self) -> &'static str {
        match self {
            Self::Mpeg => "mpeg",
            Self::Mp4 => "mp4",
        }
    }
}

impl TextType {
    fn subtype(self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Js => "javascript",
        }
    }
}

impl Default for MediaType {
    fn default() -> Self {
        Self::Application(ApplicationType::Xhtml)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.top_level(), self.subtype())
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for MediaType {
    type Err = Error;

    /// Parse a MIME string. Parameters after `;` are ignored.
    fn from_str(s: &str) -> Result<Self> {
        let essence = s.split(';').next().unwrap_or_default().trim();
        let media_type = match essence.to_ascii_lowercase().as_str() {
            "image/gif" => Self::Image(ImageType::Gif),
            "image/jpeg" => Self::Image(ImageType::Jpeg),
            "image/png" => Self::Image(ImageType::Png),
            "image/svg+xml" => Self::Image(ImageType::Svg),
            "application/xhtml+xml" => Self::Application(ApplicationType::Xhtml),
            "application/vnd.ms-opentype" | "application/font-sfnt" | "font/otf" | "font/ttf" => {
                Self::Application(ApplicationType::OpenType)
            }
            "application/font-woff" | "font/woff" | "font/woff2" => {
                Self::Application(ApplicationType::Woff)
            }
            "application/smil+xml" => Self::Application(ApplicationType::MediaOverlays),
            "application/pls+xml" => Self::Application(ApplicationType::Pls),
            "application/x-dtbncx+xml" => Self::Application(ApplicationType::Ncx),
            "application/oebps-package+xml" => Self::Application(ApplicationType::Opf),
            "audio/mpeg" => Self::Audio(AudioType::Mpeg),
            "audio/mp4" => Self::Audio(AudioType::Mp4),
            "text/css" => Self::Text(TextType::Css),
            "text/javascript" | "application/javascript" | "application/ecmascript" => {
                Self::Text(TextType::Js)
            }
            _ => return Err(Error::media_type(s)),
        };
        Ok(media_type)
    }
}

impl TryFrom<&Path> for MediaType {
    type Error = Error;

    fn try_from(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
    }
}
