//! Content items carried in tool results.
//!
//! A tool invocation returns an ordered sequence of content items. The
//! item is a closed tagged union so the transport decoder can always
//! reconstruct the concrete variant from the `type` tag alone.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File-kind tag for [`FileContent`].
///
/// Classifies the payload beyond its MIME label so consumers can route
/// files without sniffing the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Raster or vector image data.
    Image,
    /// Audio data.
    Audio,
    /// Video data.
    Video,
    /// Text or office document.
    Document,
    /// Compressed archive.
    Archive,
    /// Source code.
    Code,
    /// Structured data file (CSV, parquet, ...).
    Data,
    /// Anything that fits none of the above.
    Other,
}

/// Plain text content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// The text body.
    pub text: String,
    /// Optional label for the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Opaque file content, transported as base64 text.
///
/// Media-specific attributes are optional and only meaningful for the
/// matching [`FileKind`]; they are omitted from the wire form when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    /// File-kind tag.
    pub file_type: FileKind,
    /// Base64-encoded file body.
    pub data: String,
    /// MIME label, e.g. `image/png`.
    pub mime_type: String,
    /// Optional file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Decoded size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Image width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Image height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Audio/video duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Audio/video bitrate in bits per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    /// Document page count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Document author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Character or transfer encoding of the original file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Content checksum, format chosen by the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Source URL the file was fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Auxiliary metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl FileContent {
    /// Creates file content with the mandatory fields set.
    #[must_use]
    pub fn new(file_type: FileKind, data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            file_type,
            data: data.into(),
            mime_type: mime_type.into(),
            name: None,
            size: None,
            width: None,
            height: None,
            duration: None,
            bitrate: None,
            page_count: None,
            author: None,
            encoding: None,
            checksum: None,
            url: None,
            metadata: Map::new(),
        }
    }

    /// Sets the file name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets image dimensions.
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets audio/video duration and bitrate.
    #[must_use]
    pub fn with_media_info(mut self, duration: f64, bitrate: u32) -> Self {
        self.duration = Some(duration);
        self.bitrate = Some(bitrate);
        self
    }

    /// Sets document page count and author.
    #[must_use]
    pub fn with_document_info(mut self, page_count: u32, author: impl Into<String>) -> Self {
        self.page_count = Some(page_count);
        self.author = Some(author.into());
        self
    }

    /// Sets size, encoding and checksum.
    #[must_use]
    pub fn with_file_info(
        mut self,
        size: u64,
        encoding: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        self.size = Some(size);
        self.encoding = Some(encoding.into());
        self.checksum = Some(checksum.into());
        self
    }

    /// Sets the source URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Merges a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Arbitrary structured content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructContent {
    /// The structured value: a record, mapping, sequence or any nesting
    /// of those.
    pub data: Value,
    /// Optional label for the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional type name describing the value's shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Optional format label, e.g. `json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A single content item in a tool result.
///
/// Serialized with an internal `type` tag so every variant is
/// reconstructible by the transport decoder.
///
/// # Examples
///
/// ```
/// use toolbelt_core::Content;
///
/// let item = Content::text("hello");
/// let json = serde_json::to_value(&item).unwrap();
/// assert_eq!(json["type"], "text");
/// assert_eq!(json["text"], "hello");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text.
    Text(TextContent),
    /// Opaque file body with media attributes.
    File(FileContent),
    /// Arbitrary structured value.
    Struct(StructContent),
}

impl Content {
    /// Creates a text item.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent {
            text: text.into(),
            name: None,
        })
    }

    /// Creates a labelled text item.
    #[must_use]
    pub fn named_text(text: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Text(TextContent {
            text: text.into(),
            name: Some(name.into()),
        })
    }

    /// Creates a file item.
    #[must_use]
    pub fn file(file_type: FileKind, data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::File(FileContent::new(file_type, data, mime_type))
    }

    /// Creates an image file item.
    #[must_use]
    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::file(FileKind::Image, data, mime_type)
    }

    /// Creates an audio file item.
    #[must_use]
    pub fn audio(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::file(FileKind::Audio, data, mime_type)
    }

    /// Creates a video file item.
    #[must_use]
    pub fn video(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::file(FileKind::Video, data, mime_type)
    }

    /// Creates a document file item.
    #[must_use]
    pub fn document(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::file(FileKind::Document, data, mime_type)
    }

    /// Creates a structured item from any JSON value.
    #[must_use]
    pub fn structured(data: Value) -> Self {
        Self::Struct(StructContent {
            data,
            name: None,
            type_name: None,
            format: None,
        })
    }

    /// Returns the text body if this is a text item.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.text),
            _ => None,
        }
    }
}

impl From<FileContent> for Content {
    fn from(fc: FileContent) -> Self {
        Self::File(fc)
    }
}

impl From<StructContent> for Content {
    fn from(sc: StructContent) -> Self {
        Self::Struct(sc)
    }
}
