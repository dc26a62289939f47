//! Parsing of the two descriptor generations found inside a database.
//!
//! - The structured descriptor (`codeql-database.yml`) is YAML and may carry
//!   the primary language and a `creationMetadata` block.
//! - The legacy descriptor (`.dbinfo`) is XML and only ever tells us
//!   the source location prefix.

use crate::consts::{LEGACY_DESCRIPTOR, LEGACY_ROOT_ELEMENT, LEGACY_SOURCE_PREFIX_ELEMENT, STRUCTURED_DESCRIPTOR};
use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use tracing::instrument;

/// Which descriptor generation a database was described by.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorFormat {
    #[display("codeql-database.yml")]
    Structured,
    #[display(".dbinfo")]
    Legacy,
}
impl DescriptorFormat {
    /// File name the descriptor is stored under.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Structured => STRUCTURED_DESCRIPTOR,
            Self::Legacy => LEGACY_DESCRIPTOR,
        }
    }
}

/// Build details recorded by the CLI that created the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationMetadata {
    /// Revision of the analysed source tree.
    pub sha: String,
    pub cli_version: String,
    pub creation_time: String,
}

/// Normalized contents of either descriptor generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub format: DescriptorFormat,
    pub source_location_prefix: String,
    /// `None` when absent or empty; the language then has to be inferred.
    pub primary_language: Option<String>,
    /// Only ever populated for the structured format, and only when the
    /// descriptor includes a `creationMetadata` block.
    pub creation_metadata: Option<CreationMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredDocument {
    source_location_prefix: Option<String>,
    primary_language: Option<String>,
    creation_metadata: Option<CreationDocument>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreationDocument {
    sha: Option<String>,
    cli_version: Option<String>,
    creation_time: Option<String>,
}

impl Descriptor {
    /// Parse the bytes of a `codeql-database.yml` file.
    #[instrument(skip(bytes), fields(size = bytes.len()))]
    pub fn parse_structured(bytes: &[u8]) -> Result<Self> {
        let document: StructuredDocument =
            serde_yaml::from_slice(bytes).or_raise(|| ErrorKind::MalformedDescriptor {
                format: DescriptorFormat::Structured,
                reason: "not a valid descriptor document".to_string(),
            })?;
        Ok(Self {
            format: DescriptorFormat::Structured,
            source_location_prefix: document.source_location_prefix.unwrap_or_default(),
            primary_language: document.primary_language.filter(|l| !l.trim().is_empty()),
            creation_metadata: document.creation_metadata.map(|c| CreationMetadata {
                sha: c.sha.unwrap_or_default(),
                cli_version: c.cli_version.unwrap_or_default(),
                creation_time: c.creation_time.unwrap_or_default(),
            }),
        })
    }

    /// Parse the bytes of a `.dbinfo` file.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected. The document
    /// must be well-formed with a `<dbinfo>` root; the prefix is the character
    /// data (text and CDATA) of its first `<sourceLocationPrefix>` child.
    #[instrument(skip(bytes), fields(size = bytes.len()))]
    pub fn parse_legacy(bytes: &[u8]) -> Result<Self> {
        let malformed = |reason: &str| ErrorKind::MalformedDescriptor {
            format: DescriptorFormat::Legacy,
            reason: reason.to_string(),
        };
        let markup = String::from_utf8_lossy(bytes);
        let mut reader = Reader::from_str(&markup);
        let mut depth = 0usize;
        let mut found_root = false;
        let mut prefix: Option<String> = None;
        let mut in_prefix = false;

        loop {
            let event = reader.read_event().or_raise(|| malformed("not well-formed XML"))?;
            match &event {
                Event::Start(element) | Event::Empty(element) => {
                    let opens = matches!(event, Event::Start(_));
                    let name = element.local_name();
                    if depth == 0 {
                        if name.as_ref() != LEGACY_ROOT_ELEMENT {
                            exn::bail!(malformed("missing <dbinfo> element"));
                        }
                        found_root = true;
                        if !opens {
                            break;
                        }
                    } else if depth == 1 && prefix.is_none() && name.as_ref() == LEGACY_SOURCE_PREFIX_ELEMENT {
                        prefix = Some(String::new());
                        in_prefix = opens;
                    }
                    if opens {
                        depth += 1;
                    }
                },
                Event::Text(text) if in_prefix && depth == 2 => {
                    let text = text.unescape().or_raise(|| malformed("invalid character reference"))?;
                    prefix.get_or_insert_default().push_str(&text);
                },
                Event::CData(data) => {
                    if in_prefix && depth == 2 {
                        prefix.get_or_insert_default().push_str(&String::from_utf8_lossy(data));
                    }
                },
                Event::End(_) => {
                    depth = depth.checked_sub(1).ok_or_raise(|| malformed("unbalanced end tag"))?;
                    match depth {
                        0 => break,
                        1 => in_prefix = false,
                        _ => {},
                    }
                },
                Event::Eof if depth > 0 => exn::bail!(malformed("unexpected end of document")),
                Event::Eof => break,
                _ => {},
            }
        }

        if !found_root {
            exn::bail!(malformed("missing <dbinfo> element"));
        }
        Ok(Self {
            format: DescriptorFormat::Legacy,
            source_location_prefix: prefix.map(|p| p.trim().to_string()).unwrap_or_default(),
            primary_language: None,
            creation_metadata: None,
        })
    }

    /// Parse descriptor bytes of the given format.
    pub fn parse(format: DescriptorFormat, bytes: &[u8]) -> Result<Self> {
        match format {
            DescriptorFormat::Structured => Self::parse_structured(bytes),
            DescriptorFormat::Legacy => Self::parse_legacy(bytes),
        }
    }
}
