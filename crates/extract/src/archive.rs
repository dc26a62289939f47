//! Inspection of archived (zip) databases.

use crate::descriptor::{Descriptor, DescriptorFormat};
use crate::error::{ErrorKind, Result};
use crate::models::DiscoveredDatabase;
use crate::{hash, language};
use exn::{OptionExt, ResultExt};
use std::io::{Read, Seek, SeekFrom};
use tracing::instrument;
use zip::ZipArchive;

/// Extract a [`DiscoveredDatabase`] from an archived database.
///
/// The structured descriptor is preferred; the legacy descriptor is only
/// looked for when the structured one is absent. The content hash covers the
/// full archive byte stream, and is only computed once the archive has been
/// recognised as a database.
///
/// # Errors
///
/// - [`InvalidArchive`](ErrorKind::InvalidArchive) if this isn't a readable
///   zip file,
/// - [`MissingDescriptor`](ErrorKind::MissingDescriptor) if it is, but not a
///   database (expected for arbitrary zip files found during a walk),
/// - [`MalformedDescriptor`](ErrorKind::MalformedDescriptor) if the
///   descriptor can't be parsed.
#[instrument(skip(reader, location), fields(location = location.as_ref()))]
pub fn extract_archive<R: Read + Seek>(
    reader: R,
    location: impl AsRef<str>,
    file_size_bytes: u64,
) -> Result<DiscoveredDatabase> {
    let mut archive = ZipArchive::new(reader).or_raise(|| ErrorKind::InvalidArchive)?;
    let members: Vec<String> = archive.file_names().map(str::to_string).collect();
    let (format, member) = find_descriptor(&members).ok_or_raise(|| ErrorKind::MissingDescriptor)?;
    let bytes = read_member(&mut archive, member)?;
    let descriptor = Descriptor::parse(format, &bytes)?;
    let language = match &descriptor.primary_language {
        Some(language) => language.clone(),
        None => language::infer(&members),
    };

    let mut reader = archive.into_inner();
    reader.seek(SeekFrom::Start(0)).or_raise(|| ErrorKind::Io)?;
    let content_hash = hash::content_hash_reader(&mut reader)?;

    Ok(DiscoveredDatabase::archived(location.as_ref(), descriptor, language, file_size_bytes, content_hash))
}

/// Locate the descriptor member, preferring the structured format. When an
/// archive holds more than one candidate, the shallowest wins.
fn find_descriptor(members: &[String]) -> Option<(DescriptorFormat, &str)> {
    [DescriptorFormat::Structured, DescriptorFormat::Legacy].into_iter().find_map(|format| {
        members
            .iter()
            .filter(|member| member.rsplit('/').next() == Some(format.file_name()))
            .min_by_key(|member| member.matches('/').count())
            .map(|member| (format, member.as_str()))
    })
}

fn read_member<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name).or_raise(|| ErrorKind::InvalidArchive)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).or_raise(|| ErrorKind::InvalidArchive)?;
    Ok(bytes)
}
