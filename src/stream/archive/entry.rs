use std::{
    collections::HashSet,
    fmt,
    io::{Error, ErrorKind, Result},
};

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Deserialize;
use zip::{write::SimpleFileOptions, CompressionMethod};

use crate::{config::ArchiveConfig, ByteStream};

/// File information an entry can inherit its date and mode from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryStats {
    /// Unix permission bits.
    pub mode: Option<u32>,
    /// Last modification time.
    pub modified: Option<DateTime<Utc>>,
}

impl From<&std::fs::Metadata> for EntryStats {
    fn from(metadata: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            Some(metadata.permissions().mode())
        };
        #[cfg(not(unix))]
        let mode = None;

        Self {
            mode,
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}

/// Metadata recorded for one archive entry.
///
/// These six fields are all an entry carries into the archive. When deserialized from an option
/// mapping any other key is dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EntryMetadata {
    /// Name of the entry inside the archive, `file_<n>` when absent.
    pub name: Option<String>,
    /// Modification time.
    pub date: Option<DateTime<Utc>>,
    /// Unix permission bits.
    pub mode: Option<u32>,
    /// Directory the entry is placed under.
    pub prefix: Option<String>,
    /// File information used for `date` and `mode` when those are absent.
    #[serde(skip)]
    pub stats: Option<EntryStats>,
    /// Store the entry without compression.
    pub store: bool,
}

impl EntryMetadata {
    /// Metadata with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Sets the modification time.
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the unix permission bits.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the directory the entry is placed under.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the file information `date` and `mode` fall back to.
    pub fn stats(mut self, stats: EntryStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Stores the entry without compression.
    pub fn store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }
}

/// One input stream destined for an archive.
pub struct ArchiveEntry {
    /// Content of the entry.
    pub stream: ByteStream,
    /// Entry metadata, a default name is generated when absent.
    pub metadata: Option<EntryMetadata>,
}

impl ArchiveEntry {
    /// An entry without metadata.
    pub fn new(stream: ByteStream) -> Self {
        Self {
            stream,
            metadata: None,
        }
    }

    /// An entry with the given metadata.
    pub fn with_metadata(stream: ByteStream, metadata: EntryMetadata) -> Self {
        Self {
            stream,
            metadata: Some(metadata),
        }
    }
}

impl fmt::Debug for ArchiveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Name and zip options of an entry, resolved against the archive configuration.
pub(crate) struct ResolvedEntry {
    pub(crate) name: String,
    pub(crate) options: SimpleFileOptions,
}

impl ResolvedEntry {
    pub(crate) fn resolve(
        metadata: Option<&EntryMetadata>,
        ordinal: usize,
        config: &ArchiveConfig,
    ) -> Result<Self> {
        let default = EntryMetadata::default();
        let metadata = metadata.unwrap_or(&default);
        let stats = metadata.stats.unwrap_or_default();

        let name = entry_name(metadata, ordinal, config.name_prepend_slash)?;

        let level = config.codec.level.filter(|level| *level >= 0);
        let method = if metadata.store || config.store || level == Some(0) {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };

        let mut options = SimpleFileOptions::default()
            .compression_method(method)
            .large_file(config.force_zip64);
        if method == CompressionMethod::Deflated {
            options = options.compression_level(level.map(i64::from));
        }
        if let Some(mode) = metadata.mode.or(stats.mode) {
            options = options.unix_permissions(mode);
        }
        if let Some(date) = metadata.date.or(stats.modified) {
            options = options.last_modified_time(zip_date(&date));
        }

        Ok(Self { name, options })
    }
}

fn entry_name(metadata: &EntryMetadata, ordinal: usize, prepend_slash: bool) -> Result<String> {
    let name = metadata
        .name
        .clone()
        .unwrap_or_else(|| format!("file_{ordinal}"));

    let joined = match metadata.prefix.as_deref() {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}/{name}"),
        _ => name,
    };
    let normalized = joined
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "entry name must be a non-empty string",
        ));
    }

    Ok(if prepend_slash {
        format!("/{normalized}")
    } else {
        normalized
    })
}

/// Returns `name`, or the first `stem (n).ext` variant of it that is not in `taken`.
pub(crate) fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_owned();
    }

    let segment = name.rfind('/').map_or(0, |slash| slash + 1);
    let (stem, extension) = match name[segment..].rfind('.') {
        Some(dot) if dot > 0 => name.split_at(segment + dot),
        _ => (name, ""),
    };

    (1..)
        .map(|n| format!("{stem} ({n}){extension}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_owned())
}

/// Zip timestamps cannot go before 1980, earlier dates are recorded as the zip epoch.
fn zip_date(date: &DateTime<Utc>) -> zip::DateTime {
    let date = date.naive_utc();
    u16::try_from(date.year())
        .ok()
        .and_then(|year| {
            zip::DateTime::from_date_and_time(
                year,
                date.month() as u8,
                date.day() as u8,
                date.hour() as u8,
                date.minute() as u8,
                date.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}
