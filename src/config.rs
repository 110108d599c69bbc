//! Compression parameters shared by the gzip and zip builders.
//!
//! The facility receives a loosely shaped option mapping. Only the nine zlib-style keys listed on
//! [`CompressionConfig`] are recognized; everything else in the mapping is dropped when the
//! configuration is built.

use std::io::{Error, ErrorKind, Result};

use serde::Deserialize;

/// Default size of the chunks produced by the gzip encoder.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Smallest accepted `chunkSize`.
pub const MIN_CHUNK_SIZE: usize = 64;

/// Compression level used for archive entries unless configured otherwise.
pub const DEFAULT_ARCHIVE_LEVEL: i32 = 9;

/// zlib flush constants, as accepted by `flush` and `finishFlush`.
pub mod flush {
    /// `Z_NO_FLUSH`
    pub const NONE: i32 = 0;
    /// `Z_PARTIAL_FLUSH`
    pub const PARTIAL: i32 = 1;
    /// `Z_SYNC_FLUSH`
    pub const SYNC: i32 = 2;
    /// `Z_FULL_FLUSH`
    pub const FULL: i32 = 3;
    /// `Z_FINISH`
    pub const FINISH: i32 = 4;
    /// `Z_BLOCK`
    pub const BLOCK: i32 = 5;
}

/// Recognized compression options.
///
/// Every field is optional; an absent field means "use the codec default". Values are passed to
/// the codec unchecked and validated when an encoder is built from them, so a malformed value
/// surfaces as an error on the compressed stream rather than here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionConfig {
    /// Flush mode applied after every input chunk.
    pub flush: Option<i32>,
    /// Flush mode used when the input ends.
    pub finish_flush: Option<i32>,
    /// Upper bound on the size of each compressed chunk.
    pub chunk_size: Option<usize>,
    /// Base two logarithm of the deflate window size.
    pub window_bits: Option<u8>,
    /// Compression level, `-1` for the codec default or `0..=9`.
    pub level: Option<i32>,
    /// Memory level of the deflate state.
    pub mem_level: Option<u8>,
    /// Deflate strategy.
    pub strategy: Option<i32>,
    /// Preset dictionary.
    pub dictionary: Option<Vec<u8>>,
    /// Return codec information alongside results.
    pub info: Option<bool>,
}

impl CompressionConfig {
    /// Builds a configuration from a generic option mapping, keeping only the recognized keys.
    ///
    /// Options that are not an object yield an empty configuration.
    pub fn from_options(options: &serde_json::Value) -> serde_json::Result<Self> {
        if !options.is_object() {
            return Ok(Self::default());
        }
        Self::deserialize(options)
    }

    /// Returns a new configuration where every field set in `overrides` replaces the one in `self`.
    pub fn merge(&self, overrides: &Self) -> Self {
        Self {
            flush: overrides.flush.or(self.flush),
            finish_flush: overrides.finish_flush.or(self.finish_flush),
            chunk_size: overrides.chunk_size.or(self.chunk_size),
            window_bits: overrides.window_bits.or(self.window_bits),
            level: overrides.level.or(self.level),
            mem_level: overrides.mem_level.or(self.mem_level),
            strategy: overrides.strategy.or(self.strategy),
            dictionary: overrides
                .dictionary
                .clone()
                .or_else(|| self.dictionary.clone()),
            info: overrides.info.or(self.info),
        }
    }

    /// Sets the compression level.
    pub fn level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the per-chunk flush mode.
    pub fn flush(mut self, flush: i32) -> Self {
        self.flush = Some(flush);
        self
    }

    /// Sets the maximum output chunk size.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Sets the deflate window size.
    pub fn window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = Some(window_bits);
        self
    }

    /// Checks every set field against the range the deflate codec accepts.
    pub(crate) fn validate(&self) -> Result<()> {
        fn check(ok: bool, what: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(Error::new(ErrorKind::InvalidInput, what.to_owned()))
            }
        }

        if let Some(level) = self.level {
            check((-1..=9).contains(&level), "invalid compression level")?;
        }
        if let Some(flush) = self.flush {
            check(
                (flush::NONE..=flush::BLOCK).contains(&flush),
                "invalid flush mode",
            )?;
        }
        if let Some(finish_flush) = self.finish_flush {
            check(
                (flush::NONE..=flush::BLOCK).contains(&finish_flush),
                "invalid finish flush mode",
            )?;
        }
        if let Some(chunk_size) = self.chunk_size {
            check(chunk_size >= MIN_CHUNK_SIZE, "chunk size too small")?;
        }
        if let Some(window_bits) = self.window_bits {
            check((8..=15).contains(&window_bits), "invalid window bits")?;
        }
        if let Some(mem_level) = self.mem_level {
            check((1..=9).contains(&mem_level), "invalid memory level")?;
        }
        if let Some(strategy) = self.strategy {
            check((0..=4).contains(&strategy), "invalid strategy")?;
        }
        if self.mem_level.is_some()
            || self.strategy.is_some()
            || self.dictionary.is_some()
            || self.info.is_some()
        {
            tracing::debug!("memLevel, strategy, dictionary and info have no effect on gzip output");
        }

        Ok(())
    }

    pub(crate) fn effective_chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    pub(crate) fn effective_window_bits(&self) -> u8 {
        // zlib raises 8 to 9 for raw deflate streams.
        self.window_bits.unwrap_or(15).max(9)
    }

    pub(crate) fn flate2_level(&self) -> flate2::Compression {
        match self.level {
            Some(level) if level >= 0 => flate2::Compression::new(level as u32),
            _ => flate2::Compression::default(),
        }
    }

    /// Per-chunk flush mode. A per-chunk `FINISH` cannot end the deflate stream early, so it
    /// flushes like `FULL`; `BLOCK` has no flate2 equivalent and flushes like `PARTIAL`.
    pub(crate) fn flate2_flush(&self) -> flate2::FlushCompress {
        match self.flush.unwrap_or(flush::NONE) {
            flush::PARTIAL | flush::BLOCK => flate2::FlushCompress::Partial,
            flush::SYNC => flate2::FlushCompress::Sync,
            flush::FULL | flush::FINISH => flate2::FlushCompress::Full,
            _ => flate2::FlushCompress::None,
        }
    }
}

/// Per-call options of a zip archive.
///
/// Archive level fields apply to the archive as a whole; `codec` overrides compression options
/// for the entries and takes precedence over the facility configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArchiveOptions {
    /// Archive comment written to the end of central directory record.
    pub comment: Option<String>,
    /// Store every entry without compression.
    pub store: bool,
    /// Always write zip64 structures.
    pub force_zip64: bool,
    /// Prefix every entry name with a `/`.
    pub name_prepend_slash: bool,
    /// Compression option overrides for the entries.
    #[serde(rename = "zlib")]
    pub codec: CompressionConfig,
}

/// Fully resolved configuration of one archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Archive comment.
    pub comment: Option<String>,
    /// Store every entry without compression.
    pub store: bool,
    /// Always write zip64 structures.
    pub force_zip64: bool,
    /// Prefix every entry name with a `/`.
    pub name_prepend_slash: bool,
    /// Compression options applied to every entry.
    pub codec: CompressionConfig,
}

impl ArchiveConfig {
    /// Resolves the configuration of one archive.
    ///
    /// Codec options are layered lowest precedence first:
    ///
    /// 1. the built-in default, level [`DEFAULT_ARCHIVE_LEVEL`],
    /// 2. the facility configuration,
    /// 3. the `codec` options of this call.
    pub fn resolve(facility: &CompressionConfig, params: &ArchiveOptions) -> Self {
        let builtin = CompressionConfig::default().level(DEFAULT_ARCHIVE_LEVEL);
        let codec = builtin.merge(facility).merge(&params.codec);

        Self {
            comment: params.comment.clone(),
            store: params.store,
            force_zip64: params.force_zip64,
            name_prepend_slash: params.name_prepend_slash,
            codec,
        }
    }
}
