//! The facility: compression operations over a shared configuration, plus the start/stop
//! lifecycle that produces that configuration.

use std::{fmt, io, path::Path, sync::Arc};

use bytes::Bytes;
use futures_core::stream::Stream;

use crate::{
    buffer::{buffer_stream, Buffered},
    config::{ArchiveConfig, ArchiveOptions, CompressionConfig},
    stream::{ArchiveEntry, ArchiveStream, GzipStream},
    Error, Result,
};

/// Compression operations sharing one read-only base configuration.
///
/// Every call derives its own parameters and builds fresh streams, so a `Compressor` can be
/// shared between concurrent callers.
#[derive(Clone, Debug, Default)]
pub struct Compressor {
    config: Arc<CompressionConfig>,
}

impl Compressor {
    /// Creates a compressor over the given base configuration.
    pub fn new(config: CompressionConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The base configuration.
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Wraps `stream` in a gzip encoder.
    ///
    /// `overrides` take precedence over the base configuration field by field. Nothing is read
    /// until the returned stream is polled.
    pub fn create_gzip<S>(&self, stream: S, overrides: &CompressionConfig) -> GzipStream<S>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        GzipStream::with_config(stream, &self.config.merge(overrides))
    }

    /// Builds a zip archive of `entries`, in order.
    ///
    /// The archive is returned unfinalized, the caller must call [`ArchiveStream::finalize`]
    /// once it has appended everything it wants.
    pub fn create_zip(&self, entries: Vec<ArchiveEntry>, params: &ArchiveOptions) -> ArchiveStream {
        let mut archive = ArchiveStream::new(ArchiveConfig::resolve(&self.config, params));
        for entry in entries {
            archive.push(entry);
        }
        archive
    }

    /// Buffers `stream`, gzip compressed when `enable_gzip` is set and raw otherwise.
    pub fn create_buff_gzip<S>(
        &self,
        stream: S,
        enable_gzip: bool,
        params: &CompressionConfig,
    ) -> Buffered
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        if enable_gzip {
            buffer_stream(self.create_gzip(stream, params))
        } else {
            buffer_stream(stream)
        }
    }

    /// Buffers `entries`.
    ///
    /// With `enable_zip` the result holds exactly one future, the whole archive. Otherwise it
    /// holds one future per entry, in input order, each resolving to that entry's raw content.
    pub fn create_buff_zip(
        &self,
        entries: Vec<ArchiveEntry>,
        enable_zip: bool,
        params: &ArchiveOptions,
    ) -> Vec<Buffered> {
        if enable_zip {
            let archive = self.create_zip(entries, params);
            let finalizer = archive.finalizer();
            // Buffering must own the stream before finalization, so no closing bytes are
            // produced without a consumer attached.
            let buffered = buffer_stream(archive);
            finalizer.finalize();
            vec![buffered]
        } else {
            entries
                .into_iter()
                .map(|entry| buffer_stream(entry.stream))
                .collect()
        }
    }
}

/// The deflate facility.
///
/// Holds the facility options and, between [`start`](Facility::start) and
/// [`stop`](Facility::stop), the [`Compressor`] built from them.
pub struct Facility {
    name: &'static str,
    options: serde_json::Value,
    compressor: Option<Compressor>,
}

impl Facility {
    /// Creates a stopped facility with the given options.
    pub fn new(options: serde_json::Value) -> Self {
        Self {
            name: "deflate",
            options,
            compressor: None,
        }
    }

    /// Creates a stopped facility with options read from a JSON file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::new(serde_json::from_str(&contents)?))
    }

    /// Name of the facility.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The options the facility was created with.
    pub fn options(&self) -> &serde_json::Value {
        &self.options
    }

    /// Builds the compression configuration from the options, replacing any previous one.
    pub fn start(&mut self) -> Result<()> {
        let config = CompressionConfig::from_options(&self.options)?;
        tracing::debug!(facility = self.name, ?config, "facility started");
        self.compressor = Some(Compressor::new(config));
        Ok(())
    }

    /// Drops the compression configuration. Streams already handed out keep working.
    pub fn stop(&mut self) {
        if self.compressor.take().is_some() {
            tracing::debug!(facility = self.name, "facility stopped");
        }
    }

    /// Whether the facility is started.
    pub fn is_started(&self) -> bool {
        self.compressor.is_some()
    }

    /// The compression operations, available once the facility is started.
    pub fn compressor(&self) -> Result<&Compressor> {
        self.compressor.as_ref().ok_or(Error::NotStarted(self.name))
    }
}

impl fmt::Debug for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facility")
            .field("name", &self.name)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lifecycle() {
        let mut facility = Facility::new(json!({ "level": 2, "ns": "deflate" }));
        assert_eq!(facility.name(), "deflate");
        assert_eq!(facility.options()["ns"], "deflate");
        assert!(matches!(
            facility.compressor(),
            Err(Error::NotStarted("deflate"))
        ));

        facility.start().unwrap();
        assert_eq!(facility.compressor().unwrap().config().level, Some(2));

        facility.stop();
        assert!(!facility.is_started());
        assert!(facility.compressor().is_err());
    }

    #[test]
    fn restart_replaces_config() {
        let mut facility = Facility::new(json!({ "level": 2 }));
        facility.start().unwrap();
        let before = facility.compressor().unwrap().clone();

        facility.start().unwrap();
        let after = facility.compressor().unwrap();
        assert_eq!(before.config(), after.config());
        assert!(!Arc::ptr_eq(&before.config, &after.config));
    }

    #[test]
    fn malformed_options_fail_start() {
        let mut facility = Facility::new(json!({ "level": "max" }));
        assert!(matches!(facility.start(), Err(Error::Options(_))));
        assert!(!facility.is_started());
    }

    #[test]
    fn missing_config_file() {
        let err = Facility::from_config_file("/nonexistent/deflate.config.json").unwrap_err();
        assert!(matches!(err, Error::ReadConfig { .. }));
    }
}
