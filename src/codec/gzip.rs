use crate::{codec::Encode, config::CompressionConfig};
use std::io::{Error, ErrorKind, Result};

use flate2::{Compression, Crc, FlushCompress};

const HEADER_LEN: usize = 10;
const FOOTER_LEN: usize = 8;

/// Operating system byte of the header, "unknown".
const OS_UNKNOWN: u8 = 0xff;

#[derive(Debug)]
pub struct GzipEncoder {
    inner: crate::codec::FlateEncoder,
    crc: Crc,
    level: Compression,
}

impl GzipEncoder {
    /// Builds an encoder from a merged configuration, rejecting values the codec does not accept.
    pub(crate) fn from_config(config: &CompressionConfig) -> Result<Self> {
        config.validate()?;

        let level = config.flate2_level();
        Ok(Self {
            inner: crate::codec::FlateEncoder::new(level, config.effective_window_bits()),
            crc: Crc::new(),
            level,
        })
    }
}

impl Encode for GzipEncoder {
    fn write_header(&mut self, output: &mut [u8]) -> Result<usize> {
        if output.len() < HEADER_LEN {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "output buffer too short",
            ));
        }

        let level_byte = if self.level.level() >= Compression::best().level() {
            0x02
        } else if self.level.level() == Compression::fast().level() {
            0x04
        } else {
            0x00
        };

        let header = [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, level_byte, OS_UNKNOWN];

        output[..HEADER_LEN].copy_from_slice(&header);

        Ok(HEADER_LEN)
    }

    fn encode(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushCompress,
    ) -> Result<(usize, usize)> {
        let (in_length, out_length) = self.inner.encode(input, output, flush)?;
        self.crc.update(&input[..in_length]);
        Ok((in_length, out_length))
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<(bool, usize)> {
        self.inner.finish(output)
    }

    fn write_footer(&mut self, output: &mut [u8]) -> Result<usize> {
        if output.len() < FOOTER_LEN {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "output buffer too short",
            ));
        }

        let crc = self.crc.sum().to_le_bytes();
        let bytes_read = self.crc.amount().to_le_bytes();

        output[0..4].copy_from_slice(&crc);
        output[4..8].copy_from_slice(&bytes_read);

        Ok(FOOTER_LEN)
    }
}
