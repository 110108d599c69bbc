use std::io::Result;

use flate2::FlushCompress;

mod flate;
mod gzip;

pub(crate) use self::{flate::FlateEncoder, gzip::GzipEncoder};

pub trait Encode {
    /// Return `Ok(bytes_produced)` when header was written
    /// Return `Err(_)` if writing fails
    fn write_header(&mut self, output: &mut [u8]) -> Result<usize>;

    /// Return `Ok((input_consumed, output_produced))`
    fn encode(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushCompress,
    ) -> Result<(usize, usize)>;

    /// Return `Ok((done, output_produced))`
    fn finish(&mut self, output: &mut [u8]) -> Result<(bool, usize)>;

    /// Return `Ok(bytes_produced)` if footer was written successfully
    /// Return `Err(_)` if writing fails
    fn write_footer(&mut self, output: &mut [u8]) -> Result<usize>;
}
