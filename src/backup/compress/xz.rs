use crate::backup::compress::{Compressor, CompressorBuilder};
use crate::backup::result_error::result::Result;
use bon::Builder;
use getset::CopyGetters;
use liblzma::stream::{Check, MtStreamBuilder};
use liblzma::write::XzEncoder;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::io::Write;
use validator::Validate;

/// Same preset the `xz` command line tool uses when none is given
static DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Settings for the `xz` compression method
///
/// Both values are optional; when absent the encoder runs single threaded
/// at the default preset, which matches a plain `tar | xz` pipeline.
#[skip_serializing_none]
#[derive(
    Clone, Default, Validate, Serialize, Deserialize, Debug, PartialEq, Eq, Builder, CopyGetters,
)]
#[serde(deny_unknown_fields)]
#[getset(get_copy = "pub")]
pub struct XzConfig {
    /// Compression preset (0-9)
    ///
    /// - 0: Fastest, largest files
    /// - 6: Default
    /// - 9: Slowest, smallest files
    #[validate(range(min = 0, max = 9))]
    level: Option<u32>,

    /// Number of encoder threads
    ///
    /// Anything above 1 switches to the multi-threaded liblzma stream,
    /// which trades memory for speed.
    #[validate(range(min = 1))]
    thread: Option<u32>,
}

impl<W: Write> CompressorBuilder<W> for XzConfig {
    fn build_compressor(&self, writer: W) -> Result<Compressor<W>> {
        let level = self.level.unwrap_or(DEFAULT_COMPRESSION_LEVEL);
        let thread = self.thread.unwrap_or(1);

        tracing::debug!("Creating XZ compressor with level={}, threads={}", level, thread);

        if thread == 1 {
            Ok(XzEncoder::new(writer, level).into())
        } else {
            let stream = MtStreamBuilder::new()
                .preset(level)
                .check(Check::Crc64)
                .threads(thread)
                .encoder()?;
            Ok(XzEncoder::new_stream(writer, stream).into())
        }
    }
}
