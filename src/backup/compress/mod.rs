pub mod xz;

use crate::backup::compress::xz::XzConfig;
use crate::backup::finish::Finish;
use crate::backup::function_path;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithDebugObjectAndFnName;
use bzip2::write::BzEncoder;
use derive_more::From;
use flate2::write::GzEncoder;
use function_name::named;
use io_enum::Write;
use liblzma::write::XzEncoder;
use std::io;
use std::io::Write;

/// Compression filter sitting between the tar container and the artifact file.
#[derive(Write, From)]
pub enum Compressor<W: Write> {
    Gzip(GzEncoder<W>),
    Bzip2(BzEncoder<W>),
    Xz(XzEncoder<W>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompressorConfig {
    Gzip,
    Bzip2,
    Xz(XzConfig),
}

pub trait CompressorBuilder<W: Write> {
    fn build_compressor(&self, writer: W) -> Result<Compressor<W>>;
}

impl<W: Write> Finish<W> for Compressor<W> {
    fn finish(self) -> io::Result<W> {
        match self {
            Compressor::Gzip(w) => w.finish(),
            Compressor::Bzip2(w) => w.finish(),
            Compressor::Xz(w) => w.finish(),
        }
    }
}

impl<W: Write> CompressorBuilder<W> for CompressorConfig {
    #[named]
    fn build_compressor(&self, writer: W) -> Result<Compressor<W>> {
        match self {
            CompressorConfig::Gzip => {
                tracing::debug!("Creating gzip compressor");
                Ok(GzEncoder::new(writer, flate2::Compression::default()).into())
            }
            CompressorConfig::Bzip2 => {
                tracing::debug!("Creating bzip2 compressor");
                Ok(BzEncoder::new(writer, bzip2::Compression::default()).into())
            }
            CompressorConfig::Xz(xz) => xz.build_compressor(writer),
        }
        .with_debug_object_and_fn_name(self.clone(), function_path!())
    }
}
