pub mod source;
pub mod tar;
pub mod zip;

use crate::backup::archive::source::SourceTree;
use crate::backup::archive::tar::write_tar;
use crate::backup::archive::zip::write_zip;
use crate::backup::compress::xz::XzConfig;
use crate::backup::compress::CompressorConfig;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use chrono::{DateTime, TimeZone};
use derive_more::Display;
use function_name::named;
use indicatif::ProgressBar;
use sanitize_filename::sanitize;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, IntoInnerError, Seek, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

static TIME_FORMAT: &str = "%Y%m%d_%H%M%S";
static TMP_FILE_EXT: &str = "tmp";

/// Compression method accepted on the command line
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    #[default]
    #[display("gzip")]
    Gzip,
    #[display("bzip2")]
    Bzip2,
    #[display("xz")]
    Xz,
    #[display("zip")]
    Zip,
}

impl FromStr for CompressionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gzip" => Ok(Self::Gzip),
            "bzip2" => Ok(Self::Bzip2),
            "xz" => Ok(Self::Xz),
            "zip" => Ok(Self::Zip),
            other => Err(Error::UnknownCompressionMethod(other.to_string())),
        }
    }
}

impl FileExtProvider for CompressionMethod {
    fn file_ext(&self) -> &'static str {
        match self {
            CompressionMethod::Gzip => "tar.gz",
            CompressionMethod::Bzip2 => "tar.bz2",
            CompressionMethod::Xz => "tar.xz",
            CompressionMethod::Zip => "zip",
        }
    }
}

impl CompressionMethod {
    pub fn archive_format(&self, xz: &XzConfig) -> ArchiveFormat {
        match self {
            CompressionMethod::Gzip => ArchiveFormat::Tar(CompressorConfig::Gzip),
            CompressionMethod::Bzip2 => ArchiveFormat::Tar(CompressorConfig::Bzip2),
            CompressionMethod::Xz => ArchiveFormat::Tar(CompressorConfig::Xz(xz.clone())),
            CompressionMethod::Zip => ArchiveFormat::Zip,
        }
    }
}

/// Container layout of an artifact
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// tar container piped through a compression filter
    Tar(CompressorConfig),
    /// zip container, members deflated individually
    Zip,
}

pub trait Archiver {
    /// Writes the whole source tree into `writer` and returns it once the container is closed
    fn archive<W: Write + Seek>(
        &self,
        source: &SourceTree,
        writer: W,
        progress: &ProgressBar,
    ) -> Result<W>;
}

impl Archiver for ArchiveFormat {
    fn archive<W: Write + Seek>(
        &self,
        source: &SourceTree,
        writer: W,
        progress: &ProgressBar,
    ) -> Result<W> {
        match self {
            ArchiveFormat::Tar(compressor) => write_tar(source, writer, compressor, progress),
            ArchiveFormat::Zip => write_zip(source, writer, progress),
        }
    }
}

impl FileExtProvider for ArchiveFormat {
    fn file_ext(&self) -> &'static str {
        match self {
            ArchiveFormat::Tar(CompressorConfig::Gzip) => CompressionMethod::Gzip.file_ext(),
            ArchiveFormat::Tar(CompressorConfig::Bzip2) => CompressionMethod::Bzip2.file_ext(),
            ArchiveFormat::Tar(CompressorConfig::Xz(_)) => CompressionMethod::Xz.file_ext(),
            ArchiveFormat::Zip => CompressionMethod::Zip.file_ext(),
        }
    }
}

/// `<base>_backup_<YYYYmmdd_HHMMSS>.<ext>`, with `base` made safe for use as a file name
pub fn artifact_file_name<T, E>(base_name: &str, dt: &DateTime<T>, ext: &E) -> String
where
    T: TimeZone,
    T::Offset: Display,
    E: FileExtProvider,
{
    format!(
        "{}_backup_{}.{}",
        sanitize(base_name),
        dt.format(TIME_FORMAT),
        ext.file_ext()
    )
}

/// Archives `source` into `out_path`
///
/// The archive is written to a `.tmp` sibling first and renamed once every
/// encoder layer has been finished and synced, so `out_path` never holds a
/// truncated archive. An existing `out_path` is never replaced.
#[named]
pub fn create_artifact<A: Archiver + std::fmt::Debug + Clone + Send + 'static>(
    archiver: &A,
    source: &SourceTree,
    out_path: &Path,
    progress: &ProgressBar,
) -> Result<PathBuf> {
    if out_path.exists() {
        return Err(Error::from(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{:?} already exists", out_path),
        )));
    }

    let mut tmp_name = out_path.as_os_str().to_owned();
    tmp_name.push(".");
    tmp_name.push(TMP_FILE_EXT);
    let tmp_path = PathBuf::from(tmp_name);

    let res = File::create_new(&tmp_path)
        .map(BufWriter::new)
        .map_err(Error::from)
        .and_then(|writer| archiver.archive(source, writer, progress))
        .and_then(|writer| {
            let file = writer.into_inner().map_err(IntoInnerError::into_error)?;
            file.sync_all()?;
            Ok(())
        })
        .and_then(|_| std::fs::rename(&tmp_path, out_path).map_err(Error::from))
        .with_debug_object_and_fn_name(archiver.clone(), function_path!());

    match res {
        Ok(_) => {
            tracing::info!("Created backup file: {:?}", out_path);
            Ok(out_path.to_path_buf())
        }
        Err(mut e) => {
            if tmp_path.exists() {
                if let Err(e2) = std::fs::remove_file(&tmp_path) {
                    e = e.chain(Error::from(e2).with_msg("Delete tmp file failed."));
                }
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_compression_method_from_str() {
        assert_eq!("gzip".parse::<CompressionMethod>().unwrap(), CompressionMethod::Gzip);
        assert_eq!("bzip2".parse::<CompressionMethod>().unwrap(), CompressionMethod::Bzip2);
        assert_eq!("xz".parse::<CompressionMethod>().unwrap(), CompressionMethod::Xz);
        assert_eq!("zip".parse::<CompressionMethod>().unwrap(), CompressionMethod::Zip);
        assert!(matches!(
            "GZIP".parse::<CompressionMethod>(),
            Err(Error::UnknownCompressionMethod(m)) if m == "GZIP"
        ));
        assert!("rar".parse::<CompressionMethod>().is_err());
    }

    #[test]
    fn test_default_method_is_gzip() {
        assert_eq!(CompressionMethod::default().to_string(), "gzip");
    }

    #[test]
    fn test_format_ext_matches_method_ext() {
        for method in [
            CompressionMethod::Gzip,
            CompressionMethod::Bzip2,
            CompressionMethod::Xz,
            CompressionMethod::Zip,
        ] {
            let format = method.archive_format(&XzConfig::default());
            assert_eq!(format.file_ext(), method.file_ext());
        }
    }

    #[test]
    fn test_artifact_file_name() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            artifact_file_name("photos", &dt, &CompressionMethod::Xz),
            "photos_backup_20240309_070501.tar.xz"
        );
        assert_eq!(
            artifact_file_name("a:b", &dt, &CompressionMethod::Zip),
            "ab_backup_20240309_070501.zip"
        );
    }

    #[test]
    fn test_create_artifact_renames_tmp() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("f.txt"), "f").unwrap();
        let out_dir = temp_dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let tree = SourceTree::new(&src).unwrap();
        let name = artifact_file_name(&tree.base_name(), &Local::now(), &CompressionMethod::Zip);
        let out = out_dir.join(&name);

        let created =
            create_artifact(&ArchiveFormat::Zip, &tree, &out, &ProgressBar::hidden()).unwrap();
        assert_eq!(created, out);
        assert!(out.metadata().unwrap().len() > 0);
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_create_artifact_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("taken.zip");
        std::fs::write(&out, "keep me").unwrap();
        let tree = SourceTree::new(temp_dir.path()).unwrap();

        let res = create_artifact(&ArchiveFormat::Zip, &tree, &out, &ProgressBar::hidden());
        assert!(res.is_err());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "keep me");
    }
}
