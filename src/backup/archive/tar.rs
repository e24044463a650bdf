use crate::backup::archive::source::{SourceEntryKind, SourceTree};
use crate::backup::compress::{CompressorBuilder, CompressorConfig};
use crate::backup::finish::Finish;
use crate::backup::result_error::result::Result;
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufWriter, IntoInnerError, Write};

/// Streams the source tree into a tar container written through `compressor`
///
/// Returns the writer handed in once every layer has been finished.
pub fn write_tar<W: Write>(
    source: &SourceTree,
    writer: W,
    compressor: &CompressorConfig,
    progress: &ProgressBar,
) -> Result<W> {
    let mut builder = compressor
        .build_compressor(BufWriter::new(writer))
        .map(BufWriter::new)
        .map(tar::Builder::new)?;
    builder.follow_symlinks(false);

    let mut entry_count = 0;
    for entry in source.entries() {
        let entry = entry?;
        match entry.kind {
            SourceEntryKind::Dir => builder.append_dir(&entry.dst, &entry.src)?,
            SourceEntryKind::File => {
                let mut header = tar::Header::new_gnu();
                header.set_metadata(&entry.metadata);
                let file = File::open(&entry.src)?;
                builder.append_data(&mut header, &entry.dst, progress.wrap_read(file))?;
            }
            SourceEntryKind::Symlink(target) => {
                let mut header = tar::Header::new_gnu();
                header.set_metadata(&entry.metadata);
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                builder.append_link(&mut header, &entry.dst, &target)?;
            }
        }
        entry_count += 1;
    }
    tracing::info!("Processed {} archive entries", entry_count);

    Ok(builder
        .into_inner()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?
        .finish()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::compress::xz::XzConfig;
    use std::collections::BTreeMap;
    use std::io::Read;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn create_test_files(dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dir.join("subdir"))?;
        std::fs::write(dir.join("a.txt"), "alpha")?;
        std::fs::write(dir.join("subdir/b.txt"), "beta")?;
        Ok(())
    }

    fn read_members<R: Read>(reader: R) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
        let mut archive = tar::Archive::new(reader);
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut e = e.unwrap();
                let path = e.path().unwrap().into_owned();
                if e.header().entry_type().is_dir() {
                    (path, None)
                } else {
                    let mut buf = Vec::new();
                    e.read_to_end(&mut buf).unwrap();
                    (path, Some(buf))
                }
            })
            .collect()
    }

    fn expected_members() -> BTreeMap<PathBuf, Option<Vec<u8>>> {
        BTreeMap::from([
            (PathBuf::from("data"), None),
            (PathBuf::from("data/a.txt"), Some(b"alpha".to_vec())),
            (PathBuf::from("data/subdir"), None),
            (PathBuf::from("data/subdir/b.txt"), Some(b"beta".to_vec())),
        ])
    }

    fn build(config: &CompressorConfig) -> (Vec<u8>, u64) {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("data");
        create_test_files(&src).unwrap();
        let tree = SourceTree::new(&src).unwrap();
        let progress = ProgressBar::hidden();

        let bytes = write_tar(&tree, Vec::new(), config, &progress).unwrap();
        (bytes, progress.position())
    }

    #[test]
    fn test_tar_gz_contains_tree() {
        let (bytes, read) = build(&CompressorConfig::Gzip);
        assert_eq!(read, 9);
        let members = read_members(flate2::read::GzDecoder::new(bytes.as_slice()));
        assert_eq!(members, expected_members());
    }

    #[test]
    fn test_tar_bz2_contains_tree() {
        let (bytes, _) = build(&CompressorConfig::Bzip2);
        let members = read_members(bzip2::read::BzDecoder::new(bytes.as_slice()));
        assert_eq!(members, expected_members());
    }

    #[test]
    fn test_tar_xz_contains_tree() {
        let (bytes, _) = build(&CompressorConfig::Xz(XzConfig::default()));
        let members = read_members(liblzma::read::XzDecoder::new(bytes.as_slice()));
        assert_eq!(members, expected_members());
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("bin");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("run.sh"), "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(src.join("run.sh"), std::fs::Permissions::from_mode(0o750))
            .unwrap();

        let tree = SourceTree::new(&src).unwrap();
        let bytes =
            write_tar(&tree, Vec::new(), &CompressorConfig::Gzip, &ProgressBar::hidden()).unwrap();

        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes.as_slice()));
        let mode = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap())
            .find(|e| e.path().unwrap() == Path::new("bin/run.sh"))
            .map(|e| e.header().mode().unwrap())
            .unwrap();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_stores_symlinks_as_links() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("data");
        create_test_files(&src).unwrap();
        std::os::unix::fs::symlink("gone.txt", src.join("broken")).unwrap();
        std::os::unix::fs::symlink("..", src.join("subdir/up")).unwrap();

        let tree = SourceTree::new(&src).unwrap();
        let bytes =
            write_tar(&tree, Vec::new(), &CompressorConfig::Gzip, &ProgressBar::hidden()).unwrap();

        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes.as_slice()));
        let links: BTreeMap<PathBuf, PathBuf> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| e.header().entry_type().is_symlink())
            .map(|e| {
                (
                    e.path().unwrap().into_owned(),
                    e.link_name().unwrap().unwrap().into_owned(),
                )
            })
            .collect();
        assert_eq!(
            links,
            BTreeMap::from([
                (PathBuf::from("data/broken"), PathBuf::from("gone.txt")),
                (PathBuf::from("data/subdir/up"), PathBuf::from("..")),
            ])
        );
    }
}
