use crate::backup::archive::source::{SourceEntry, SourceEntryKind, SourceTree};
use crate::backup::result_error::result::Result;
use indicatif::ProgressBar;
use itertools::Itertools;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Recurses the source tree straight into a deflated zip container
pub fn write_zip<W: Write + Seek>(
    source: &SourceTree,
    writer: W,
    progress: &ProgressBar,
) -> Result<W> {
    let mut zip = ZipWriter::new(writer);

    let mut entry_count = 0;
    for entry in source.entries() {
        let entry = entry?;
        let name = member_name(&entry.dst);
        let options = file_options(&entry);
        match entry.kind {
            SourceEntryKind::Dir => zip.add_directory(name, options)?,
            SourceEntryKind::File => {
                zip.start_file(name, options)?;
                let mut reader = progress.wrap_read(File::open(&entry.src)?);
                std::io::copy(&mut reader, &mut zip)?;
            }
            SourceEntryKind::Symlink(target) => {
                zip.add_symlink(name, target.to_string_lossy(), options)?
            }
        }
        entry_count += 1;
    }
    tracing::info!("Processed {} archive entries", entry_count);

    Ok(zip.finish()?)
}

/// Zip members always use `/`, whatever the host separator is.
fn member_name(dst: &Path) -> String {
    dst.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .join("/")
}

fn file_options(entry: &SourceEntry) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(entry.metadata.len() >= u64::from(u32::MAX));

    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(entry.metadata.permissions().mode())
    };

    options
}
