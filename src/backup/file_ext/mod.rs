/// Extension a backup component contributes to the artifact name, without the leading dot.
pub trait FileExtProvider {
    fn file_ext(&self) -> &'static str;
}

/// Every extension an artifact of this tool can carry, whatever method produced it.
pub static BACKUP_FILE_EXTS: [&str; 4] = ["tar.gz", "tar.bz2", "tar.xz", "zip"];
