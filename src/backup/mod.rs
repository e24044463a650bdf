pub mod archive;
pub mod backup_config;
pub mod compress;
pub mod file_ext;
pub mod finish;
pub mod notifications;
pub mod pipeline;
pub mod progress;
pub mod redacted;
pub mod remote;
pub mod result_error;
pub mod retention;
pub mod status_log;
pub mod validate;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
