use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

static BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";

/// Byte progress bar for the archive step, drawn on stderr
///
/// Hidden when `visible` is false. indicatif already skips drawing when stderr
/// is not a terminal, so redirected runs stay clean either way.
pub fn progress_bar(total_bytes: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::with_draw_target(Some(total_bytes), ProgressDrawTarget::hidden());
    }

    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(total_bytes).with_style(style)
}
