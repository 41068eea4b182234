use indicatif::{ProgressBar, ProgressStyle};

use crate::model::structures::{performance::SESSION_TOKEN_FORMAT, recalc_state::ProgressUpdate};

pub fn progress_bar(len: u64, msg: String) -> Option<ProgressBar> {
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise} / {eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .ok()?
        .progress_chars("##-");

    let bar = ProgressBar::new(len);
    bar.set_style(style);
    bar.set_message(msg);

    Some(bar)
}

/// Adapts a bar to the recalculation progress callback. The bar finishes
/// once the last session has been reported.
pub fn replay_progress(bar: ProgressBar) -> impl Fn(ProgressUpdate) + Send + Sync + 'static {
    move |update: ProgressUpdate| {
        bar.set_length(update.sessions_total as u64);
        bar.set_position(update.sessions_processed as u64);
        bar.set_message(update.timestamp.format(SESSION_TOKEN_FORMAT).to_string());

        if update.sessions_processed == update.sessions_total {
            bar.finish();
        }
    }
}
