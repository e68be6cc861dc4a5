use std::future::Future;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

const MIN_SPINNER_DURATION: Duration = Duration::from_millis(400);
const TICK: Duration = Duration::from_millis(80);

/// Show a spinner on stderr while `fut` runs. Plain await when stderr is not a TTY.
pub async fn with_spinner<T, F: Future<Output = T>>(message: &str, fut: F) -> T {
    if !std::io::stderr().is_terminal() {
        return fut.await;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "])
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(TICK);

    let start = Instant::now();
    let result = fut.await;

    // avoid a one-frame flash
    let elapsed = start.elapsed();
    if elapsed < MIN_SPINNER_DURATION {
        tokio::time::sleep(MIN_SPINNER_DURATION - elapsed).await;
    }

    spinner.finish_and_clear();
    result
}
