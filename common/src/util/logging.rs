use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{info, warn, LevelFilter};
use std::future::Future;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static MULTI: OnceLock<MultiProgress> = OnceLock::new();

pub fn initialize_logging(log_level: LevelFilter) {
    let logger = env_logger::builder()
        .filter_level(log_level)
        .parse_default_env() // Allow overriding log level through RUST_LOG env var
        .build();
    let max_level = logger.filter();

    let multi = MultiProgress::new();

    let wrapper = LogWrapper::new(multi.clone(), logger);
    if let Err(e) = wrapper.try_init() {
        eprintln!("Logging was already initialized: {e}");
        return;
    }
    log::set_max_level(max_level);

    let _ = MULTI.set(multi);
}

fn spinner(task_desc: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner:.white} [{elapsed:.green}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = ProgressBar::new_spinner()
        .with_message(format!("{}...", task_desc))
        .with_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    attach(pb)
}

fn bar(task_desc: &str, total: Option<u64>) -> ProgressBar {
    let Some(total) = total else {
        // Without a known length a spinner is all we can show
        return spinner(task_desc);
    };

    let style = ProgressStyle::with_template(
        "[{elapsed:.green}] {msg} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} [{eta}]",
    )
    .map(|style| style.progress_chars("=> "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    let pb = ProgressBar::new(total)
        .with_message(format!("{}...", task_desc))
        .with_style(style);
    pb.enable_steady_tick(Duration::from_secs(1));
    attach(pb)
}

/// Registers the bar with the log bridge so that log lines don't tear through it. Without
/// initialized logging (e.g. in tests) bars stay hidden.
fn attach(pb: ProgressBar) -> ProgressBar {
    match MULTI.get() {
        Some(multi) => multi.add(pb),
        None => {
            pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
            pb
        }
    }
}

fn finish(pb: ProgressBar, target: &str, task_desc: &str, start_time: Instant, failed: bool) {
    pb.finish_and_clear();
    if let Some(multi) = MULTI.get() {
        multi.remove(&pb);
    }

    let elapsed = HumanDuration(start_time.elapsed());
    if failed {
        warn!(target: target, "{} failed (after {})", task_desc, elapsed);
    } else {
        info!(target: target, "{} finished (took {})", task_desc, elapsed);
    }
}

pub fn run_with_spinner<'a, F, T, E>(
    target: &'a str,
    task_desc: &'a str,
    function: F,
) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let start_time = Instant::now();
    let pb = spinner(task_desc);

    let out = function();

    finish(pb, target, task_desc, start_time, out.is_err());
    out
}

pub async fn run_with_spinner_async<'a, F, Fut, T, E>(
    target: &'a str,
    task_desc: &'a str,
    function: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start_time = Instant::now();
    let pb = spinner(task_desc);

    let out = function().await;

    finish(pb, target, task_desc, start_time, out.is_err());
    out
}

/// Runs `function` with a byte progress bar. `total` is unknown for responses without a
/// content length, in which case a spinner is shown instead.
pub async fn run_with_pb_async<'a, F, Fut, T, E>(
    target: &'a str,
    task_desc: &'a str,
    total: Option<u64>,
    function: F,
) -> Result<T, E>
where
    F: FnOnce(ProgressBar) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start_time = Instant::now();
    let pb = bar(task_desc, total);

    let out = function(pb.clone()).await;

    finish(pb, target, task_desc, start_time, out.is_err());
    out
}
