use crate::spider::Progress;
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;

type MessageCallback = Box<dyn Fn() -> String + Send + Sync>;

/// Refresh rate for progress updates (10 Hz).
const REFRESH_INTERVAL_MS: u64 = 100;

const TEMPLATE: &str = "{prefix:>12.bold.cyan} [{spinner}] {msg}";
const TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{spinner}] {msg}";

const SPINNER_WIDTH: usize = 25;
const SPINNER_ARROW: &str = "===>";

struct DelayedProgressState {
    visible_after: Instant,
    visible: AtomicBool,
    phase_start_time: Mutex<Instant>,
}

impl Debug for DelayedProgressState {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DelayedProgressState")
            .field("visible_after", &self.visible_after)
            .field("visible", &self.visible)
            .field("phase_start_time", &"<Instant>")
            .finish()
    }
}

/// A spinner on stderr that stays hidden until the crawl has run for a while.
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    state: Arc<DelayedProgressState>,
    message_callback: Arc<Mutex<MessageCallback>>,
    refresh_task: Arc<JoinHandle<()>>,
    use_colors: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter.
    ///
    /// The spinner only becomes visible if the crawl continues beyond `delay`.
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::hidden();

        let state = Arc::new(DelayedProgressState {
            visible_after: Instant::now() + delay,
            visible: AtomicBool::new(false),
            phase_start_time: Mutex::new(Instant::now()),
        });

        let message_callback = Arc::new(Mutex::new(Box::new(String::new) as MessageCallback));

        Self {
            refresh_task: Arc::new(tokio::spawn(refresh_task(
                bar.clone(),
                Arc::clone(&state),
                Arc::clone(&message_callback),
            ))),
            bar,
            state,
            message_callback,
            use_colors,
        }
    }
}

impl Progress for ProgressReporter {
    fn set_phase(&self, phase: &str) {
        self.bar.set_prefix(phase.to_string());
        *self.state.phase_start_time.lock().expect("lock poisoned") = Instant::now();
    }

    fn set_indeterminate(&self, callback: Box<dyn Fn() -> String + Send + Sync + 'static>) {
        *self.message_callback.lock().expect("lock poisoned") = callback;
        *self.state.phase_start_time.lock().expect("lock poisoned") = Instant::now();
        self.bar.enable_steady_tick(Duration::from_millis(REFRESH_INTERVAL_MS));

        let frames = spinner_frames();
        let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
        let template = if self.use_colors { TEMPLATE } else { TEMPLATE_NO_COLOR };
        self.bar.set_style(
            ProgressStyle::default_spinner()
                .template(template)
                .expect("could not create progress bar style")
                .tick_strings(&frames),
        );
    }

    fn done(&self) {
        self.refresh_task.abort();
        if self.state.visible.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("state", &self.state)
            .field("message_callback", &"<callback>")
            .field("refresh_task", &"<task>")
            .field("use_colors", &self.use_colors)
            .finish()
    }
}

/// An arrow sweeping right then back left, each frame padded to the spinner width.
///
/// The last frame is the one indicatif shows once the spinner finishes.
fn spinner_frames() -> Vec<String> {
    let travel = SPINNER_WIDTH - SPINNER_ARROW.len();
    let back_arrow: String = SPINNER_ARROW.chars().rev().map(|c| if c == '>' { '<' } else { c }).collect();

    let mut frames: Vec<String> = (0..=travel).map(|offset| format!("{:offset$}{SPINNER_ARROW}", "")).collect();
    frames.extend((0..=travel).rev().map(|offset| format!("{:offset$}{back_arrow}", "")));
    for frame in &mut frames {
        *frame = format!("{frame:<SPINNER_WIDTH$}");
    }

    frames.push(" ".repeat(SPINNER_WIDTH));
    frames
}

/// Background refresh task that periodically updates the spinner message.
async fn refresh_task(bar: ProgressBar, state: Arc<DelayedProgressState>, callback: Arc<Mutex<MessageCallback>>) {
    let mut interval = tokio::time::interval(Duration::from_millis(REFRESH_INTERVAL_MS));
    #[expect(clippy::infinite_loop, reason = "task runs until aborted")]
    loop {
        let _ = interval.tick().await;

        if !state.visible.load(Ordering::Relaxed) && Instant::now() >= state.visible_after {
            state.visible.store(true, Ordering::Relaxed);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }

        if state.visible.load(Ordering::Relaxed) {
            let message = {
                let callback_guard = callback.lock().expect("lock poisoned");
                callback_guard()
            };

            let elapsed_secs = state.phase_start_time.lock().expect("lock poisoned").elapsed().as_secs();
            bar.set_message(format!("{elapsed_secs}s: {message}"));
        }
    }
}
