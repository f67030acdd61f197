use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;
use std::time::Duration;

pub trait TrackerBuilder<T: Tracker<U>, U> {
    fn build(self) -> T;
}

pub trait Tracker<Inc> {
    fn step(&self, step: Inc) -> &Self;
    fn finish(self);
}

const PB_STYLE: &str = "{spinner:.blue} {prefix:>12.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {wide_msg}";

const SPINNER_STYLE: &str = "{spinner:.blue} {msg} {prefix:.dim}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

const TICK_INTERVAL: Duration = Duration::from_millis(100);

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(PB_STYLE)
        .ok()
        .map(|s| s.tick_chars(TICK).progress_chars(PB_CHARS))
});

static SPINNER_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(SPINNER_STYLE)
        .ok()
        .map(|s| s.tick_chars(TICK))
});

pub struct ProgressTracker {
    pb: ProgressBar,
    finish: Option<String>,
}

impl Tracker<u64> for ProgressTracker {
    fn step(&self, len: u64) -> &Self {
        self.pb.inc(len);
        self
    }

    fn finish(self) {
        match self.finish {
            Some(msg) => self.pb.finish_with_message(msg),
            None => self.pb.finish_and_clear(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressTrackerBuilder {
    len: Option<u64>,
    prefix: Option<String>,
    finish: Option<String>,
    hidden: bool,
}

impl ProgressTrackerBuilder {
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn with_finish(mut self, finish: &str) -> Self {
        self.finish = Some(finish.to_string());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

impl TrackerBuilder<ProgressTracker, u64> for ProgressTrackerBuilder {
    fn build(self) -> ProgressTracker {
        let pb = match self.len {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        let pb = match PB_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };
        if self.hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Some(prefix) = self.prefix {
            pb.set_prefix(prefix);
        }
        ProgressTracker {
            pb,
            finish: self.finish,
        }
    }
}

/// Progress reported by an external process: a message plus an optional
/// completion percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub message: String,
    pub percent: Option<f64>,
}

/// Indeterminate spinner that follows a long running subprocess.
pub struct SpinnerTracker {
    pb: ProgressBar,
}

impl SpinnerTracker {
    /// Run `f` with the spinner hidden so log lines do not tear the bar.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.pb.suspend(f)
    }
}

impl Tracker<Status> for SpinnerTracker {
    fn step(&self, status: Status) -> &Self {
        match status.percent {
            Some(percent) => self.pb.set_prefix(format!("{percent:.0}%")),
            None => self.pb.set_prefix(""),
        }
        self.pb.set_message(status.message);
        self
    }

    fn finish(self) {
        self.pb.finish_and_clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpinnerTrackerBuilder {
    message: Option<String>,
    hidden: bool,
}

impl SpinnerTrackerBuilder {
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

impl TrackerBuilder<SpinnerTracker, Status> for SpinnerTrackerBuilder {
    fn build(self) -> SpinnerTracker {
        let pb = if self.hidden {
            ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new_spinner()
        };
        let pb = match SPINNER_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };
        if let Some(message) = self.message {
            pb.set_message(message);
        }
        if !self.hidden {
            pb.enable_steady_tick(TICK_INTERVAL);
        }
        SpinnerTracker { pb }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse() {
        assert!(PB_TEMPLATE.is_some());
        assert!(SPINNER_TEMPLATE.is_some());
    }

    #[test]
    fn test_progress_tracker_counts_bytes() {
        let t = ProgressTrackerBuilder::default()
            .with_len(10)
            .hidden(true)
            .build();
        t.step(4).step(6);
        assert_eq!(t.pb.position(), 10);
        t.finish();
    }

    #[test]
    fn test_spinner_tracks_status() {
        let t = SpinnerTrackerBuilder::default()
            .with_message("Publishing")
            .hidden(true)
            .build();
        assert!(t.pb.is_hidden());
        t.step(Status {
            message: "Uploading".to_string(),
            percent: Some(42.4),
        });
        assert_eq!(t.pb.message(), "Uploading");
        assert_eq!(t.pb.prefix(), "42%");
        t.finish();
    }
}
