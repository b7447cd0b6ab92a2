//! Stage progress on stderr for the command-line tools.
//!
//! stdout carries the JSON verdict only; everything here goes to stderr.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

/// Value of the `--ui` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    /// Unknown values fall back to `Auto`.
    pub fn parse(flag: &str) -> Self {
        match flag.trim().to_ascii_lowercase().as_str() {
            "plain" => Self::Plain,
            "pretty" => Self::Pretty,
            _ => Self::Auto,
        }
    }

    /// Animated spinners need a terminal on stderr. In auto mode they are also
    /// skipped when stdout is piped into another program.
    fn spinners(self, stderr_tty: bool, stdout_piped: bool) -> bool {
        match self {
            Self::Plain => false,
            Self::Pretty => stderr_tty,
            Self::Auto => stderr_tty && !stdout_piped,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Ui {
    spinners: bool,
}

impl Ui {
    pub fn from_args(ui_flag: &str, stderr_tty: bool, stdout_piped: bool) -> Self {
        Self {
            spinners: UiMode::parse(ui_flag).spinners(stderr_tty, stdout_piped),
        }
    }

    /// Start a named stage. It is reported as failed unless `done` is called.
    pub fn stage(&self, name: &str) -> Stage {
        let bar = self.spinners.then(|| spinner(name));
        if bar.is_none() {
            eprintln!("==> {name}");
        }
        Stage {
            name: name.to_string(),
            started: Instant::now(),
            bar,
            finished: false,
        }
    }
}

fn spinner(name: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr())
        .with_style(style)
        .with_message(format!("{name}…"));
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub struct Stage {
    name: String,
    started: Instant,
    bar: Option<ProgressBar>,
    finished: bool,
}

impl Stage {
    pub fn done(mut self) {
        self.finished = true;
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        let line = stage_line(&self.name, self.finished, self.started.elapsed());
        match (&self.bar, self.finished) {
            (Some(bar), true) => bar.finish_with_message(line),
            (Some(bar), false) => bar.abandon_with_message(line),
            (None, _) => eprintln!("{line}"),
        }
    }
}

fn stage_line(name: &str, finished: bool, elapsed: Duration) -> String {
    let mark = if finished { "✔" } else { "✘" };
    let took = if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    };
    format!("{mark} {name} ({took})")
}
