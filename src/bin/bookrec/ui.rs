//! Text-mode output for the `bookrec` binary.

use std::fmt::Display;
use std::path::Path;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use nu_ansi_term::{Color, Style};

const MARKER: &str = "▸";

/// Styled stdout writer. With colour off every style renders as plain text.
pub struct Ui {
    styles: Styles,
    quiet: bool,
}

#[derive(Clone, Copy, Debug)]
struct Styles {
    heading: Style,
    label: Style,
    rank: Style,
    detail: Style,
    notice: Style,
}

impl Styles {
    fn new(color: bool) -> Self {
        if !color {
            let plain = Style::new();
            return Self {
                heading: plain,
                label: plain,
                rank: plain,
                detail: plain,
                notice: plain,
            };
        }
        Self {
            heading: Style::new().fg(Color::Green).bold(),
            label: Style::new().fg(Color::LightBlue),
            rank: Style::new().fg(Color::LightGreen),
            detail: Style::new().fg(Color::DarkGray),
            notice: Style::new().fg(Color::LightCyan),
        }
    }
}

impl Ui {
    pub fn new(color: bool, quiet: bool) -> Self {
        Self {
            styles: Styles::new(color && !quiet),
            quiet,
        }
    }

    /// Heading followed by aligned `label: value` rows.
    pub fn fields<V: Display>(&self, title: &str, rows: &[(&str, V)]) {
        self.heading(title);
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        for (label, value) in rows {
            let label = format!("{label:>width$}:");
            println!("  {} {value}", self.styles.label.paint(label));
        }
    }

    /// Heading followed by a numbered list; `detail` trails each entry.
    pub fn ranked<I>(&self, title: &str, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries: Vec<(String, String)> = entries.into_iter().collect();
        self.heading(title);
        let width = entries.len().to_string().len();
        for (idx, (entry, detail)) in entries.into_iter().enumerate() {
            println!(
                "  {} {entry} {}",
                self.styles.rank.paint(rank_label(idx, width)),
                self.styles.detail.paint(detail)
            );
        }
    }

    pub fn notice(&self, message: &str) {
        println!("{}", self.styles.notice.paint(message));
    }

    /// Step counter shown on stderr while the artifacts load.
    pub fn progress(&self, steps: u64) -> Progress {
        let bar = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(steps)
        };
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        Progress {
            bar,
            started: Instant::now(),
        }
    }

    fn heading(&self, title: &str) {
        if self.quiet {
            println!("{title}");
        } else {
            println!("{}", self.styles.heading.paint(format!("{MARKER} {title}")));
        }
    }
}

fn rank_label(idx: usize, width: usize) -> String {
    format!("{:>width$}.", idx + 1)
}

/// Progress over a fixed number of loading steps.
pub struct Progress {
    bar: ProgressBar,
    started: Instant,
}

impl Progress {
    /// Runs one step labelled with the file it reads.
    pub fn step<T, E>(&self, path: &Path, load: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        self.bar.set_message(format!("reading {}", path.display()));
        let loaded = load()?;
        self.bar.inc(1);
        Ok(loaded)
    }

    /// Clears the bar and returns the time since it was created.
    pub fn finish(self) -> Duration {
        self.bar.finish_and_clear();
        self.started.elapsed()
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon_with_message("loading failed");
        }
    }
}
