use indicatif::{ProgressBar, ProgressStyle};
use nu_ansi_term::{Color, Style};
use pagelens::Severity;
use std::fmt::Display;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Theme {
    Auto,
    Light,
    Dark,
    Plain,
}

/// What a piece of output is, so the palette can pick its style.
#[derive(Clone, Copy, Debug)]
enum Role {
    Heading,
    Key,
    Value,
    Marker,
    Info,
    Good,
    Warning,
    Bad,
}

impl From<Severity> for Role {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Good => Role::Good,
            Severity::Warning => Role::Warning,
            Severity::Bad => Role::Bad,
        }
    }
}

impl Role {
    fn icon(self) -> &'static str {
        match self {
            Role::Heading => "▸",
            Role::Marker => "•",
            Role::Info => "ℹ",
            Role::Good => "✔",
            Role::Warning => "⚠",
            Role::Bad => "✖",
            Role::Key | Role::Value => "",
        }
    }
}

#[derive(Clone, Copy)]
struct Palette {
    styles: [Style; 8],
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        let styles = match theme {
            Theme::Plain => [Style::new(); 8],
            Theme::Light => [
                Color::Blue.bold(),
                Color::Black.bold(),
                Color::Black.normal(),
                Color::Blue.normal(),
                Color::Purple.normal(),
                Color::Green.bold(),
                Color::Yellow.bold(),
                Color::Red.bold(),
            ],
            Theme::Dark | Theme::Auto => [
                Color::Purple.bold(),
                Color::LightBlue.bold(),
                Color::White.normal(),
                Color::LightBlue.normal(),
                Color::LightCyan.normal(),
                Color::LightGreen.bold(),
                Color::Yellow.bold(),
                Color::LightRed.bold(),
            ],
        };
        Self { styles }
    }

    fn paint(&self, role: Role, text: impl Display) -> String {
        self.styles[role as usize].paint(text.to_string()).to_string()
    }
}

/// Terminal renderer for the text output format.
///
/// In quiet mode icons, colours and spinners are dropped so the output can
/// be piped into other tools.
pub struct Ui {
    palette: Palette,
    quiet: bool,
}

impl Ui {
    pub fn new(theme: Theme, quiet: bool) -> Self {
        let colour = theme != Theme::Plain && !quiet && std::io::stdout().is_terminal();

        #[cfg(windows)]
        if colour {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        let palette = Palette::for_theme(if colour { theme } else { Theme::Plain });
        Self { palette, quiet }
    }

    pub fn spacer(&self) {
        if !self.quiet {
            println!();
        }
    }

    /// Prints aligned `key: value` rows under a heading.
    pub fn section<'a, I, V>(&self, title: &str, rows: I)
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Display,
    {
        let rows: Vec<(&str, String)> = rows
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        if rows.is_empty() {
            return;
        }
        self.heading(title);
        let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in rows {
            println!(
                "  {} {}",
                self.palette.paint(Role::Key, format_args!("{key:>width$}:")),
                self.palette.paint(Role::Value, value)
            );
        }
    }

    pub fn list<I>(&self, title: &str, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_none() {
            return;
        }
        self.heading(title);
        let marker = if self.quiet {
            "-".to_string()
        } else {
            self.palette.paint(Role::Marker, Role::Marker.icon())
        };
        for entry in entries {
            println!("  {marker} {entry}");
        }
    }

    /// Prints a recommendation line coloured by its severity.
    pub fn verdict(&self, severity: Severity, label: &str, advice: &str) {
        let role = Role::from(severity);
        if self.quiet {
            println!("{label}: {advice}");
        } else {
            println!(
                "{} {} {advice}",
                self.palette.paint(role, role.icon()),
                self.palette.paint(role, label)
            );
        }
    }

    /// Prints one horizontal bar per row, scaled to the largest count.
    pub fn bars<'a, I>(&self, title: &str, rows: I)
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let rows: Vec<(&str, u64)> = rows.into_iter().collect();
        if rows.is_empty() {
            return;
        }
        self.heading(title);
        let peak = rows.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        for (label, count) in rows {
            let bar = BAR_CHAR.repeat((count * BAR_WIDTH).div_ceil(peak) as usize);
            println!(
                "  {} {} {count}",
                self.palette.paint(Role::Key, format_args!("{label:>width$}")),
                self.palette.paint(Role::Marker, bar)
            );
        }
    }

    pub fn info(&self, message: &str) {
        println!("{}", self.notice(Role::Info, message));
    }

    pub fn success(&self, message: &str) {
        println!("{}", self.notice(Role::Good, message));
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{}", self.notice(Role::Warning, message));
    }

    /// Starts a spinner that is cleared on [`Task::finish`] and reported as
    /// failed if dropped unfinished.
    pub fn task(&self, label: impl Into<String>) -> Task<'_> {
        let label = label.into();
        let spinner = (!self.quiet).then(|| {
            let style = ProgressStyle::with_template("{prefix} {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
            let bar = ProgressBar::new_spinner().with_style(style);
            bar.set_prefix(self.palette.paint(Role::Info, "▶"));
            bar.set_message(label.clone());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Task {
            ui: self,
            label,
            started: Instant::now(),
            spinner,
            done: false,
        }
    }

    fn notice(&self, role: Role, message: &str) -> String {
        if self.quiet {
            message.to_string()
        } else {
            format!("{} {message}", self.palette.paint(role, role.icon()))
        }
    }

    fn heading(&self, title: &str) {
        if self.quiet {
            println!("{title}");
        } else {
            let icon = Role::Heading.icon();
            println!("{}", self.palette.paint(Role::Heading, format_args!("{icon} {title}")));
        }
    }
}

pub struct Task<'a> {
    ui: &'a Ui,
    label: String,
    started: Instant,
    spinner: Option<ProgressBar>,
    done: bool,
}

impl Task<'_> {
    pub fn finish(mut self) -> Duration {
        self.done = true;
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.started.elapsed()
    }
}

impl Drop for Task<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let message = format!("{} failed after {}", self.label, elapsed(self.started));
        match self.spinner.take() {
            Some(spinner) => spinner.abandon_with_message(message),
            None => self.ui.warn(&message),
        }
    }
}

fn elapsed(started: Instant) -> String {
    let secs = started.elapsed().as_secs_f64();
    if secs >= 1.0 {
        format!("{secs:.2}s")
    } else {
        format!("{:.0}ms", secs * 1_000.0)
    }
}

const BAR_CHAR: &str = "█";
const BAR_WIDTH: u64 = 30;
