use core::fmt::Display;
use std::io::{self, StderrLock, Write};

use log::{Level, LevelFilter, Log};
use owo_colors::OwoColorize;

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

fn write_with_color(out: &mut StderrLock<'_>, color: Color, string: impl Display) {
    let string: &dyn Display = match color {
        Color::Default => &string,
        Color::Gray => &string.dimmed(),
        Color::BrightRed => &string.bright_red(),
        Color::BrightYellow => &string.bright_yellow(),
        Color::BrightBlue => &string.bright_blue(),
        Color::BrightCyan => &string.bright_cyan(),
        Color::BrightMagenta => &string.bright_magenta(),
    };
    // Nowhere left to report a failed stderr write.
    let _ = write!(out, "{string}");
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut out = io::stderr().lock();
        let level = record.level();
        write_with_color(
            &mut out,
            match level {
                Level::Error => Color::BrightRed,
                Level::Warn => Color::BrightYellow,
                Level::Info => Color::BrightBlue,
                Level::Debug => Color::BrightCyan,
                Level::Trace => Color::BrightMagenta,
            },
            format_args!("{level:5} "),
        );
        write_with_color(&mut out, Color::Gray, format_args!("[{}] ", record.target()));
        write_with_color(&mut out, Color::Default, record.args());
        write_with_color(&mut out, Color::Default, "\n");
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_max_level(level);
    log::set_logger(&LOGGER)
}

enum Color {
    Default,
    Gray,
    BrightRed,
    BrightYellow,
    BrightBlue,
    BrightCyan,
    BrightMagenta,
}
