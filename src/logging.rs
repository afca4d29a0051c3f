use std::any::Any;
use std::path::Path;

pub const LOG_FILE_BASENAME: &str = "dayboard";
pub const LOG_FILE_SUFFIX: &str = "log";
/// A day's log is cut early once it grows past this.
pub const LOG_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;
/// Rotated files kept on disk; matches the default backup retention.
pub const LOG_KEEP_FILES: usize = crate::backup::DEFAULT_RETENTION;
pub const LOG_ENV_VAR: &str = "DAYBOARD_LOG";

/// Logger spec: `DAYBOARD_LOG`, then `RUST_LOG`, then the build default.
pub fn log_spec(own: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,dayboard_lib=debug,dayboard=debug"
    } else {
        "warn,dayboard_lib=info,dayboard=info"
    };
    own.filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

/// Daily files under `log_dir`, with info and above mirrored to stderr for
/// whatever supervises the process.
pub fn init_logging(
    log_dir: &Path,
) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        default_format, detailed_format, Age, Cleanup, Criterion, Duplicate, FileSpec, Logger,
        Naming, WriteMode,
    };

    std::fs::create_dir_all(log_dir)?;

    let spec = log_spec(
        std::env::var(LOG_ENV_VAR).ok(),
        std::env::var("RUST_LOG").ok(),
    );

    let handle = Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .append()
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .format_for_stderr(default_format)
        .rotate(
            Criterion::AgeOrSize(Age::Day, LOG_MAX_FILE_BYTES),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(LOG_KEEP_FILES),
        )
        .duplicate_to_stderr(Duplicate::Info)
        .start()?;

    install_panic_hook();

    log::info!(
        "logging to {} (daily, keep {LOG_KEEP_FILES})",
        log_dir.display()
    );
    Ok(handle)
}

/// Text of a panic payload, when it carries any.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "Box<dyn Any>"
    }
}

// Panics in handlers or the backup job land in the log file too.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let thread = std::thread::current();
        let thread = thread.name().unwrap_or("unnamed");
        let location = info
            .location()
            .map(ToString::to_string)
            .unwrap_or_default();
        log::error!(
            "thread '{thread}' panicked at {location}: {}",
            panic_message(info.payload())
        );
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_variable_wins_over_rust_log() {
        let spec = log_spec(Some("trace".to_string()), Some("error".to_string()));
        assert_eq!(spec, "trace");
    }

    #[test]
    fn blank_values_fall_through() {
        let spec = log_spec(Some("  ".to_string()), Some("error".to_string()));
        assert_eq!(spec, "error");

        let spec = log_spec(None, Some(String::new()));
        assert!(spec.starts_with("warn,dayboard_lib="));
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let quiet = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        let literal = std::panic::catch_unwind(|| panic!("static text")).unwrap_err();
        let formatted = std::panic::catch_unwind(|| panic!("snapshot {} failed", 3)).unwrap_err();
        let other = std::panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
        std::panic::set_hook(quiet);

        assert_eq!(panic_message(&*literal), "static text");
        assert_eq!(panic_message(&*formatted), "snapshot 3 failed");
        assert_eq!(panic_message(&*other), "Box<dyn Any>");
    }
}
