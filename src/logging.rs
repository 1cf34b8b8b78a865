use log::{error, info, warn};
use std::fs;
use std::path::Path;

/// Lines kept in the log file after trimming.
pub const LOG_MAX_LINES: usize = 10_000;

/// Logs to stdout and to `log_file`, appending.
pub fn init(log_file: &Path) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .level_for("naga", log::LevelFilter::Warn)
        .level_for("wgpu_core", log::LevelFilter::Warn)
        .level_for("eframe", log::LevelFilter::Info)
        .chain(std::io::stdout())
        .chain(fern::log_file(log_file)?)
        .apply()?;
    Ok(())
}

/// Keeps only the last `max_lines` lines of the log. Returns whether anything was cut.
pub fn trim_log(log_file: &Path, max_lines: usize) -> bool {
    let Ok(content) = fs::read_to_string(log_file) else {
        warn!("Log file {} not found for trimming", log_file.display());
        return false;
    };

    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= max_lines {
        return false;
    }

    let start = lines.len() - max_lines;
    let trimmed = lines[start..].join("\n");
    match fs::write(log_file, trimmed + "\n") {
        Ok(()) => {
            info!("Trimmed log file to {} lines", max_lines);
            true
        }
        Err(e) => {
            error!("Failed to trim log file {}: {}", log_file.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_trim_keeps_tail() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("catplayer.log");
        let content: String = (0..25).map(|i| format!("line {}\n", i)).collect();
        fs::write(&log, content).unwrap();

        assert!(trim_log(&log, 10));
        let kept = fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = kept.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "line 15");
        assert_eq!(lines[9], "line 24");
    }

    #[test]
    fn test_short_log_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("catplayer.log");
        fs::write(&log, "one\ntwo\n").unwrap();

        assert!(!trim_log(&log, 10));
        assert_eq!(fs::read_to_string(&log).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_missing_log() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!trim_log(&temp_dir.path().join("absent.log"), 10));
    }
}
