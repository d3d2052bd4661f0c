//! Process-wide log setup.
//!
//! Library code only talks to the `log` facade. The binary calls [`init`]
//! once at startup; every record is written as a single line:
//!
//! ```text
//! <timestamp> - <logger name> - <level> - <message>
//! ```
//!
//! where the logger name is the record target, i.e. the client name.

use std::fmt::Display;
use std::io::{self, Write};

use env_logger::{Builder, Env};
use log::Record;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Installs the stderr logger with the default `info` filter.
///
/// Returns `false` if a logger was already installed, in which case nothing
/// changes.
pub fn init() -> bool {
    init_with_filter(DEFAULT_FILTER)
}

/// Installs the stderr logger, falling back to `filter` when `RUST_LOG` is unset.
pub fn init_with_filter(filter: &str) -> bool {
    Builder::from_env(Env::default().default_filter_or(filter))
        .format(|buf, record| {
            let timestamp = buf.timestamp_millis();
            write_record(buf, timestamp, record)
        })
        .try_init()
        .is_ok()
}

fn write_record(out: &mut impl Write, timestamp: impl Display, record: &Record) -> io::Result<()> {
    writeln!(
        out,
        "{} - {} - {} - {}",
        timestamp,
        record.target(),
        record.level(),
        record.args()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn test_record_format() {
        let mut out = Vec::new();
        write_record(
            &mut out,
            "2026-01-02T03:04:05.678Z",
            &Record::builder()
                .target("coingecko")
                .level(Level::Info)
                .args(format_args!("Requesting {} with params {:?}", "https://x", ["a"]))
                .build(),
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2026-01-02T03:04:05.678Z - coingecko - INFO - Requesting https://x with params [\"a\"]\n"
        );
    }

    #[test]
    fn test_error_level_name() {
        let mut out = Vec::new();
        write_record(
            &mut out,
            0,
            &Record::builder()
                .target("t")
                .level(Level::Error)
                .args(format_args!("boom"))
                .build(),
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 - t - ERROR - boom\n");
    }

    #[test]
    fn test_init_only_once() {
        init();
        assert!(!init());
        assert!(!init_with_filter("debug"));
    }
}
