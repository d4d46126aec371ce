use env_logger::Builder;
use std::io::Write;

/// Initialize logging for a command.
///
/// Level is WARN by default, raised one level per `verbosity` step.
/// Setting the RUST_LOG env variable overrides this.
///
/// Output format can be made systemd-friendly by setting
/// RUST_LOG_FORMAT to SYSTEMD.
pub fn init(verbosity: u8) {
    let mut builder = Builder::new();
    if std::env::var("RUST_LOG_FORMAT").is_ok_and(|f| f == "SYSTEMD") {
        enable_systemd_log_format(&mut builder);
    }
    builder.filter_level(level(verbosity));
    builder.parse_default_env();

    // Tests and embedding programs may have set up logging already.
    builder.try_init().ok();
}

fn level(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Prefix lines with their syslog priority (RFC 5424), which
/// journald understands. Time is left out; journald records it.
fn enable_systemd_log_format(builder: &mut Builder) {
    builder.format(|fmt, record| {
        let priority = match record.level() {
            log::Level::Error => 3,
            log::Level::Warn => 4,
            log::Level::Info => 5,
            log::Level::Debug | log::Level::Trace => 7,
        };

        writeln!(fmt, "<{priority}>{}: {}", record.target(), record.args())
    });
}
