//! Coloured console logging with a UTC wall clock prefix.
//!
//! `warn!` and `error!` go to stderr, everything else to stdout.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    (stdout, $tag:literal, $($arg:tt)*) => {
        println!(concat!($tag, "[{}]\x1b[0m {}"), chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
    (stderr, $tag:literal, $($arg:tt)*) => {
        eprintln!(concat!($tag, "[{}]\x1b[0m {}"), chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__log_line!(stdout, "\x1b[32m[INFO] ", $($arg)*) };
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => { $crate::__log_line!(stdout, "\x1b[33m[LOG]  ", $($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__log_line!(stderr, "\x1b[35m[WARN] ", $($arg)*) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__log_line!(stderr, "\x1b[31m[ERROR]", $($arg)*) };
}

/// High-volume traffic (raw sensor lines, full payloads).
/// Only printed when `LOG_DRONE_EVENTS` is set.
#[macro_export]
macro_rules! event {
    ($($arg:tt)*) => {
        if std::env::var_os("LOG_DRONE_EVENTS").is_some() {
            $crate::__log_line!(stdout, "\x1b[36m[EVENT]", $($arg)*)
        }
    };
}
