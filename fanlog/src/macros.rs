//! `format_args!` front-ends for the formatted entry points
//!
//! ```ignore
//! fanlog::info!(registry, "user {} logged in", user_id)?;
//! ```

#[macro_export]
macro_rules! logf {
    ($registry:expr, $level:expr, $($arg:tt)+) => {
        $registry.logf($level, format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! trace {
    ($registry:expr, $($arg:tt)+) => { $crate::logf!($registry, $crate::Level::Trace, $($arg)+) };
}

#[macro_export]
macro_rules! debug {
    ($registry:expr, $($arg:tt)+) => { $crate::logf!($registry, $crate::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($registry:expr, $($arg:tt)+) => { $crate::logf!($registry, $crate::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! warning {
    ($registry:expr, $($arg:tt)+) => { $crate::logf!($registry, $crate::Level::Warning, $($arg)+) };
}

#[macro_export]
macro_rules! error {
    ($registry:expr, $($arg:tt)+) => { $crate::logf!($registry, $crate::Level::Error, $($arg)+) };
}

#[macro_export]
macro_rules! critical {
    ($registry:expr, $($arg:tt)+) => { $crate::logf!($registry, $crate::Level::Critical, $($arg)+) };
}
