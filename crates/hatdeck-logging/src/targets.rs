//! Tracing targets that get their own log file in addition to the component log.

/// Child process launches, exits, timeouts.
pub const T_PROC: &str = "hatdeck::proc";
/// Raw touch/button traffic. Noisy at debug level.
pub const T_INPUT: &str = "hatdeck::input";
