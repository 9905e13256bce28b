/// In-memory text accumulator for a single message.
pub mod buffer;
/// Destinations and the per-call `LogMessage` guard.
pub mod destination;
/// `log_at!`, `ods_log!` and `ods_lognlf!`.
pub mod macros;
/// Destination bindings and the process-wide router.
pub mod router;
/// Console, leveled, diagnostic and in-memory sinks.
pub mod sinks;
/// Timestamp sources and the message prefix.
pub mod timestamp;
/// Tracker transports.
pub mod tracker;
