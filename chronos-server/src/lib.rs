//! chronos-server: the Chronos orchestration backend.
//!
//! Three model/calendar-backed operations (parse, optimize, schedule) exposed
//! over HTTP; all substantive scheduling decisions are delegated to the model.

pub mod audit;
pub mod config;
pub mod gemini;
pub mod google_calendar;
pub mod pipeline;
pub mod server;
pub mod state;
