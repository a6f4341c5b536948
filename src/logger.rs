/* Copyright © 2024-2025 Adam Train <adam@trainrelay.net>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */
use std::error::Error;
use std::fmt::{self, Write};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{self as format, FormatEvent, FormatFields};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Writes this crate's events to stderr. Records from the `log` macros are
/// bridged in by the subscriber.
pub fn init(verbose: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
	tracing_subscriber::fmt()
		.with_env_filter(filter(verbose))
		.with_writer(std::io::stderr)
		.event_format(PlainFormat)
		.try_init()
}

/// Only this crate's own targets; dependencies stay silent.
fn filter(verbose: bool) -> EnvFilter {
	let level = if verbose { "debug" } else { "info" };
	EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
}

/// Info events are printed as plain text; every other level is labelled.
struct PlainFormat;

impl<S, N> FormatEvent<S, N> for PlainFormat
where
	S: Subscriber + for<'a> LookupSpan<'a>,
	N: for<'a> FormatFields<'a> + 'static,
{
	fn format_event(
		&self,
		_ctx: &FmtContext<'_, S, N>,
		mut writer: format::Writer<'_>,
		event: &Event<'_>,
	) -> fmt::Result {
		let mut message = Message::default();
		event.record(&mut message);
		writeln!(writer, "{}", render(*event.metadata().level(), &message.0))
	}
}

#[derive(Default)]
struct Message(String);

impl Visit for Message {
	fn record_str(&mut self, field: &Field, value: &str) {
		if field.name() == "message" {
			self.0.push_str(value);
		}
	}

	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		if field.name() == "message" {
			let _ = write!(self.0, "{:?}", value);
		}
	}
}

fn label(level: Level) -> &'static str {
	if level == Level::WARN {
		"WARNING"
	} else {
		level.as_str()
	}
}

/// Prefixes each line of a message with the level label, except for info.
fn render(level: Level, message: &str) -> String {
	if level == Level::INFO {
		return message.to_string();
	}
	message
		.split('\n')
		.map(|line| format!("{} {}", label(level), line))
		.collect::<Vec<_>>()
		.join("\n")
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io;
	use std::sync::{Arc, Mutex};

	#[derive(Clone, Default)]
	struct Sink(Arc<Mutex<Vec<u8>>>);

	impl io::Write for Sink {
		fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
			self.0.lock().unwrap().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	fn captured(verbose: bool, emit: impl FnOnce()) -> String {
		let sink = Sink::default();
		let writer = sink.clone();
		let subscriber = tracing_subscriber::fmt()
			.with_env_filter(filter(verbose))
			.with_writer(move || writer.clone())
			.event_format(PlainFormat)
			.finish();
		tracing::subscriber::with_default(subscriber, emit);
		let bytes = sink.0.lock().unwrap().clone();
		String::from_utf8(bytes).unwrap()
	}

	#[test]
	fn test_info_is_bare() {
		assert_eq!(render(Level::INFO, "No results found."), "No results found.");
	}

	#[test]
	fn test_labels() {
		assert_eq!(render(Level::WARN, "Careful."), "WARNING Careful.");
		assert_eq!(render(Level::ERROR, "Broken."), "ERROR Broken.");
		assert_eq!(render(Level::DEBUG, "Detail."), "DEBUG Detail.");
	}

	#[test]
	fn test_every_line_is_labelled() {
		assert_eq!(
			render(Level::ERROR, "first\nsecond"),
			"ERROR first\nERROR second"
		);
	}

	#[test]
	fn test_events_are_written_plainly() {
		let output = captured(false, || {
			tracing::info!("Fetched {} prices.", 3);
			tracing::warn!("Check the dates.");
		});
		assert_eq!(output, "Fetched 3 prices.\nWARNING Check the dates.\n");
	}

	#[test]
	fn test_debug_needs_verbose() {
		let quiet = captured(false, || tracing::debug!("Sending GET"));
		assert_eq!(quiet, "");
		let verbose = captured(true, || tracing::debug!("Sending GET"));
		assert_eq!(verbose, "DEBUG Sending GET\n");
	}

	#[test]
	fn test_only_own_targets_enabled() {
		let output = captured(true, || {
			tracing::warn!(target: "reqwest::connect", "noise");
			tracing::warn!(target: concat!(env!("CARGO_CRATE_NAME"), "::sources::ecb"), "signal");
		});
		assert_eq!(output, "WARNING signal\n");
	}
}
