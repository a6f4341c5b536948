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
use crate::prices::series::Series;
use crate::util::date::Date;
use log::Level;

/// A message about how well fetched data covers the requested interval,
/// and how loudly to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	pub level: Level,
	pub message: String,
}

/// Compares the dates actually returned against the request.
///
/// Providers commonly haven't published today's price yet, so a result
/// that is only missing today is reported quietly.
pub fn diagnose(requested: &Series, fetched: &Series, today: Date) -> Diagnostic {
	let (start, end) = (requested.start, requested.end);

	let (first, last) = match (fetched.first_date(), fetched.last_date()) {
		(Some(first), Some(last)) => (first, last),
		_ => {
			return Diagnostic {
				level: Level::Warn,
				message: format!("No data found for the interval [{}--{}].", start, end),
			}
		},
	};

	let message = format!(
		"Available data covers the interval [{}--{}], {}.",
		first,
		last,
		describe(start, end, first, last)
	);

	let gap = first > start || last < end;
	let only_today_missing = first == start && end == today && last.days_until(&end) == 1;
	let level = if gap && !only_today_missing {
		Level::Warn
	} else {
		Level::Debug
	};

	Diagnostic { level, message }
}

fn describe(start: Date, end: Date, first: Date, last: Date) -> String {
	let late = start.days_until(&first);
	let early = last.days_until(&end);

	match (late, early) {
		(0, 0) => "as requested".to_string(),
		(0, e) if e > 0 => format!("which ends {} earlier than requested", days(e)),
		(l, 0) if l > 0 => format!("which starts {} later than requested", days(l)),
		(l, e) if l > 0 && e > 0 => format!(
			"which starts {} later and ends {} earlier than requested",
			days(l),
			days(e)
		),
		_ => "which doesn't match the request".to_string(),
	}
}

fn days(n: i64) -> String {
	if n == 1 {
		"1 day".to_string()
	} else {
		format!("{} days", n)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::prices::price::Price;
	use rust_decimal_macros::dec;

	fn requested(start: Date, end: Date) -> Series {
		Series::new("BTC", "EUR", "close", start, end)
	}

	fn fetched(request: &Series, dates: &[Date]) -> Series {
		request.with_prices(dates.iter().map(|d| Price::new(*d, dec!(1))).collect())
	}

	fn d(day: u32) -> Date {
		Date::ymd(2021, 1, day)
	}

	#[test]
	fn test_empty() {
		let request = requested(d(1), d(3));
		let result = diagnose(&request, &fetched(&request, &[]), d(20));
		assert_eq!(result.level, Level::Warn);
		assert_eq!(
			result.message,
			"No data found for the interval [2021-01-01--2021-01-03]."
		);
	}

	#[test]
	fn test_as_requested() {
		let request = requested(d(1), d(3));
		let result = diagnose(&request, &fetched(&request, &[d(1), d(2), d(3)]), d(20));
		assert_eq!(result.level, Level::Debug);
		assert_eq!(
			result.message,
			"Available data covers the interval [2021-01-01--2021-01-03], as requested."
		);
	}

	#[test]
	fn test_starts_one_day_later() {
		let request = requested(d(1), d(3));
		let result = diagnose(&request, &fetched(&request, &[d(2), d(3)]), d(20));
		assert_eq!(result.level, Level::Warn);
		assert_eq!(
			result.message,
			"Available data covers the interval [2021-01-02--2021-01-03], \
			 which starts 1 day later than requested."
		);
	}

	#[test]
	fn test_ends_earlier() {
		let request = requested(d(1), d(5));
		let result = diagnose(&request, &fetched(&request, &[d(1), d(2), d(3)]), d(20));
		assert_eq!(result.level, Level::Warn);
		assert!(result.message.ends_with("which ends 2 days earlier than requested."));
	}

	#[test]
	fn test_both_ends() {
		let request = requested(d(1), d(10));
		let result = diagnose(&request, &fetched(&request, &[d(3), d(9)]), d(20));
		assert!(result
			.message
			.ends_with("which starts 2 days later and ends 1 day earlier than requested."));
	}

	#[test]
	fn test_only_today_missing_is_quiet() {
		let request = requested(d(1), d(5));
		let result = diagnose(&request, &fetched(&request, &[d(1), d(4)]), d(5));
		assert_eq!(result.level, Level::Debug);
		assert!(result.message.ends_with("which ends 1 day earlier than requested."));
	}

	#[test]
	fn test_missing_today_and_start_is_loud() {
		let request = requested(d(1), d(5));
		let result = diagnose(&request, &fetched(&request, &[d(2), d(4)]), d(5));
		assert_eq!(result.level, Level::Warn);
	}

	#[test]
	fn test_missing_two_days_before_today_is_loud() {
		let request = requested(d(1), d(5));
		let result = diagnose(&request, &fetched(&request, &[d(1), d(3)]), d(5));
		assert_eq!(result.level, Level::Warn);
	}

	#[test]
	fn test_outside_request() {
		let request = requested(d(5), d(6));
		let result = diagnose(&request, &fetched(&request, &[d(1), d(9)]), d(20));
		assert!(result.message.ends_with("which doesn't match the request."));
	}
}
