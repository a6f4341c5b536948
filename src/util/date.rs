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

use anyhow::{bail, Error};
use chrono::{DateTime, Days, Local, NaiveDate};
use std::fmt;

/// A calendar date. Always renders as YYYY-MM-DD, which is also the only
/// format it accepts, so the string form sorts the same way the value does.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date(NaiveDate);

impl Date {
	/// Constructor to parse a string in the "YYYY-mm-dd" format
	pub fn from_str(date_str: &str) -> Result<Date, Error> {
		let parts: Vec<&str> = date_str.split('-').collect();
		if parts.len() != 3
			|| parts[0].len() != 4
			|| parts[1].len() != 2
			|| parts[2].len() != 2
		{
			bail!("Date format must be YYYY-MM-DD");
		}

		let year = parts[0].parse::<i32>()?;
		let month = parts[1].parse::<u32>()?;
		let day = parts[2].parse::<u32>()?;

		match NaiveDate::from_ymd_opt(year, month, day) {
			Some(date) => Ok(Date(date)),
			None => bail!("Invalid date"),
		}
	}

	/// Builds a date from known-good literal parts.
	///
	/// Panics if the parts do not name a real calendar day, so this is only
	/// for constants such as the earliest date a source supports.
	pub fn ymd(year: i32, month: u32, day: u32) -> Date {
		match NaiveDate::from_ymd_opt(year, month, day) {
			Some(date) => Date(date),
			None => panic!("Invalid date literal {}-{}-{}", year, month, day),
		}
	}

	pub fn today() -> Date {
		Date(Local::now().date_naive())
	}

	/// The UTC calendar date containing the given unix timestamp.
	pub fn from_timestamp(seconds: i64) -> Option<Date> {
		DateTime::from_timestamp(seconds, 0).map(|dt| Date(dt.date_naive()))
	}

	pub fn next(&self) -> Option<Date> {
		self.0.checked_add_days(Days::new(1)).map(Date)
	}

	pub fn previous(&self) -> Option<Date> {
		self.0.checked_sub_days(Days::new(1)).map(Date)
	}

	/// Moves the date forward (or backward, for negative counts).
	pub fn add_days(&self, days: i64) -> Option<Date> {
		let shifted = if days >= 0 {
			self.0.checked_add_days(Days::new(days.unsigned_abs()))
		} else {
			self.0.checked_sub_days(Days::new(days.unsigned_abs()))
		};
		shifted.map(Date)
	}

	/// Signed number of days from self to other; negative if other is
	/// earlier.
	pub fn days_until(&self, other: &Date) -> i64 {
		other.0.signed_duration_since(self.0).num_days()
	}

	/// Seconds since the unix epoch at midnight UTC on this date.
	pub fn timestamp(&self) -> i64 {
		self.0.and_hms_opt(0, 0, 0).map_or(0, |dt| dt.and_utc().timestamp())
	}
}

impl fmt::Display for Date {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.format("%Y-%m-%d"))
	}
}
