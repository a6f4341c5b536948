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
use crate::outputs::format::Format;
use crate::outputs::{Output, OutputError};
use crate::prices::series::Series;
use crate::sources::source::Source;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use std::io;

#[derive(Serialize)]
struct Record<'a> {
	date: String,
	base: &'a str,
	quote: &'a str,
	/// A string so no digits are lost to float parsing downstream
	amount: String,
	source: &'a str,
	#[serde(rename = "type")]
	price_type: &'a str,
}

/// Either one pretty-printed array of records, or one compact record per
/// line.
pub struct Json {
	lines: bool,
}

impl Json {
	pub fn array() -> Self {
		Self { lines: false }
	}

	pub fn lines() -> Self {
		Self { lines: true }
	}
}

impl Output for Json {
	fn format(
		&self,
		series: &Series,
		source: &dyn Source,
		fmt: &Format,
	) -> Result<String, OutputError> {
		let base = fmt.base(&series.base);
		let quote = fmt.quote(&series.quote);
		let records: Vec<Record> = series
			.prices
			.iter()
			.map(|price| Record {
				date: fmt.format_date(&price.date),
				base,
				quote,
				amount: fmt.format_num(&price.amount),
				source: source.id(),
				price_type: &series.price_type,
			})
			.collect();

		let mut buf = Vec::new();
		if self.lines {
			for record in &records {
				let mut ser = Serializer::with_formatter(&mut buf, SpacedFormatter);
				record.serialize(&mut ser)?;
				buf.push(b'\n');
			}
		} else {
			let mut ser =
				Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"  "));
			records.serialize(&mut ser)?;
			buf.push(b'\n');
		}

		Ok(String::from_utf8(buf)?)
	}
}

/// Compact output with a space after each separator, the way most JSON
/// line tools write it: `{"a": 1, "b": 2}`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
	fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
	where
		W: ?Sized + io::Write,
	{
		if first {
			Ok(())
		} else {
			writer.write_all(b", ")
		}
	}

	fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
	where
		W: ?Sized + io::Write,
	{
		if first {
			Ok(())
		} else {
			writer.write_all(b", ")
		}
	}

	fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
	where
		W: ?Sized + io::Write,
	{
		writer.write_all(b": ")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::outputs::testing::{btc_eur, NamedSource};

	#[test]
	fn test_array() {
		let result = Json::array()
			.format(&btc_eur(), &NamedSource("sourceid"), &Format::default())
			.unwrap();
		let expected = r#"[
  {
    "date": "2021-01-01",
    "base": "BTC",
    "quote": "EUR",
    "amount": "24139.4648",
    "source": "sourceid",
    "type": "close"
  },
  {
    "date": "2021-01-02",
    "base": "BTC",
    "quote": "EUR",
    "amount": "26533.576",
    "source": "sourceid",
    "type": "close"
  },
  {
    "date": "2021-01-03",
    "base": "BTC",
    "quote": "EUR",
    "amount": "27001.2846",
    "source": "sourceid",
    "type": "close"
  }
]
"#;
		assert_eq!(result, expected);
	}

	#[test]
	fn test_lines() {
		let result = Json::lines()
			.format(&btc_eur(), &NamedSource("sourceid"), &Format::default())
			.unwrap();
		let lines: Vec<&str> = result.lines().collect();
		assert_eq!(lines.len(), 3);
		assert_eq!(
			lines[0],
			r#"{"date": "2021-01-01", "base": "BTC", "quote": "EUR", "amount": "24139.4648", "source": "sourceid", "type": "close"}"#
		);
		assert!(result.ends_with("}\n"));
	}

	#[test]
	fn test_custom_format_keeps_unicode() {
		let fmt = Format {
			base: Some("XBT".to_string()),
			quote: Some("€".to_string()),
			thousands: ".".to_string(),
			decimal: ",".to_string(),
			datesep: "/".to_string(),
			..Format::default()
		};
		let result = Json::lines()
			.format(&btc_eur(), &NamedSource("sourceid"), &fmt)
			.unwrap();
		assert!(result.starts_with(
			r#"{"date": "2021/01/01", "base": "XBT", "quote": "€", "amount": "24.139,4648","#
		));
	}

	#[test]
	fn test_empty_series() {
		let series = btc_eur().with_prices(vec![]);
		let array = Json::array()
			.format(&series, &NamedSource("x"), &Format::default())
			.unwrap();
		assert_eq!(array, "[]\n");
		let lines = Json::lines()
			.format(&series, &NamedSource("x"), &Format::default())
			.unwrap();
		assert_eq!(lines, "");
	}
}
