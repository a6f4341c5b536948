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

//! SQL that loads prices into a GnuCash database (SQLite, MariaDB/MySQL or
//! PostgreSQL backends).
//!
//! Commodity GUIDs are looked up by mnemonic, so the base and quote must
//! already exist as commodities in the book; if not, the script fails
//! before changing anything. Each price row's own GUID is a hash of its
//! content, and rows whose GUID is already present are skipped, so the same
//! script can be applied repeatedly.

use crate::outputs::format::Format;
use crate::outputs::{Output, OutputError};
use crate::prices::series::Series;
use crate::sources::source::Source;
use crate::util::date::Date;
use chrono::Utc;
use log::warn;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

const TEMPLATE: &str = include_str!("../../resources/gnucash.sql");

pub struct GnucashSql;

impl Output for GnucashSql {
	fn format(
		&self,
		series: &Series,
		source: &dyn Source,
		fmt: &Format,
	) -> Result<String, OutputError> {
		let (sql, warnings) = self.render(series, source, fmt);
		for message in &warnings {
			warn!("{}", message);
		}
		Ok(sql)
	}
}

impl GnucashSql {
	/// Builds the script along with any warnings the user should see before
	/// running it. Out-of-range rows produce one warning however many
	/// there are.
	pub fn render(&self, series: &Series, source: &dyn Source, fmt: &Format) -> (String, Vec<String>) {
		let base = fmt.base(&series.base);
		let quote = fmt.quote(&series.quote);
		let src = source.id();
		let price_type = series.price_type.as_str();
		let mut warnings = Vec::new();

		let epoch = fmt.format_date(&Date::ymd(1970, 1, 1));
		if let Some(message) = backslash_warning(&[
			("date", epoch.as_str()),
			("time", fmt.time.as_str()),
			("base", base),
			("quote", quote),
			("source", src),
			("price type", price_type),
		]) {
			warnings.push(message);
		}

		let mut too_big = false;
		let mut rows = Vec::with_capacity(series.prices.len());
		for price in &series.prices {
			let date = format!("{} {}", fmt.format_date(&price.date), fmt.time);
			let amount = price.amount.to_string();
			let row_guid = guid(&[date.as_str(), base, quote, src, price_type, amount.as_str()]);

			let (numerator, denominator, fits) = rational(&price.amount);
			too_big |= !fits;

			rows.push(format!(
				"({}, {}, {}, {}, {}, {}, {}, {})",
				sql_str(&row_guid),
				sql_str(&date),
				sql_str(base),
				sql_str(quote),
				sql_str(src),
				sql_str(price_type),
				numerator,
				denominator
			));
		}

		if too_big {
			// GnuCash stores prices as gnc_numeric, an int64 pair
			warnings.push(
				"This SQL contains numbers outside of the int64 range required \
				 by GnuCash for the numerators and denominators of prices. \
				 Using the --quantize option to limit the number of decimal \
				 places will usually reduce the size of the rational form as \
				 well."
					.to_string(),
			);
		}

		let values_comment = if rows.is_empty() { "-- " } else { "" };
		let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string();
		let base_sql = sql_str(base);
		let quote_sql = sql_str(quote);
		let values = rows.join(",\n");

		let sql = fill_template(
			TEMPLATE,
			&[
				("version", env!("CARGO_PKG_VERSION")),
				("timestamp", &timestamp),
				("base", &base_sql),
				("quote", &quote_sql),
				("values_comment", values_comment),
				("values", &values),
			],
		);
		(sql, warnings)
	}
}

/// First 128 bits of a SHA-256 over the concatenated parts, as hex.
fn guid(parts: &[&str]) -> String {
	let mut hasher = Sha256::new();
	for part in parts {
		hasher.update(part.as_bytes());
	}
	let digest = hex::encode(hasher.finalize());
	digest[0..32].to_string()
}

/// Exact numerator and power-of-ten denominator, plus whether both fit in
/// an int64.
fn rational(amount: &Decimal) -> (String, String, bool) {
	let numerator = amount.mantissa();
	let denominator = 10i128.pow(amount.scale());
	let fits = [numerator, denominator]
		.iter()
		.all(|n| *n >= i64::MIN as i128 && *n <= i64::MAX as i128);
	(numerator.to_string(), denominator.to_string(), fits)
}

/// Single quotes are doubled, which every supported engine understands.
fn sql_str(s: &str) -> String {
	format!("'{}'", s.replace('\'', "''"))
}

fn backslash_warning(fields: &[(&str, &str)]) -> Option<String> {
	let hits: Vec<&str> = fields
		.iter()
		.filter(|(_, value)| value.contains('\\'))
		.map(|(name, _)| *name)
		.collect();

	if hits.is_empty() {
		return None;
	}

	Some(format!(
		"Before running this SQL, check the formatting of the {} strings. \
		 SQLite treats backslashes in strings as plain characters, but \
		 MariaDB/MySQL and PostgreSQL may interpret them as escape codes.",
		english_join(&hits)
	))
}

fn english_join(items: &[&str]) -> String {
	match items {
		[] => String::new(),
		[only] => only.to_string(),
		[init @ .., last] => format!("{} and {}", init.join(", "), last),
	}
}

/// Replaces each `{name}` in one pass, so substituted text is never
/// rescanned. Unknown placeholders are left as they are.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
	let mut output = String::with_capacity(template.len());
	let mut rest = template;

	while let Some(open) = rest.find('{') {
		output.push_str(&rest[..open]);
		let after = &rest[open + 1..];
		let replacement = after.find('}').and_then(|close| {
			let name = &after[..close];
			values
				.iter()
				.find(|(key, _)| *key == name)
				.map(|(_, value)| (*value, close))
		});

		match replacement {
			Some((value, close)) => {
				output.push_str(value);
				rest = &after[close + 1..];
			},
			None => {
				output.push('{');
				rest = after;
			},
		}
	}
	output.push_str(rest);
	output
}
