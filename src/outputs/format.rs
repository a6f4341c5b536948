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
use crate::util::date::Date;
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Where the quote symbol goes relative to an amount.
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPlacement {
	Left,
	#[value(name = "leftspace")]
	LeftSpace,
	Right,
	#[default]
	#[value(name = "rightspace")]
	RightSpace,
}

/// Rendering rules shared by every output. The defaults are what the
/// downstream tools accept out of the box, so changing any of them changes
/// output compatibility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Format {
	/// Replaces the series' base symbol in output when set
	pub base: Option<String>,
	/// Replaces the series' quote symbol in output when set
	pub quote: Option<String>,
	pub time: String,
	pub decimal: String,
	pub thousands: String,
	pub symbol: SymbolPlacement,
	pub datesep: String,
	pub csvdelim: u8,
}

impl Default for Format {
	fn default() -> Self {
		Self {
			base: None,
			quote: None,
			time: "00:00:00".to_string(),
			decimal: ".".to_string(),
			thousands: "".to_string(),
			symbol: SymbolPlacement::RightSpace,
			datesep: "-".to_string(),
			csvdelim: b',',
		}
	}
}

impl Format {
	pub fn base<'a>(&'a self, fallback: &'a str) -> &'a str {
		self.base.as_deref().unwrap_or(fallback)
	}

	pub fn quote<'a>(&'a self, fallback: &'a str) -> &'a str {
		self.quote.as_deref().unwrap_or(fallback)
	}

	pub fn format_date(&self, date: &Date) -> String {
		date.to_string().replace('-', &self.datesep)
	}

	/// Renders every digit of the amount as stored, grouping the whole part
	/// in threes. No rounding happens here.
	pub fn format_num(&self, amount: &Decimal) -> String {
		let canonical = amount.to_string();
		let (sign, unsigned) = match canonical.strip_prefix('-') {
			Some(rest) => ("-", rest),
			None => ("", canonical.as_str()),
		};
		let (whole, fraction) = match unsigned.split_once('.') {
			Some((w, f)) => (w, Some(f)),
			None => (unsigned, None),
		};

		let mut result = String::from(sign);
		result.push_str(&self.group_thousands(whole));
		if let Some(fraction) = fraction {
			result.push_str(&self.decimal);
			result.push_str(fraction);
		}
		result
	}

	pub fn format_quote_amount(&self, symbol: &str, amount: &Decimal) -> String {
		let amount = self.format_num(amount);
		match self.symbol {
			SymbolPlacement::Left => format!("{}{}", symbol, amount),
			SymbolPlacement::LeftSpace => format!("{} {}", symbol, amount),
			SymbolPlacement::Right => format!("{}{}", amount, symbol),
			SymbolPlacement::RightSpace => format!("{} {}", amount, symbol),
		}
	}

	fn group_thousands(&self, digits: &str) -> String {
		let len = digits.len();
		let mut grouped = String::with_capacity(len + len / 3 * self.thousands.len());
		for (i, c) in digits.chars().enumerate() {
			if i > 0 && (len - i) % 3 == 0 {
				grouped.push_str(&self.thousands);
			}
			grouped.push(c);
		}
		grouped
	}
}
