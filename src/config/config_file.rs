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
use crate::outputs::format::{Format, SymbolPlacement};
use crate::outputs::OutputKind;
use anyhow::{bail, Error};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
	pub format: Option<FormatSection>,
	pub fetch: Option<FetchSection>,
}

/// Defaults for the `--fmt-*` flags of the fetch command.
#[derive(Debug, Default, Deserialize)]
pub struct FormatSection {
	pub time: Option<String>,
	pub decimal: Option<String>,
	pub thousands: Option<String>,
	pub symbol: Option<SymbolPlacement>,
	pub datesep: Option<String>,
	pub csvdelim: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FetchSection {
	pub output: Option<OutputKind>,
}

impl Config {
	/// The built-in format with any configured values laid over it.
	pub fn format(&self) -> Result<Format, Error> {
		let mut fmt = Format::default();
		let Some(section) = &self.format else {
			return Ok(fmt);
		};

		if let Some(time) = &section.time {
			fmt.time = time.clone();
		}
		if let Some(decimal) = &section.decimal {
			fmt.decimal = single_char("decimal", decimal)?;
		}
		if let Some(thousands) = &section.thousands {
			// empty disables grouping
			if !thousands.is_empty() {
				fmt.thousands = single_char("thousands", thousands)?;
			}
		}
		if let Some(symbol) = section.symbol {
			fmt.symbol = symbol;
		}
		if let Some(datesep) = &section.datesep {
			fmt.datesep = single_char("datesep", datesep)?;
		}
		if let Some(csvdelim) = &section.csvdelim {
			fmt.csvdelim = csv_delimiter(csvdelim)?;
		}
		Ok(fmt)
	}

	pub fn output(&self) -> OutputKind {
		self.fetch
			.as_ref()
			.and_then(|f| f.output)
			.unwrap_or_default()
	}
}

/// Accepts exactly one character.
pub fn single_char(name: &str, value: &str) -> Result<String, Error> {
	if value.chars().count() != 1 {
		bail!("The {} setting must be a single character, not '{}'.", name, value);
	}
	Ok(value.to_string())
}

/// The CSV writer takes a single byte, so the delimiter must be ASCII.
pub fn csv_delimiter(value: &str) -> Result<u8, Error> {
	let value = single_char("csvdelim", value)?;
	match value.as_bytes() {
		[byte] if byte.is_ascii() => Ok(*byte),
		_ => bail!("The csvdelim setting must be an ASCII character, not '{}'.", value),
	}
}
