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
use crate::prices::series::Series;
use crate::sources::source::Source;
use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;

pub mod beancount;
pub mod csv;
pub mod format;
pub mod gnucash_sql;
pub mod json;
pub mod ledger;

#[derive(Debug, Error)]
pub enum OutputError {
	#[error("Failed to write CSV output: {0}")]
	Csv(#[from] ::csv::Error),
	#[error("Failed to write JSON output: {0}")]
	Json(#[from] serde_json::Error),
	#[error("Output is not valid UTF-8: {0}")]
	Encoding(#[from] std::string::FromUtf8Error),
}

/// Renders a fetched series as text for some downstream tool. Only the
/// source's id is read, as a provenance field.
pub trait Output {
	fn format(
		&self,
		series: &Series,
		source: &dyn Source,
		fmt: &Format,
	) -> Result<String, OutputError>;
}

#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
	Beancount,
	#[default]
	Csv,
	Json,
	Jsonl,
	GnucashSql,
	Ledger,
}

impl OutputKind {
	pub fn output(&self) -> Box<dyn Output> {
		match self {
			OutputKind::Beancount => Box::new(beancount::Beancount),
			OutputKind::Csv => Box::new(csv::Csv),
			OutputKind::Json => Box::new(json::Json::array()),
			OutputKind::Jsonl => Box::new(json::Json::lines()),
			OutputKind::GnucashSql => Box::new(gnucash_sql::GnucashSql),
			OutputKind::Ledger => Box::new(ledger::Ledger),
		}
	}
}

/// Shared fixtures for the encoder tests.
#[cfg(test)]
pub mod testing {
	use crate::prices::price::Price;
	use crate::prices::series::Series;
	use crate::sources::errors::SourceError;
	use crate::sources::source::Source;
	use crate::util::date::Date;
	use rust_decimal_macros::dec;

	pub struct NamedSource(pub &'static str);

	impl Source for NamedSource {
		fn id(&self) -> &'static str {
			self.0
		}
		fn name(&self) -> &'static str {
			"Named"
		}
		fn description(&self) -> &'static str {
			""
		}
		fn source_url(&self) -> &'static str {
			""
		}
		fn start(&self) -> Date {
			Date::ymd(2000, 1, 1)
		}
		fn types(&self) -> Vec<&'static str> {
			vec!["close"]
		}
		fn notes(&self) -> String {
			String::new()
		}
		fn symbols(&self) -> Result<Vec<(String, String)>, SourceError> {
			Ok(vec![])
		}
		fn fetch(&self, series: &Series) -> Result<Series, SourceError> {
			Ok(series.clone())
		}
	}

	pub fn btc_eur() -> Series {
		Series::new(
			"BTC",
			"EUR",
			"close",
			Date::ymd(2021, 1, 1),
			Date::ymd(2021, 1, 3),
		)
		.with_prices(vec![
			Price::new(Date::ymd(2021, 1, 1), dec!(24139.4648)),
			Price::new(Date::ymd(2021, 1, 2), dec!(26533.576)),
			Price::new(Date::ymd(2021, 1, 3), dec!(27001.2846)),
		])
	}
}
