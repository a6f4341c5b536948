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
use crate::fetch::coverage;
use crate::outputs::format::Format;
use crate::outputs::{Output, OutputError};
use crate::prices::series::{Series, SeriesError};
use crate::sources::errors::SourceError;
use crate::sources::source::Source;
use crate::util::date::Date;
use log::{log, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
	#[error(transparent)]
	Source(#[from] SourceError),
	#[error(transparent)]
	Series(#[from] SeriesError),
	#[error(transparent)]
	Output(#[from] OutputError),
}

/// Fetches a series from the source, reports on its coverage, applies the
/// requested transforms (invert first, then quantize) and renders it.
///
/// Errors are returned untouched for the caller to report. Nothing is
/// retried.
pub fn fetch(
	series: &Series,
	source: &dyn Source,
	output: &dyn Output,
	invert: bool,
	quantize: Option<u32>,
	fmt: &Format,
) -> Result<String, FetchError> {
	if let Some(message) = start_warning(series, source) {
		warn!("{}", message);
	}

	let fetched = source.fetch(series)?;

	let diagnostic = coverage::diagnose(series, &fetched, Date::today());
	log!(diagnostic.level, "{}", diagnostic.message);

	let inverted = if invert { fetched.invert()? } else { fetched };
	let quantized = match quantize {
		Some(places) => inverted.quantize(places),
		None => inverted,
	};

	Ok(output.format(&quantized, source, fmt)?)
}

/// Requests that begin before the source has any data are still sent, but
/// the user is told why the result will start later.
pub fn start_warning(series: &Series, source: &dyn Source) -> Option<String> {
	(series.start < source.start()).then(|| {
		format!(
			"The start date {} precedes the {} source start date of {}.",
			series.start,
			source.name(),
			source.start()
		)
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::outputs::csv::Csv;
	use crate::outputs::ledger::Ledger;
	use crate::prices::price::Price;
	use rust_decimal_macros::dec;
	use std::cell::Cell;

	struct Stub {
		result: Result<Vec<Price>, SourceError>,
		calls: Cell<u32>,
	}

	impl Stub {
		fn returning(prices: Vec<Price>) -> Self {
			Self {
				result: Ok(prices),
				calls: Cell::new(0),
			}
		}

		fn failing(e: SourceError) -> Self {
			Self {
				result: Err(e),
				calls: Cell::new(0),
			}
		}
	}

	impl Source for Stub {
		fn id(&self) -> &'static str {
			"stub"
		}
		fn name(&self) -> &'static str {
			"Stub"
		}
		fn description(&self) -> &'static str {
			""
		}
		fn source_url(&self) -> &'static str {
			""
		}
		fn start(&self) -> Date {
			Date::ymd(2021, 1, 1)
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
			self.calls.set(self.calls.get() + 1);
			self.result.clone().map(|prices| series.with_prices(prices))
		}
	}

	fn request() -> Series {
		Series::new(
			"BTC",
			"EUR",
			"close",
			Date::ymd(2021, 1, 1),
			Date::ymd(2021, 1, 2),
		)
	}

	fn prices() -> Vec<Price> {
		vec![
			Price::new(Date::ymd(2021, 1, 1), dec!(3)),
			Price::new(Date::ymd(2021, 1, 2), dec!(8)),
		]
	}

	#[test]
	fn test_renders_fetched_series() {
		let source = Stub::returning(prices());
		let result = fetch(&request(), &source, &Csv, false, None, &Format::default()).unwrap();
		assert_eq!(
			result,
			"date,base,quote,amount,source,type\n\
			 2021-01-01,BTC,EUR,3,stub,close\n\
			 2021-01-02,BTC,EUR,8,stub,close\n"
		);
		assert_eq!(source.calls.get(), 1);
	}

	#[test]
	fn test_inverts_then_quantizes() {
		let source = Stub::returning(prices());
		let result = fetch(&request(), &source, &Ledger, true, Some(2), &Format::default()).unwrap();
		assert_eq!(
			result,
			"P 2021-01-01 00:00:00 EUR 0.33 BTC\n\
			 P 2021-01-02 00:00:00 EUR 0.12 BTC\n"
		);
	}

	#[test]
	fn test_request_is_left_untouched() {
		let source = Stub::returning(prices());
		let original = request();
		fetch(&original, &source, &Csv, true, Some(0), &Format::default()).unwrap();
		assert_eq!(original, request());
	}

	#[test]
	fn test_early_start_still_fetches() {
		let source = Stub::returning(prices());
		let early = Series::new(
			"BTC",
			"EUR",
			"close",
			Date::ymd(2000, 1, 1),
			Date::ymd(2021, 1, 2),
		);
		assert!(fetch(&early, &source, &Csv, false, None, &Format::default()).is_ok());
		assert_eq!(source.calls.get(), 1);
	}

	#[test]
	fn test_start_warning() {
		let source = Stub::returning(vec![]);
		let early = Series::new(
			"BTC",
			"EUR",
			"close",
			Date::ymd(2020, 12, 31),
			Date::ymd(2021, 1, 2),
		);
		assert_eq!(
			start_warning(&early, &source),
			Some(
				"The start date 2020-12-31 precedes the Stub source start date of 2021-01-01."
					.to_string()
			)
		);
		assert_eq!(start_warning(&request(), &source), None);
	}

	#[test]
	fn test_empty_result_is_not_an_error() {
		let source = Stub::returning(vec![]);
		let result = fetch(&request(), &source, &Csv, false, None, &Format::default()).unwrap();
		assert_eq!(result, "date,base,quote,amount,source,type\n");
	}

	#[test]
	fn test_source_errors_propagate_without_retry() {
		let source = Stub::failing(SourceError::RateLimit("Slow down.".to_string()));
		let err = fetch(&request(), &source, &Csv, false, None, &Format::default()).unwrap_err();
		assert!(matches!(err, FetchError::Source(SourceError::RateLimit(_))));
		assert_eq!(err.to_string(), "Source request rate limit reached. Slow down.");
		assert_eq!(source.calls.get(), 1);
	}

	#[test]
	fn test_zero_price_cannot_be_inverted() {
		let source = Stub::returning(vec![Price::new(Date::ymd(2021, 1, 1), dec!(0))]);
		let err = fetch(&request(), &source, &Csv, true, None, &Format::default()).unwrap_err();
		assert!(matches!(err, FetchError::Series(SeriesError::NotInvertible { .. })));
	}
}
