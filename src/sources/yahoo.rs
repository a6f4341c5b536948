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
use crate::prices::price::Price;
use crate::prices::series::Series;
use crate::sources::errors::SourceError;
use crate::sources::http::{Client, Response};
use crate::sources::source::Source;
use crate::util::date::Date;
use crate::util::decimal;
use log::info;
use rust_decimal::Decimal;
use serde::Deserialize;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

const SYMBOLS_MESSAGE: &str = "Find the symbol of interest on https://finance.yahoo.com/ and use \
	 that as the PAIR in your pricehist command. Prices for each symbol are given in its native \
	 currency.";

pub struct Yahoo;

#[derive(Deserialize)]
struct Envelope {
	chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
	result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
	meta: Meta,
	#[serde(default)]
	timestamp: Vec<i64>,
	indicators: Indicators,
}

#[derive(Deserialize)]
struct Meta {
	currency: String,
	#[serde(default)]
	gmtoffset: i64,
}

#[derive(Deserialize)]
struct Indicators {
	quote: Vec<Quote>,
	#[serde(default)]
	adjclose: Vec<AdjClose>,
}

#[derive(Deserialize)]
struct Quote {
	#[serde(default)]
	open: Vec<Option<f64>>,
	#[serde(default)]
	high: Vec<Option<f64>>,
	#[serde(default)]
	low: Vec<Option<f64>>,
	#[serde(default)]
	close: Vec<Option<f64>>,
}

#[derive(Deserialize)]
struct AdjClose {
	#[serde(default)]
	adjclose: Vec<Option<f64>>,
}

impl Source for Yahoo {
	fn id(&self) -> &'static str {
		"yahoo"
	}

	fn name(&self) -> &'static str {
		"Yahoo! Finance"
	}

	fn description(&self) -> &'static str {
		"Historical data for most Yahoo! Finance symbols, as available on the web page"
	}

	fn source_url(&self) -> &'static str {
		"https://finance.yahoo.com/"
	}

	fn start(&self) -> Date {
		Date::ymd(1970, 1, 1)
	}

	fn types(&self) -> Vec<&'static str> {
		vec!["adjclose", "open", "high", "low", "close", "mid"]
	}

	fn notes(&self) -> String {
		format!(
			"Yahoo! Finance decommissioned its historical data API in 2017 but some \
			 historical data is still available via its web page.\n\
			 {}\n\
			 In output the base and quote will be the Yahoo! symbol and its \
			 corresponding currency. Some symbols include the name of the quote \
			 currency (e.g. BTC-USD), so you may wish to use --fmt-base to remove \
			 the redundant information.\n\
			 When a symbol's historical data is unavailable due to data licensing \
			 restrictions, its web page will show no download button and pricehist \
			 will only find the current day's price.",
			SYMBOLS_MESSAGE
		)
	}

	fn symbols(&self) -> Result<Vec<(String, String)>, SourceError> {
		info!("{}", SYMBOLS_MESSAGE);
		Ok(vec![])
	}

	fn fetch(&self, series: &Series) -> Result<Series, SourceError> {
		if !series.quote.is_empty() {
			return Err(SourceError::invalid_pair_because(
				&series.base,
				&series.quote,
				self.id(),
				"Don't specify the quote currency.",
			));
		}
		if !self.types().iter().any(|t| *t == series.price_type) {
			return Err(SourceError::invalid_type(
				&series.price_type,
				&series.base,
				&series.quote,
				self.id(),
			));
		}

		let url = format!("{}/{}", CHART_URL, series.base);
		let response = Client::new()?.get(&url, &params(series))?;
		classify(&response, series, self.id())?;

		let (currency, prices) = parse_prices(&response, series)?;
		Ok(series.with_prices(prices).rename_quote(&currency))
	}
}

/// The end is pushed forward a day so the last requested day is included.
fn params(series: &Series) -> Vec<(&'static str, String)> {
	vec![
		("period1", series.start.timestamp().to_string()),
		("period2", (series.end.timestamp() + SECONDS_PER_DAY).to_string()),
		("interval", "1d".to_string()),
		("events", "capitalGain%7Cdiv%7Csplit".to_string()),
		("includeAdjustedClose", "true".to_string()),
	]
}

fn classify(response: &Response, series: &Series, source_id: &str) -> Result<(), SourceError> {
	let text = &response.body;
	let bad = |m: &str| Err(SourceError::BadResponse(m.to_string()));
	match response.status.as_u16() {
		404 if text.contains("No data found, symbol may be delisted") => Err(
			SourceError::invalid_pair_because(&series.base, &series.quote, source_id, "Symbol not found."),
		),
		400 if text.contains("Data doesn't exist") => {
			bad("No data for the given interval. Try requesting a larger interval.")
		},
		404 if text.contains("Timestamp data missing") => bad(
			"Data missing. The given interval may be for a gap in the data such as a \
			 weekend or holiday. Try requesting a larger interval.",
		),
		_ if response.is_success() => Ok(()),
		status => Err(SourceError::BadResponse(format!(
			"Request failed with status: {}",
			status
		))),
	}
}

/// The quote currency and the requested price for each trading day in the
/// series' interval. Rows where the needed value is null are skipped.
fn parse_prices(response: &Response, series: &Series) -> Result<(String, Vec<Price>), SourceError> {
	let envelope: Envelope = response.json()?;
	let result = envelope
		.chart
		.result
		.and_then(|results| results.into_iter().next())
		.ok_or_else(|| SourceError::parsing("Unexpected content"))?;
	let quote = result
		.indicators
		.quote
		.first()
		.ok_or_else(|| SourceError::parsing("Unexpected content"))?;
	let adjclose = result.indicators.adjclose.first();

	let mut prices = Vec::with_capacity(result.timestamp.len());
	for (i, timestamp) in result.timestamp.iter().enumerate() {
		// timestamps mark the market open, so the exchange's offset gives the trading day
		let local = timestamp + result.meta.gmtoffset;
		let date = Date::from_timestamp(local)
			.ok_or_else(|| SourceError::parsing(format!("Invalid timestamp {}", timestamp)))?;
		if date < series.start || date > series.end {
			continue;
		}
		if let Some(amount) = amount(quote, adjclose, i, &series.price_type) {
			prices.push(Price::new(date, amount));
		}
	}

	Ok((result.meta.currency, prices))
}

fn amount(quote: &Quote, adjclose: Option<&AdjClose>, i: usize, price_type: &str) -> Option<Decimal> {
	let at = |column: &[Option<f64>]| column.get(i).copied().flatten().and_then(Decimal::from_f64_retain);
	match price_type {
		"adjclose" => adjclose.and_then(|a| at(&a.adjclose)),
		"open" => at(&quote.open),
		"high" => at(&quote.high),
		"low" => at(&quote.low),
		"close" => at(&quote.close),
		"mid" => decimal::midpoint(at(&quote.high)?, at(&quote.low)?),
		_ => None,
	}
}
