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
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

const API_URL: &str = "https://api.pro.coinbase.com";

/// The candles endpoint returns at most 300 per request.
const SEGMENT_DAYS: i64 = 290;

pub struct CoinbasePro;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candle {
	date: Date,
	low: Decimal,
	high: Decimal,
	open: Decimal,
	close: Decimal,
}

#[derive(Deserialize)]
struct Product {
	id: String,
	base_currency: String,
	quote_currency: String,
}

#[derive(Deserialize)]
struct Currency {
	id: String,
	name: String,
}

impl Source for CoinbasePro {
	fn id(&self) -> &'static str {
		"coinbasepro"
	}

	fn name(&self) -> &'static str {
		"Coinbase Pro"
	}

	fn description(&self) -> &'static str {
		"The Coinbase Pro feed API provides market data to the public."
	}

	fn source_url(&self) -> &'static str {
		"https://docs.pro.coinbase.com/"
	}

	fn start(&self) -> Date {
		Date::ymd(2015, 7, 20)
	}

	fn types(&self) -> Vec<&'static str> {
		vec!["mid", "open", "high", "low", "close"]
	}

	fn notes(&self) -> String {
		"This source uses Coinbase's Pro APIs, not the v2 API.\n\
		 No key or other authentication is required because it only uses \
		 the feed APIs that provide market data and are public."
			.to_string()
	}

	fn symbols(&self) -> Result<Vec<(String, String)>, SourceError> {
		let client = Client::new()?;
		let products = client
			.get(&format!("{}/products", API_URL), &[])?
			.ensure_success()?;
		let currencies = client
			.get(&format!("{}/currencies", API_URL), &[])?
			.ensure_success()?;
		parse_symbols(&products, &currencies)
	}

	fn fetch(&self, series: &Series) -> Result<Series, SourceError> {
		if !self.types().iter().any(|t| *t == series.price_type) {
			return Err(SourceError::invalid_type(
				&series.price_type,
				&series.base,
				&series.quote,
				self.id(),
			));
		}

		let client = Client::new()?;
		let url = format!("{}/products/{}-{}/candles", API_URL, series.base, series.quote);

		let mut candles = Vec::new();
		for (seg_start, seg_end) in segments(series.start, series.end, SEGMENT_DAYS) {
			let params = [
				("start", seg_start.to_string()),
				("end", seg_end.to_string()),
				("granularity", "86400".to_string()),
			];
			let response = client.get(&url, &params)?;
			classify(&response, series, self.id())?;
			candles.extend(parse_candles(&response.body, seg_start, seg_end)?);
		}

		let prices = candles
			.iter()
			.map(|c| Ok(Price::new(c.date, amount(c, &series.price_type)?)))
			.collect::<Result<Vec<_>, SourceError>>()?;

		Ok(series.with_prices(prices))
	}
}

/// Consecutive, non-overlapping date ranges of at most `length` days
/// covering start to end.
fn segments(start: Date, end: Date, length: i64) -> Vec<(Date, Date)> {
	let end = end.max(start);
	let mut result = Vec::new();
	let mut seg_start = start;

	while seg_start <= end {
		let seg_end = seg_start.add_days(length - 1).map_or(end, |d| d.min(end));
		result.push((seg_start, seg_end));
		match seg_end.next() {
			Some(next) => seg_start = next,
			None => break,
		}
	}

	result
}

fn classify(response: &Response, series: &Series, source_id: &str) -> Result<(), SourceError> {
	let text = &response.body;
	let bad = |m: &str| Err(SourceError::BadResponse(m.to_string()));
	match response.status.as_u16() {
		400 if text.contains("aggregations requested exceeds") => {
			bad("Too many data points requested.")
		},
		400 if text.contains("start must be before end") => {
			bad("The end can't precede the start.")
		},
		400 if text.contains("is too old") => bad("The requested interval is too early."),
		404 if text.contains("NotFound") => {
			Err(SourceError::invalid_pair(&series.base, &series.quote, source_id))
		},
		429 => Err(SourceError::RateLimit(
			"The rate limit has been exceeded. For more information see \
			 https://docs.pro.coinbase.com/#rate-limit."
				.to_string(),
		)),
		_ if response.is_success() => Ok(()),
		status => Err(SourceError::BadResponse(format!(
			"Request failed with status: {}",
			status
		))),
	}
}

/// Candles arrive newest first as `[time, low, high, open, close, volume]`.
/// Returns them oldest first, keeping only those inside the segment.
fn parse_candles(body: &str, start: Date, end: Date) -> Result<Vec<Candle>, SourceError> {
	let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
	let mut candles = Vec::with_capacity(rows.len());

	for row in rows.iter().rev() {
		let timestamp = row
			.first()
			.and_then(Value::as_i64)
			.ok_or_else(|| SourceError::parsing("Candle without a timestamp"))?;
		let date = Date::from_timestamp(timestamp)
			.ok_or_else(|| SourceError::parsing(format!("Invalid timestamp {}", timestamp)))?;
		if date < start || date > end {
			continue;
		}

		let field = |i: usize| -> Result<Decimal, SourceError> {
			row.get(i)
				.and_then(number)
				.ok_or_else(|| SourceError::parsing(format!("Invalid candle for {}", date)))
		};
		candles.push(Candle {
			date,
			low: field(1)?,
			high: field(2)?,
			open: field(3)?,
			close: field(4)?,
		});
	}

	Ok(candles)
}

fn number(value: &Value) -> Option<Decimal> {
	match value {
		Value::Number(n) => decimal::parse(&n.to_string()),
		Value::String(s) => decimal::parse(s),
		_ => None,
	}
}

fn amount(candle: &Candle, price_type: &str) -> Result<Decimal, SourceError> {
	match price_type {
		"mid" => decimal::midpoint(candle.high, candle.low)
			.ok_or_else(|| SourceError::parsing(format!("Mid price overflow on {}", candle.date))),
		"open" => Ok(candle.open),
		"high" => Ok(candle.high),
		"low" => Ok(candle.low),
		"close" => Ok(candle.close),
		other => Err(SourceError::parsing(format!("Unknown price type '{}'", other))),
	}
}

fn parse_symbols(
	products: &Response,
	currencies: &Response,
) -> Result<Vec<(String, String)>, SourceError> {
	let mut products: Vec<Product> = products.json()?;
	let currencies: Vec<Currency> = currencies.json()?;
	let names: HashMap<&str, &str> = currencies
		.iter()
		.map(|c| (c.id.as_str(), c.name.as_str()))
		.collect();

	products.sort_by(|a, b| a.id.cmp(&b.id));
	let symbols: Vec<(String, String)> = products
		.iter()
		.map(|p| {
			let base_name = names.get(p.base_currency.as_str()).copied().unwrap_or(&p.base_currency);
			let quote_name = names
				.get(p.quote_currency.as_str())
				.copied()
				.unwrap_or(&p.quote_currency);
			(
				format!("{}/{}", p.base_currency, p.quote_currency),
				format!("{} against {}", base_name, quote_name),
			)
		})
		.collect();

	if symbols.is_empty() {
		return Err(SourceError::parsing("Expected data not found"));
	}
	Ok(symbols)
}
