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
use crate::sources::http::Client;
use crate::sources::source::Source;
use crate::util::date::Date;
use crate::util::decimal;
use roxmltree::{Document, Node};
use std::collections::BTreeSet;

const URL_BASE: &str = "https://www.ecb.europa.eu/stats/eurofxref";

/// The 90 day feed is much smaller, but only safe to use when the start is
/// comfortably inside its window.
const RECENT_FEED_DAYS: i64 = 85;

pub struct Ecb;

impl Source for Ecb {
	fn id(&self) -> &'static str {
		"ecb"
	}

	fn name(&self) -> &'static str {
		"European Central Bank"
	}

	fn description(&self) -> &'static str {
		"European Central Bank Euro foreign exchange reference rates"
	}

	fn source_url(&self) -> &'static str {
		"https://www.ecb.europa.eu/stats/exchange/eurofxref/html/index.en.html"
	}

	fn start(&self) -> Date {
		Date::ymd(1999, 1, 4)
	}

	fn types(&self) -> Vec<&'static str> {
		vec!["reference"]
	}

	fn notes(&self) -> String {
		String::new()
	}

	fn symbols(&self) -> Result<Vec<(String, String)>, SourceError> {
		let body = self.raw_data(true)?;
		let currencies = parse_currencies(&body)?;
		if currencies.is_empty() {
			return Err(SourceError::parsing("Expected data not found"));
		}
		Ok(currencies
			.into_iter()
			.map(|c| (format!("EUR/{}", c), format!("Euro against {}", c)))
			.collect())
	}

	fn fetch(&self, series: &Series) -> Result<Series, SourceError> {
		if series.base != "EUR" || series.quote.is_empty() {
			return Err(SourceError::invalid_pair(&series.base, &series.quote, self.id()));
		}

		let full_history = match Date::today().add_days(-RECENT_FEED_DAYS) {
			Some(cutoff) => series.start < cutoff,
			None => true,
		};
		let body = self.raw_data(full_history)?;

		if !parse_currencies(&body)?.contains(&series.quote) {
			return Err(SourceError::invalid_pair(&series.base, &series.quote, self.id()));
		}

		let prices = parse_rates(&body, &series.quote)?
			.into_iter()
			.filter(|p| p.date >= series.start && p.date <= series.end)
			.collect();

		Ok(series.with_prices(prices))
	}
}

impl Ecb {
	fn raw_data(&self, full_history: bool) -> Result<String, SourceError> {
		let url = if full_history {
			format!("{}/eurofxref-hist.xml", URL_BASE)
		} else {
			format!("{}/eurofxref-hist-90d.xml", URL_BASE)
		};
		let response = Client::new()?.get(&url, &[])?.ensure_success()?;
		Ok(response.body)
	}
}

fn document(body: &str) -> Result<Document<'_>, SourceError> {
	Document::parse(body).map_err(SourceError::parsing)
}

fn cubes<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
	node.descendants().filter(|n| n.has_tag_name("Cube"))
}

/// Every currency quoted anywhere in the feed, sorted.
fn parse_currencies(body: &str) -> Result<BTreeSet<String>, SourceError> {
	let doc = document(body)?;
	Ok(cubes(doc.root())
		.filter_map(|n| n.attribute("currency"))
		.map(str::to_string)
		.collect())
}

/// Daily rates for one currency in ascending date order. Days that don't
/// quote the currency are skipped.
fn parse_rates(body: &str, quote: &str) -> Result<Vec<Price>, SourceError> {
	let doc = document(body)?;

	let mut prices = Vec::new();
	for day in cubes(doc.root()) {
		let Some(time) = day.attribute("time") else {
			continue;
		};
		let rate = day
			.children()
			.filter(|n| n.has_tag_name("Cube"))
			.find(|n| n.attribute("currency") == Some(quote))
			.and_then(|n| n.attribute("rate"));
		let Some(rate) = rate else {
			continue;
		};

		let date = Date::from_str(time).map_err(SourceError::parsing)?;
		let amount = decimal::parse(rate)
			.ok_or_else(|| SourceError::parsing(format!("Invalid rate '{}' on {}", rate, time)))?;
		prices.push(Price::new(date, amount));
	}

	prices.sort_by_key(|p| p.date);
	Ok(prices)
}
