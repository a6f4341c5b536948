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
use crate::util::date::Date;
use crate::util::decimal;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeriesError {
	#[error("The price {amount} on {date} has no inverse, so the series can't be inverted.")]
	NotInvertible { date: Date, amount: Decimal },
}

/// Prices for one base/quote pair and price type over a requested date
/// range, ordered by ascending date.
///
/// Callers build a shell with no prices and hand it to a source, which
/// returns a populated copy. Every transformation here also returns a copy,
/// so whoever holds the original can keep using it unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Series {
	pub base: String,
	pub quote: String,
	pub price_type: String,
	pub start: Date,
	pub end: Date,
	pub prices: Vec<Price>,
}

impl Series {
	pub fn new(
		base: &str,
		quote: &str,
		price_type: &str,
		start: Date,
		end: Date,
	) -> Self {
		Self {
			base: base.to_string(),
			quote: quote.to_string(),
			price_type: price_type.to_string(),
			start,
			end,
			prices: Vec::new(),
		}
	}

	pub fn with_prices(&self, prices: Vec<Price>) -> Self {
		Self {
			prices,
			..self.clone_meta()
		}
	}

	/// Swaps base and quote, replacing each amount with its reciprocal.
	pub fn invert(&self) -> Result<Self, SeriesError> {
		let prices = self
			.prices
			.iter()
			.map(|p| match decimal::reciprocal(&p.amount) {
				Some(inverse) => Ok(Price::new(p.date, inverse)),
				None => Err(SeriesError::NotInvertible {
					date: p.date,
					amount: p.amount,
				}),
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			base: self.quote.clone(),
			quote: self.base.clone(),
			prices,
			..self.clone_meta()
		})
	}

	/// Rounds every amount to at most the given number of decimal places.
	/// See `decimal::quantize` for the exact rules.
	pub fn quantize(&self, decimal_places: u32) -> Self {
		let prices = self
			.prices
			.iter()
			.map(|p| Price::new(p.date, decimal::quantize(p.amount, decimal_places)))
			.collect();

		self.with_prices(prices)
	}

	pub fn rename_base(&self, base: &str) -> Self {
		Self {
			base: base.to_string(),
			prices: self.prices.clone(),
			..self.clone_meta()
		}
	}

	pub fn rename_quote(&self, quote: &str) -> Self {
		Self {
			quote: quote.to_string(),
			prices: self.prices.clone(),
			..self.clone_meta()
		}
	}

	pub fn first_date(&self) -> Option<Date> {
		self.prices.first().map(|p| p.date)
	}

	pub fn last_date(&self) -> Option<Date> {
		self.prices.last().map(|p| p.date)
	}

	/// Copies everything but the prices, which are the expensive part.
	fn clone_meta(&self) -> Self {
		Self {
			base: self.base.clone(),
			quote: self.quote.clone(),
			price_type: self.price_type.clone(),
			start: self.start,
			end: self.end,
			prices: Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn series() -> Series {
		Series::new(
			"BASE",
			"QUOTE",
			"type",
			Date::ymd(2021, 1, 1),
			Date::ymd(2021, 6, 30),
		)
		.with_prices(vec![
			Price::new(Date::ymd(2021, 1, 1), dec!(1.0123456789)),
			Price::new(Date::ymd(2021, 1, 2), dec!(2.01234567890123456789)),
			Price::new(Date::ymd(2021, 1, 3), dec!(4)),
		])
	}

	fn amounts(series: &Series) -> Vec<String> {
		series.prices.iter().map(|p| p.amount.to_string()).collect()
	}

	mod inverting {
		use super::*;

		#[test]
		fn test_swaps_pair_and_keeps_original() {
			let original = series();
			let result = original.invert().unwrap();
			assert_eq!((original.base.as_str(), original.quote.as_str()), ("BASE", "QUOTE"));
			assert_eq!((result.base.as_str(), result.quote.as_str()), ("QUOTE", "BASE"));
			assert_eq!(result.price_type, "type");
			assert_eq!(result.start, original.start);
			assert_eq!(result.end, original.end);
			assert_eq!(original.prices[2].amount, dec!(4));
		}

		#[test]
		fn test_amounts_are_reciprocals() {
			let result = series().invert().unwrap();
			assert_eq!(result.prices[2].amount, dec!(0.25));
			let product = result.prices[0].amount * dec!(1.0123456789);
			assert!((product - dec!(1)).abs() < dec!(0.0000000000000000000001));
			assert_eq!(result.prices[0].amount.round_dp(6), dec!(0.987805));
			assert_eq!(result.prices.len(), 3);
			assert_eq!(result.prices[1].date, Date::ymd(2021, 1, 2));
		}

		#[test]
		fn test_twice_restores_pair() {
			let original = series();
			let result = original.invert().unwrap().invert().unwrap();
			assert_eq!(result.base, original.base);
			assert_eq!(result.quote, original.quote);
			assert_eq!(result.prices[2].amount, dec!(4));
		}

		#[test]
		fn test_zero_amount_is_rejected() {
			let subject = series().with_prices(vec![
				Price::new(Date::ymd(2021, 1, 1), dec!(1.5)),
				Price::new(Date::ymd(2021, 1, 2), dec!(0)),
			]);
			let err = subject.invert().unwrap_err();
			assert_eq!(
				err,
				SeriesError::NotInvertible {
					date: Date::ymd(2021, 1, 2),
					amount: dec!(0),
				}
			);
			assert!(err.to_string().contains("2021-01-02"));
		}

		#[test]
		fn test_empty_series() {
			let result = series().with_prices(vec![]).invert().unwrap();
			assert!(result.prices.is_empty());
			assert_eq!(result.base, "QUOTE");
		}
	}

	mod quantizing {
		use super::*;

		fn subject() -> Series {
			series().with_prices(vec![
				Price::new(Date::ymd(2021, 1, 1), dec!(1.14)),
				Price::new(Date::ymd(2021, 1, 2), dec!(2.25)),
				Price::new(Date::ymd(2021, 1, 3), dec!(3.35)),
				Price::new(Date::ymd(2021, 1, 4), dec!(4.46)),
			])
		}

		#[test]
		fn test_rounds_half_even() {
			assert_eq!(amounts(&subject().quantize(1)), vec!["1.1", "2.2", "3.4", "4.5"]);
		}

		#[test]
		fn test_does_not_extend() {
			assert_eq!(
				amounts(&subject().quantize(3)),
				vec!["1.14", "2.25", "3.35", "4.46"]
			);
		}

		#[test]
		fn test_leaves_original_untouched() {
			let original = subject();
			let _ = original.quantize(0);
			assert_eq!(amounts(&original), vec!["1.14", "2.25", "3.35", "4.46"]);
		}
	}

	mod renaming {
		use super::*;

		#[test]
		fn test_rename_base() {
			let original = series();
			let result = original.rename_base("NEWBASE");
			assert_eq!(original.base, "BASE");
			assert_eq!(result.base, "NEWBASE");
			assert_eq!(result.quote, "QUOTE");
			assert_eq!(result.prices, original.prices);
		}

		#[test]
		fn test_rename_quote() {
			let original = series();
			let result = original.rename_quote("NEWQUOTE");
			assert_eq!(original.quote, "QUOTE");
			assert_eq!(result.quote, "NEWQUOTE");
			assert_eq!(result.price_type, "type");
		}
	}

	#[test]
	fn test_first_and_last_dates() {
		let subject = series();
		assert_eq!(subject.first_date(), Some(Date::ymd(2021, 1, 1)));
		assert_eq!(subject.last_date(), Some(Date::ymd(2021, 1, 3)));
		assert_eq!(subject.with_prices(vec![]).first_date(), None);
	}
}
