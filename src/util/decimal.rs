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
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Number of significant digits decimal arithmetic can carry. Division
/// results are rounded to fit within it.
pub const WORKING_PRECISION: u32 = 28;

/// Rounds to at most the given number of decimal places, ties to even.
///
/// Never adds decimal places: an amount that already has fewer is returned
/// as-is. The target is also capped so the result never needs more than
/// `WORKING_PRECISION` significant digits, which matters for amounts with a
/// large whole part.
pub fn quantize(amount: Decimal, decimal_places: u32) -> Decimal {
	let max_places = WORKING_PRECISION as i64 - whole_digit_count(&amount);
	let places = (decimal_places as i64).min(max_places).max(0) as u32;

	if amount.scale() <= places {
		amount
	} else {
		amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
	}
}

/// Digits to the left of the decimal point, counting from the first
/// significant digit. Zero or negative for amounts below one.
pub fn whole_digit_count(amount: &Decimal) -> i64 {
	let digits = amount.mantissa().unsigned_abs().to_string().len() as i64;
	digits - amount.scale() as i64
}

/// The multiplicative inverse, or None when there isn't a representable
/// one (zero, or a result too large for the decimal type).
pub fn reciprocal(amount: &Decimal) -> Option<Decimal> {
	if amount.is_zero() {
		return None;
	}
	Decimal::ONE.checked_div(*amount)
}

/// Parses a number as providers write it, accepting scientific notation.
pub fn parse(text: &str) -> Option<Decimal> {
	let trimmed = text.trim();
	Decimal::from_str(trimmed)
		.or_else(|_| Decimal::from_scientific(trimmed))
		.ok()
}

/// Arithmetic mean of two amounts, used for "mid" prices.
pub fn midpoint(high: Decimal, low: Decimal) -> Option<Decimal> {
	high.checked_add(low)?.checked_div(Decimal::TWO)
}
