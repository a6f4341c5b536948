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
use rust_decimal::Decimal;

/// One dated observation of a price. A value object not intended to have
/// much functionality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Price {
	pub date: Date,
	pub amount: Decimal,
}

impl Price {
	pub fn new(date: Date, amount: Decimal) -> Self {
		Self { date, amount }
	}
}
