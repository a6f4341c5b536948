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
use crate::sources::source::Source;

pub mod alpha_vantage;
pub mod bank_of_canada;
pub mod coinbase_pro;
pub mod coindesk;
pub mod coinmarketcap;
pub mod ecb;
pub mod errors;
pub mod http;
pub mod source;
pub mod yahoo;

/// Every registered source, ordered by id.
pub fn all() -> Vec<Box<dyn Source>> {
	vec![
		Box::new(alpha_vantage::AlphaVantage),
		Box::new(bank_of_canada::BankOfCanada),
		Box::new(coinbase_pro::CoinbasePro),
		Box::new(coindesk::CoinDesk),
		Box::new(coinmarketcap::CoinMarketCap),
		Box::new(ecb::Ecb),
		Box::new(yahoo::Yahoo),
	]
}

pub fn by_id(id: &str) -> Option<Box<dyn Source>> {
	all().into_iter().find(|s| s.id() == id)
}

pub fn ids() -> Vec<&'static str> {
	all().iter().map(|s| s.id()).collect()
}

/// One line per source: the id padded to a common column, then the name.
pub fn formatted() -> String {
	let sources = all();
	let width = sources.iter().map(|s| s.id().len()).max().unwrap_or(0);
	sources
		.iter()
		.map(|s| format!("{:<width$}{}", s.id(), s.name(), width = width + 4))
		.collect::<Vec<_>>()
		.join("\n")
}
