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
use crate::config::config_file::Config;
use anyhow::{anyhow, bail, Error};
use dirs::home_dir;
use log::debug;
use std::fs;
use std::path::PathBuf;

pub struct Filesystem {
	home: Option<PathBuf>,
}

impl Filesystem {
	pub fn new() -> Self {
		Self { home: home_dir() }
	}

	fn default_config_path(&self) -> Option<PathBuf> {
		self.home
			.as_ref()
			.map(|home| home.join(".config/pricehist/config.toml"))
	}

	/// Loads the config from the given path, or the default path if none.
	/// A custom path must exist; a missing default file just means no
	/// config, and is never created.
	pub fn get_config(&self, custom_config_path: Option<&String>) -> Result<Config, Error> {
		let config_path = match custom_config_path {
			Some(p) => {
				let path = PathBuf::from(p);
				if !path.is_file() {
					bail!("The config file '{}' does not exist.", path.display());
				}
				path
			},
			None => match self.default_config_path() {
				Some(path) if path.is_file() => path,
				_ => {
					debug!("No config file found, using defaults.");
					return Ok(Config::default());
				},
			},
		};

		debug!("Reading config from {}", config_path.display());
		let content = fs::read_to_string(&config_path)
			.map_err(|e| anyhow!("failed to read config {}: {}", config_path.display(), e))?;
		let config: Config = toml::from_str(&content)
			.map_err(|e| anyhow!("failed to parse config {}: {}", config_path.display(), e))?;

		Ok(config)
	}
}
