/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use env_logger::Builder as EnvLoggerBuilder;

/// Install the process-wide logger, honouring `RUST_LOG` and defaulting to
/// warnings. The host may load the plugin more than once per process, so a
/// logger that is already installed is left in place.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    if EnvLoggerBuilder::from_env(env).try_init().is_err() {
        log::debug!("Logger already installed, keeping it.");
    }
}
