// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging setup for the sharing client.
//!
//! ## Configuration priority
//!
//! 1. `delta_sharing.log_level` / `delta_sharing.log_file` client options
//! 2. `RUST_LOG` environment variable
//! 3. Default: `warn`
//!
//! A configured level only sets this crate's target. Other `RUST_LOG`
//! directives (`hyper=debug`, `reqwest=trace`, ...) still apply.
//!
//! ```bash
//! RUST_LOG=delta_sharing=debug ./my_reader
//! ```
//!
//! Applications that install their own subscriber can leave both options
//! unset; `try_init` never replaces an existing global subscriber.

use std::sync::OnceLock;
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    filter::Directive,
    EnvFilter,
};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

const LOG_TARGET: &str = "delta_sharing";

/// Where and how verbosely to log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// "off", "error", "warn", "info", "debug" or "trace" (any case).
    pub level: Option<String>,
    /// Append to this file instead of stderr.
    pub file: Option<String>,
}

impl LogConfig {
    fn is_off(&self) -> bool {
        self.level
            .as_deref()
            .is_some_and(|level| level.eq_ignore_ascii_case("off"))
    }

    fn filter(&self) -> EnvFilter {
        self.filter_over(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
    }

    /// Filter built from `env` directives with the configured level layered
    /// on top for this crate.
    fn filter_over(&self, env: Option<&str>) -> EnvFilter {
        let base = env
            .filter(|directives| !directives.trim().is_empty())
            .and_then(|directives| EnvFilter::try_new(directives).ok());

        match (self.level.as_deref(), base) {
            (Some(level), base) => {
                let configured = format!("{}={}", LOG_TARGET, level.to_lowercase());
                match (base, configured.parse::<Directive>()) {
                    (Some(base), Ok(directive)) => base.add_directive(directive),
                    _ => EnvFilter::new(configured),
                }
            }
            (None, Some(base)) => base,
            (None, None) => EnvFilter::new(format!("{}=warn", LOG_TARGET)),
        }
    }
}

/// Install the global subscriber. Only the first call in a process has any
/// effect.
pub fn init_logging(config: &LogConfig) {
    LOGGING_INITIALIZED.get_or_init(|| {
        if config.is_off() {
            return;
        }
        let filter = config.filter();

        match config.file {
            Some(ref path) => {
                let file = match std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                {
                    Ok(f) => f,
                    Err(e) => {
                        eprintln!("delta-sharing: failed to open log file {}: {}", path, e);
                        return;
                    }
                };
                tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        fmt::layer()
                            .with_writer(file)
                            .with_target(false)
                            .with_ansi(false)
                            .with_timer(SystemTime),
                    )
                    .try_init()
                    .ok();
            }
            None => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        fmt::layer()
                            .with_writer(std::io::stderr)
                            .with_target(false)
                            .with_timer(SystemTime),
                    )
                    .try_init()
                    .ok();
            }
        }
    });
}
