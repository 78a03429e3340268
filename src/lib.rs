//! This file is the root of the `chwire` crate, a client-side codec for the
//! columnar native Block wire format.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring the top-level modules (`block`, `column`, `cursor`, etc.).
//! 2.  Re-exporting the types a connection layer needs.
//! 3.  Offering a one-call switch for verbose logging.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
mod observability; // Make macros available throughout the crate

pub mod block;
pub mod column;
pub mod config;
pub mod cursor;
pub mod error;
pub mod kernels;
pub mod traits;
pub mod types;

mod utils;

pub use block::{Block, BlockInfo, BlockState};
pub use column::{Column, ColumnBasic, ColumnHeader};
pub use config::{CompressionMethod, WireConfig};
pub use cursor::{Reader, Writer};
pub use error::ChwireError;
pub use types::{ChType, Value};

//==================================================================================
// 2. Logging
//==================================================================================
use log::LevelFilter;
use std::fs::OpenOptions;
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Installs an `info`-level logger, writing to stderr or appending to
/// `log_file`. Only the first call has any effect.
pub fn enable_verbose_logging(log_file: Option<String>) -> Result<(), ChwireError> {
    let mut result = Ok(());
    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(LevelFilter::Info);

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())
        });

        if let Some(filename) = log_file {
            match OpenOptions::new().append(true).create(true).open(filename) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(e) => {
                    result = Err(ChwireError::Io(e));
                    return;
                }
            }
        }

        let _ = builder.try_init();
    });
    result
}
