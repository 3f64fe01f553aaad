//! # signer CLI
//!
//! Command-line interface for the hash-signing pipeline.
//!
//! ## Usage
//! ```bash
//! signer sign 0 1 1 2 3 5 8
//! seq 0 99 | signer sign --output json
//! ```

mod cli;

use hash_signer::Result;

fn main() -> Result<()> {
    hash_signer::init_tracing();
    cli::run()
}
