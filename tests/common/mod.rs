//! Shared test infrastructure for extsnmpd.
//!
//! Provides TestAgent (in-process agent), ScriptedRunner (canned command
//! output) and UdpClient (raw SNMP requests).

// Not every test file uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod agent;
pub mod runner;
pub mod udp;

pub use agent::TestAgent;
pub use runner::ScriptedRunner;
pub use udp::UdpClient;

use std::sync::Once;

use extsnmpd::Oid;

/// Route agent logs through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .without_time()
            .try_init();
    });
}

/// `1.3.6.1.4.1.2021.8.1.{column}.{row}`
pub fn ext_table(column: u32, row: u32) -> Oid {
    let mut arcs = vec![1, 3, 6, 1, 4, 1, 2021, 8, 1, column];
    arcs.push(row);
    Oid::from_slice(&arcs)
}

/// `1.3.6.1.2.1.1.{column}.0`
pub fn system(column: u32) -> Oid {
    Oid::from_slice(&[1, 3, 6, 1, 2, 1, 1, column, 0])
}
