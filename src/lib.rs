//! havoc - fault-injection scheduling and history checking for
//! distributed-systems correctness tests.
//!
//! Two halves, meeting only at the operation record:
//!
//! - **Nemeses** inject faults - process kills, pauses, network partitions -
//!   on schedules built from composable generators, bundled into packages
//!   that compose without the individual fault types knowing about each
//!   other.
//! - **The checker** replays the captured operation history into per-key
//!   precedence graphs and reports any monotonicity violation (a cycle of
//!   observed values) as data.

pub mod checker;
pub mod cluster;
pub mod driver;
pub mod error;
pub mod generator;
pub mod history;
pub mod nemesis;

#[cfg(test)]
mod tests;

pub use checker::{check, CheckResult, CheckStats, Component};
pub use cluster::grudge::{Grudge, PartitionSpec};
pub use cluster::select::NodeSpec;
pub use cluster::{Node, TestContext};
pub use error::NemesisError;
pub use generator::Generator;
pub use history::{FaultKind, History, Key, NodeOutcome, OpKind, OpValue, Operation, Val};
pub use nemesis::compose::{compose, db_package, Package, PackageOpts, PerfSpec};
pub use nemesis::{DbCaps, Nemesis, Partitioner, PartitionerOp, ProcessDb};
