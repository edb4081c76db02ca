//! Minimal functional dependency discovery over a relation snapshot.
//!
//! A run enumerates left-hand attribute sets in non-decreasing size, validates
//! each against every attribute of the universe with either the naive
//! (grouped distinct count) or the refinement (cached partitions) strategy,
//! and keeps a minimal cover of the dependencies that hold.

pub mod attribute;
pub mod candidates;
pub mod config;
pub mod dependency;
pub mod discovery;
pub mod error;
pub mod minimality;
pub mod oracle;
pub mod partition;
pub mod reporter;
pub mod source;
pub mod validator;

pub use attribute::{Attribute, AttributeSet, AttributeUniverse};
pub use config::{DiscoveryConfig, Strategy};
pub use dependency::FunctionalDependency;
pub use discovery::{DiscoveryRun, StopHandle};
pub use error::{FdError, Result};
pub use reporter::DiscoveryReport;
pub use source::{DataFrameSource, InMemoryTable, SqliteSource, TabularDataSource, Value};
