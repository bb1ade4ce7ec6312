//! wm-schema - Schema tool for Wikimig
//!
//! This crate provides the changelog model (change sets, preconditions and
//! changes), per-product DDL generation, a changelog applier that records
//! applied change sets, and the generic non-destructive schema sync.

pub mod applier;
pub mod changelog;
pub mod error;
pub mod generator;
pub mod sync;

pub use applier::{ApplyReport, ChangelogApplier, ExecType, SchemaTool};
pub use changelog::{
    Change, ChangeSet, ChangeUnit, Changelog, ColumnSpec, DataType, FailAction, Precondition,
    Preconditions, SchemaFragment,
};
pub use error::{FragmentFailure, SchemaError, SchemaResult};
pub use generator::DdlGenerator;
pub use sync::{IndexDef, SchemaModel, SchemaSync, SyncReport, TableDef};
