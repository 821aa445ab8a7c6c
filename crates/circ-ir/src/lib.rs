//! Bit-precise circuit intermediate representation.
//!
//! A [`Circuit`] is a rooted DAG of [`Operation`]s modeling the behavior of
//! one or more machine instructions. Every operation carries an explicit
//! bit-width; widths are never inferred. The root is a disjunction over
//! `VerifyInstruction` contexts, each of which conjoins the constraints that
//! recognize one instruction pattern.
//!
//! This crate owns the node model and everything that operates on it without
//! changing its meaning: visitor dispatch, structural verification, the
//! memory-hint field layout, opcode statistics, DOT printing, and the
//! serialized file format. Structural *transformations* live in
//! `circ-transforms`.

#![forbid(unsafe_code)]

mod bits;
mod circuit;
mod dot;
pub mod memory;
mod op;
mod serialize;
mod stats;
mod verify;
mod visit;

pub use bits::BitString;
pub use circuit::{Circuit, OpId, Operation};
pub use dot::print_dot;
pub use op::{IcmpKind, OpKind};
pub use serialize::SerializeError;
pub use stats::NodeHistogram;
pub use verify::{verify_circuit, VerifyReport};
pub use visit::{UniqueVisitor, Visitor};
