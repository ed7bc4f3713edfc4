// ============================================================================
// src/io/acpi/mod.rs - ACPI Module
// ============================================================================
//!
//! ACPI Table Parser
//!
//! ブート時に RSDP → RSDT → MADT を辿って CPU 数を求める。
//!
//! ## Module Structure
//!
//! - `tables` - signatures, offsets and the bounds-checked `TableView`
//! - `mapper` - physical memory mapping collaborator
//! - `info` - MADT entries and `CpuTopology`
//! - `parser` - RSDP scan, RSDT/MADT validation, `init_acpi`

pub mod info;
pub mod mapper;
pub mod parser;
pub mod tables;

// Re-export commonly used items
pub use info::{CpuTopology, MadtEntries, MadtEntry};
pub use mapper::{OffsetMapper, PhysicalMapper};
pub use parser::{init_acpi, AcpiParser};
pub use tables::{signature, TableView, RSDP_SIGNATURE};
