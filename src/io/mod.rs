// ============================================================================
// I/O Subsystem Module
// ハードウェア検出とディスクI/O: PCI列挙、IDEドライバ、ACPI
// ============================================================================
pub mod port;
pub mod pic;
pub mod pin;
pub mod pci;
pub mod ide;
pub mod acpi;

#[cfg(test)]
pub mod sim;

pub use port::PortIo;
#[cfg(target_arch = "x86_64")]
pub use port::X86PortIo;
pub use pic::{irq_vector, ChainedPic, InterruptController, IRQ_BASE};
#[cfg(target_arch = "x86_64")]
pub use pin::InterruptMaskPin;
pub use pin::{ExecutionPin, NoPin};
