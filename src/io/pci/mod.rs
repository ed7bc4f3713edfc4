// ============================================================================
// src/io/pci/mod.rs - PCI Common Module
// ============================================================================
//!
//! # PCI 共通モジュール
//!
//! ## モジュール構成
//! - `traits`: ConfigSpaceAccessor トレイト
//! - `types`: タグ、レジスタオフセット、BARデコード
//! - `legacy`: 従来のI/Oポート（0xCF8/0xCFC）ベースのアクセス
//! - `bus`: PCIバス列挙とダンプ
//! - `attach`: (vendor, device) テーブルによるドライバのアタッチ

pub mod traits;
pub mod types;
pub mod legacy;
pub mod bus;
pub mod attach;

// Re-exports for convenient access
pub use traits::ConfigSpaceAccessor;
pub use types::{config_regs, decode_io_bar, ConfigWidth, PciTag};
pub use legacy::LegacyPciAccessor;
pub use bus::{PciBusScanner, PciFunction, ALL_BUSES};
pub use attach::{scan_and_attach, AttachEntry, AttachHandler, AttachRegistry, DiskRegistry, PciAttacher};
