// ============================================================================
// src/io/pin.rs - Register Sequence Pinning
// ============================================================================
//!
//! レジスタ書き込みシーケンスの実行規律。
//!
//! 1回の転送のレジスタ操作（start / complete / 割り込み応答）は、途中で
//! 別CPUへ移動されないよう [`ExecutionPin::pinned`] の中で実行する。
//! x86_64 ではローカル割り込みをマスクし、プリエンプションを抑止する。

/// 実行コンテキストを現在のCPUに固定してクロージャを実行
pub trait ExecutionPin {
    fn pinned<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// ローカル割り込みをマスクして固定する
#[cfg(target_arch = "x86_64")]
#[derive(Clone, Copy, Debug, Default)]
pub struct InterruptMaskPin;

#[cfg(target_arch = "x86_64")]
impl ExecutionPin for InterruptMaskPin {
    fn pinned<R>(&self, f: impl FnOnce() -> R) -> R {
        x86_64::instructions::interrupts::without_interrupts(f)
    }
}

/// 何もしない（シングルCPU環境・テスト用）
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPin;

impl ExecutionPin for NoPin {
    #[inline]
    fn pinned<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}
