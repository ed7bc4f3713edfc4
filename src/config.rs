// ============================================================================
// src/config.rs - Hardware Discovery Configuration
// ============================================================================
//!
//! ハードウェア検出・ディスクドライバの設定値。
//!
//! ポーリングループはすべて [`SpinBudget`] で上限を持つ。
//! `SpinBudget::unbounded()` は上限なしで待ち続け、警告ログのみを出す。

use core::ops::Range;

/// 長時間待機の警告間隔（ループ回数）
pub const DEFAULT_WARN_EVERY: u64 = 10_000_000;

/// 既定のスピン上限（ループ回数）
///
/// ## 注意: CPU周波数依存
/// ステータスレジスタ読み取り1回あたり約1µs（ISAバス）として、およそ100秒。
pub const DEFAULT_SPIN_LIMIT: u64 = 100_000_000;

/// ポーリングループのスピン予算
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpinBudget {
    /// 上限回数（`None` なら無制限）
    pub limit: Option<u64>,
    /// 何回ごとに警告ログを出すか
    pub warn_every: u64,
}

impl SpinBudget {
    /// 上限付きの予算
    pub const fn bounded(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            warn_every: DEFAULT_WARN_EVERY,
        }
    }

    /// 上限なし（タイムアウトしない）
    pub const fn unbounded() -> Self {
        Self {
            limit: None,
            warn_every: DEFAULT_WARN_EVERY,
        }
    }

    /// 警告間隔を変更
    pub const fn warn_every(mut self, interval: u64) -> Self {
        self.warn_every = interval;
        self
    }

    /// `spins` 回目のポーリング後に諦めるべきか
    #[inline]
    pub fn exhausted(&self, spins: u64) -> bool {
        matches!(self.limit, Some(limit) if spins >= limit)
    }

    /// `spins` 回目で警告を出すべきか
    #[inline]
    pub fn should_warn(&self, spins: u64) -> bool {
        self.warn_every != 0 && spins != 0 && spins % self.warn_every == 0
    }
}

impl Default for SpinBudget {
    fn default() -> Self {
        Self::bounded(DEFAULT_SPIN_LIMIT)
    }
}

/// ハードウェア検出の設定
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HwConfig {
    /// アタッチスキャン対象のバス範囲（ブリッジの再帰探索はしない）
    pub attach_buses: Range<u16>,
    /// プローブ時のステータス読み取り回数
    pub probe_attempts: u32,
    /// BSY解除/DRDY待ちの予算
    pub wait: SpinBudget,
    /// DRQ待ちの予算
    pub drq: SpinBudget,
}

impl Default for HwConfig {
    fn default() -> Self {
        Self {
            attach_buses: 0..3,
            probe_attempts: 1000,
            wait: SpinBudget::default(),
            drq: SpinBudget::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_budget() {
        let budget = SpinBudget::bounded(5);
        assert!(!budget.exhausted(4));
        assert!(budget.exhausted(5));
    }

    #[test]
    fn test_unbounded_never_exhausts() {
        let budget = SpinBudget::unbounded().warn_every(3);
        assert!(!budget.exhausted(u64::MAX));
        assert!(budget.should_warn(3));
        assert!(budget.should_warn(6));
        assert!(!budget.should_warn(0));
        assert!(!budget.should_warn(4));
    }

    #[test]
    fn test_default_config_matches_attach_scope() {
        let config = HwConfig::default();
        assert_eq!(config.attach_buses, 0..3);
        assert_eq!(config.probe_attempts, 1000);
        assert_eq!(config.wait.limit, Some(DEFAULT_SPIN_LIMIT));
    }
}
