use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a platform's stage vocabulary maps onto the three budget buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageSentinels {
    pub closed_won: &'static str,
    pub closed_lost: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DealBucket {
    Pipeline,
    ClosedWon,
    ClosedLost,
}

impl DealBucket {
    pub fn classify(stage: &str, sentinels: StageSentinels) -> Self {
        if stage == sentinels.closed_won {
            Self::ClosedWon
        } else if stage == sentinels.closed_lost {
            Self::ClosedLost
        } else {
            Self::Pipeline
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBreakdown {
    pub count: u64,
    pub total_value: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_pipeline_value: Decimal,
    pub total_closed_won: Decimal,
    pub total_closed_lost: Decimal,
    pub average_deal_size: Decimal,
    pub deals_by_stage: BTreeMap<String, StageBreakdown>,
}

impl BudgetSummary {
    /// Accumulates one deal into its bucket and stage. Sums saturate at
    /// `Decimal::MAX`. Call [`finalize`] once every deal has been recorded.
    ///
    /// [`finalize`]: BudgetSummary::finalize
    pub fn record_deal(&mut self, stage: &str, amount: Decimal, sentinels: StageSentinels) {
        let bucket = match DealBucket::classify(stage, sentinels) {
            DealBucket::ClosedWon => &mut self.total_closed_won,
            DealBucket::ClosedLost => &mut self.total_closed_lost,
            DealBucket::Pipeline => &mut self.total_pipeline_value,
        };
        *bucket = bucket.saturating_add(amount);

        let entry = self.deals_by_stage.entry(stage.to_string()).or_default();
        entry.count += 1;
        entry.total_value = entry.total_value.saturating_add(amount);
    }

    pub fn deal_count(&self) -> u64 {
        self.deals_by_stage.values().map(|stage| stage.count).sum()
    }

    pub fn total_value(&self) -> Decimal {
        self.total_pipeline_value
            .saturating_add(self.total_closed_won)
            .saturating_add(self.total_closed_lost)
    }

    pub fn finalize(&mut self) {
        let count = self.deal_count();
        self.average_deal_size = if count == 0 {
            Decimal::ZERO
        } else {
            self.total_value().checked_div(Decimal::from(count)).unwrap_or(Decimal::ZERO)
        };
    }
}
