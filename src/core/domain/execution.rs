//! Execution outcome types for the dual-leg order executor.

use rust_decimal::Decimal;

use super::order::OrderSide;
use super::trade::TradeRecord;
use super::venue::VenueId;

/// Machine-readable reason a pre-trade gate or freshness check rejected an
/// opportunity before any order was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Stale,
    SpreadCollapsed,
    VolatilityBreaker,
    ConnectivityBreaker,
    ErrorRateBreaker,
    PositionLimitExceeded,
    DailyLossLimitExceeded,
    PerTradeLossLimitExceeded,
    DrawdownExceeded,
    InsufficientBalance,
}

/// Reason both legs failed outright (neither acknowledged).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    BothRejected,
    TransportError(String),
}

/// Residual directional exposure left by a partial fill: one leg filled
/// more than the other and the difference was not compensated by the core.
#[derive(Debug, Clone)]
pub struct Exposure {
    pub venue: VenueId,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub currency: String,
}

/// Outcome of one `execute(opportunity)` call.
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    Success(TradeRecord),
    Rejected { reason: RejectReason, detail: String },
    Partial { exposure: Exposure, trade: TradeRecord },
    Failed { reason: FailReason, detail: String },
    Timeout,
}

impl ExecutionResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// The trade record, if this outcome produced one. `Success` and
    /// `Partial` both journal a trade; everything else does not.
    #[must_use]
    pub fn trade(&self) -> Option<&TradeRecord> {
        match self {
            Self::Success(t) => Some(t),
            Self::Partial { trade, .. } => Some(trade),
            _ => None,
        }
    }
}

/// State machine for one leg of a dual-leg execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegState {
    Unsubmitted,
    Submitting,
    AckOpen,
    AckTerminal,
    SubmitFailed,
    Polling,
    Filled,
    PartiallyFilledFinal,
    CancelRequested,
    Cancelled,
    Rejected,
}

impl LegState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::PartiallyFilledFinal | Self::Cancelled | Self::Rejected | Self::SubmitFailed
        )
    }

    #[must_use]
    pub fn is_acknowledged(self) -> bool {
        matches!(self, Self::AckOpen | Self::AckTerminal | Self::Polling)
    }
}
