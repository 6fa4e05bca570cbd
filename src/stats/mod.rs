//! Period-over-period ranking core: windows, comparisons and their wording.

pub mod comparison;
pub mod describe;
pub mod period;

pub use comparison::{compare, compare_ranked, percent_change, Compared, RankedEntity, Trend};
pub use describe::{describe_rank_change, ordinal};
pub use period::{PeriodWindow, Timeframe};
