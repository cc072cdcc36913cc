pub mod aggregate;
pub mod fetcher;
pub mod indicators;
pub mod limiter;
pub mod notify;
pub mod pipeline;
pub mod pivot;
pub mod store;

pub use aggregate::overall_signal;
pub use fetcher::MarketDataFetcher;
pub use limiter::RateLimiter;
pub use notify::TelegramNotifier;
pub use pipeline::{RunSummary, SignalGenerator};
pub use pivot::PivotLevels;
pub use store::{ForecastRow, RegressionRow, SignalDb};
