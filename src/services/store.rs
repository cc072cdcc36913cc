//! SQLite persistence for generated signals and run metadata.
//!
//! One latest-state table keyed by symbol, three append-only history tables
//! keyed by (symbol, timestamp), and a singleton metadata row. All writes
//! are single-statement upserts, so a repeated run replaces rather than
//! duplicates.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};
use tracing::{debug, error, info};

use crate::services::indicators::FibLevels;
use crate::types::{
    OverallSignal, PivotZone, RsiZone, RunMetadata, SignalLabel, TradingSignal,
};

/// One daily regression history row.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionRow {
    pub symbol: String,
    pub timestamp: String,
    pub current_price: f64,
    pub slope: f64,
    pub r_squared: f64,
    pub confidence: f64,
    pub trend_strength: f64,
    pub signal: SignalLabel,
    pub support: f64,
    pub resistance: f64,
    pub forecast_1d: f64,
    pub forecast_7d: f64,
    pub forecast_30d: f64,
}

/// One multi-horizon forecast history row.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub symbol: String,
    pub timestamp: String,
    pub current_price: f64,
    pub forecast_1h: f64,
    pub forecast_1d: f64,
    pub forecast_7d: f64,
    pub forecast_14d: f64,
    pub forecast_30d: f64,
    pub signal: OverallSignal,
}

/// SQLite store behind a mutex; callers share it across the run.
pub struct SignalDb {
    conn: Mutex<Connection>,
}

impl SignalDb {
    /// Open (or create) the database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        info!("signal database initialized");
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        debug!("in-memory signal database initialized");
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        // Latest-state table, one live row per symbol
        conn.execute(
            "CREATE TABLE IF NOT EXISTS trading_signals (
                symbol TEXT PRIMARY KEY,
                current_price REAL NOT NULL,
                poly_1h_signal TEXT NOT NULL,
                fib_1h_signal TEXT NOT NULL,
                fib_signal TEXT NOT NULL,
                poly_signal TEXT NOT NULL,
                rsi_signal TEXT NOT NULL,
                rsi_zone TEXT NOT NULL,
                rsi_value REAL NOT NULL,
                macd_signal TEXT NOT NULL,
                pivot_signal TEXT NOT NULL,
                pivot_zone TEXT NOT NULL,
                overall_signal TEXT NOT NULL,
                bull_count INTEGER NOT NULL,
                bear_count INTEGER NOT NULL,
                forecast_1h REAL NOT NULL,
                forecast_1d REAL NOT NULL,
                forecast_7d REAL NOT NULL,
                forecast_14d REAL NOT NULL,
                forecast_30d REAL NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        // Hourly Fibonacci level history
        conn.execute(
            "CREATE TABLE IF NOT EXISTS fibonacci_1h (
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                current_price REAL NOT NULL,
                fib_level_0 REAL NOT NULL,
                fib_level_23_6 REAL NOT NULL,
                fib_level_38_2 REAL NOT NULL,
                fib_level_50 REAL NOT NULL,
                fib_level_61_8 REAL NOT NULL,
                fib_level_78_6 REAL NOT NULL,
                fib_level_100 REAL NOT NULL,
                fib_level_127_2 REAL NOT NULL,
                fib_level_161_8 REAL NOT NULL,
                fib_level_261_8 REAL NOT NULL,
                fib_level_423_6 REAL NOT NULL,
                fib_1h_signal TEXT NOT NULL,
                pivot_zone TEXT NOT NULL,
                UNIQUE(symbol, timestamp)
            )",
            [],
        )?;

        // Daily regression history
        conn.execute(
            "CREATE TABLE IF NOT EXISTS polynomial_regression_daily (
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                current_price REAL NOT NULL,
                poly_regression_value REAL NOT NULL,
                poly_signal_daily TEXT NOT NULL,
                poly_confidence REAL NOT NULL,
                r_squared REAL NOT NULL,
                trend_strength REAL NOT NULL,
                support_level REAL NOT NULL,
                resistance_level REAL NOT NULL,
                forecast_1d REAL NOT NULL,
                forecast_7d REAL NOT NULL,
                forecast_30d REAL NOT NULL,
                UNIQUE(symbol, timestamp)
            )",
            [],
        )?;

        // Multi-horizon forecast history
        conn.execute(
            "CREATE TABLE IF NOT EXISTS hvts_forecast (
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                current_price REAL NOT NULL,
                forecast_1h REAL NOT NULL,
                forecast_1d REAL NOT NULL,
                forecast_7d REAL NOT NULL,
                forecast_14d REAL NOT NULL,
                forecast_30d REAL NOT NULL,
                signal TEXT NOT NULL,
                UNIQUE(symbol, timestamp)
            )",
            [],
        )?;

        // Singleton run metadata
        conn.execute(
            "CREATE TABLE IF NOT EXISTS dashboard_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                last_updated TEXT NOT NULL,
                total_symbols INTEGER NOT NULL,
                status TEXT NOT NULL,
                duration_seconds REAL NOT NULL,
                data_source TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_fibonacci_symbol ON fibonacci_1h(symbol)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_regression_symbol ON polynomial_regression_daily(symbol)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_forecast_symbol ON hvts_forecast(symbol)",
            [],
        )?;

        Ok(())
    }

    /// Upsert the latest-state row for a symbol.
    pub fn save_trading_signal(&self, signal: &TradingSignal) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO trading_signals
             (symbol, current_price, poly_1h_signal, fib_1h_signal, fib_signal, poly_signal,
              rsi_signal, rsi_zone, rsi_value, macd_signal, pivot_signal, pivot_zone,
              overall_signal, bull_count, bear_count,
              forecast_1h, forecast_1d, forecast_7d, forecast_14d, forecast_30d, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                     ?16, ?17, ?18, ?19, ?20, ?21)
             ON CONFLICT(symbol) DO UPDATE SET
                current_price = excluded.current_price,
                poly_1h_signal = excluded.poly_1h_signal,
                fib_1h_signal = excluded.fib_1h_signal,
                fib_signal = excluded.fib_signal,
                poly_signal = excluded.poly_signal,
                rsi_signal = excluded.rsi_signal,
                rsi_zone = excluded.rsi_zone,
                rsi_value = excluded.rsi_value,
                macd_signal = excluded.macd_signal,
                pivot_signal = excluded.pivot_signal,
                pivot_zone = excluded.pivot_zone,
                overall_signal = excluded.overall_signal,
                bull_count = excluded.bull_count,
                bear_count = excluded.bear_count,
                forecast_1h = excluded.forecast_1h,
                forecast_1d = excluded.forecast_1d,
                forecast_7d = excluded.forecast_7d,
                forecast_14d = excluded.forecast_14d,
                forecast_30d = excluded.forecast_30d,
                timestamp = excluded.timestamp",
            params![
                signal.symbol,
                signal.current_price,
                signal.poly_1h_signal.as_str(),
                signal.fib_1h_signal.as_str(),
                signal.fib_signal.as_str(),
                signal.poly_signal.as_str(),
                signal.rsi_signal.as_str(),
                signal.rsi_zone.as_str(),
                signal.rsi_value,
                signal.macd_signal.as_str(),
                signal.pivot_signal.as_str(),
                signal.pivot_zone.as_str(),
                signal.overall_signal.as_str(),
                signal.bull_count as i64,
                signal.bear_count as i64,
                signal.forecast_1h,
                signal.forecast_1d,
                signal.forecast_7d,
                signal.forecast_14d,
                signal.forecast_30d,
                signal.timestamp,
            ],
        )?;

        debug!("saved trading signal for {}", signal.symbol);
        Ok(())
    }

    /// Upsert one Fibonacci history row.
    pub fn save_fibonacci(
        &self,
        symbol: &str,
        timestamp: &str,
        current_price: f64,
        levels: &FibLevels,
        signal: SignalLabel,
        pivot_zone: PivotZone,
    ) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO fibonacci_1h
             (symbol, timestamp, current_price,
              fib_level_0, fib_level_23_6, fib_level_38_2, fib_level_50, fib_level_61_8,
              fib_level_78_6, fib_level_100, fib_level_127_2, fib_level_161_8,
              fib_level_261_8, fib_level_423_6, fib_1h_signal, pivot_zone)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(symbol, timestamp) DO UPDATE SET
                current_price = excluded.current_price,
                fib_level_0 = excluded.fib_level_0,
                fib_level_23_6 = excluded.fib_level_23_6,
                fib_level_38_2 = excluded.fib_level_38_2,
                fib_level_50 = excluded.fib_level_50,
                fib_level_61_8 = excluded.fib_level_61_8,
                fib_level_78_6 = excluded.fib_level_78_6,
                fib_level_100 = excluded.fib_level_100,
                fib_level_127_2 = excluded.fib_level_127_2,
                fib_level_161_8 = excluded.fib_level_161_8,
                fib_level_261_8 = excluded.fib_level_261_8,
                fib_level_423_6 = excluded.fib_level_423_6,
                fib_1h_signal = excluded.fib_1h_signal,
                pivot_zone = excluded.pivot_zone",
            params![
                symbol,
                timestamp,
                current_price,
                levels.level_0,
                levels.level_23_6,
                levels.level_38_2,
                levels.level_50,
                levels.level_61_8,
                levels.level_78_6,
                levels.level_100,
                levels.level_127_2,
                levels.level_161_8,
                levels.level_261_8,
                levels.level_423_6,
                signal.as_str(),
                pivot_zone.as_str(),
            ],
        )?;

        Ok(())
    }

    /// Upsert one daily regression history row.
    pub fn save_regression(&self, row: &RegressionRow) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO polynomial_regression_daily
             (symbol, timestamp, current_price, poly_regression_value, poly_signal_daily,
              poly_confidence, r_squared, trend_strength, support_level, resistance_level,
              forecast_1d, forecast_7d, forecast_30d)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(symbol, timestamp) DO UPDATE SET
                current_price = excluded.current_price,
                poly_regression_value = excluded.poly_regression_value,
                poly_signal_daily = excluded.poly_signal_daily,
                poly_confidence = excluded.poly_confidence,
                r_squared = excluded.r_squared,
                trend_strength = excluded.trend_strength,
                support_level = excluded.support_level,
                resistance_level = excluded.resistance_level,
                forecast_1d = excluded.forecast_1d,
                forecast_7d = excluded.forecast_7d,
                forecast_30d = excluded.forecast_30d",
            params![
                row.symbol,
                row.timestamp,
                row.current_price,
                row.slope,
                row.signal.as_str(),
                row.confidence,
                row.r_squared,
                row.trend_strength,
                row.support,
                row.resistance,
                row.forecast_1d,
                row.forecast_7d,
                row.forecast_30d,
            ],
        )?;

        Ok(())
    }

    /// Upsert one multi-horizon forecast history row.
    pub fn save_forecast(&self, row: &ForecastRow) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO hvts_forecast
             (symbol, timestamp, current_price, forecast_1h, forecast_1d, forecast_7d,
              forecast_14d, forecast_30d, signal)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(symbol, timestamp) DO UPDATE SET
                current_price = excluded.current_price,
                forecast_1h = excluded.forecast_1h,
                forecast_1d = excluded.forecast_1d,
                forecast_7d = excluded.forecast_7d,
                forecast_14d = excluded.forecast_14d,
                forecast_30d = excluded.forecast_30d,
                signal = excluded.signal",
            params![
                row.symbol,
                row.timestamp,
                row.current_price,
                row.forecast_1h,
                row.forecast_1d,
                row.forecast_7d,
                row.forecast_14d,
                row.forecast_30d,
                row.signal.as_str(),
            ],
        )?;

        Ok(())
    }

    /// Overwrite the singleton metadata row.
    pub fn update_metadata(&self, metadata: &RunMetadata) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO dashboard_metadata
             (id, last_updated, total_symbols, status, duration_seconds, data_source)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                last_updated = excluded.last_updated,
                total_symbols = excluded.total_symbols,
                status = excluded.status,
                duration_seconds = excluded.duration_seconds,
                data_source = excluded.data_source",
            params![
                metadata.last_updated,
                metadata.total_symbols,
                metadata.status,
                metadata.duration_seconds,
                metadata.data_source,
            ],
        )?;

        Ok(())
    }

    /// Latest-state row for a symbol.
    pub fn latest_signal(&self, symbol: &str) -> Option<TradingSignal> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            "SELECT symbol, current_price, poly_1h_signal, fib_1h_signal, fib_signal,
                    poly_signal, rsi_signal, rsi_zone, rsi_value, macd_signal, pivot_signal,
                    pivot_zone, overall_signal, bull_count, bear_count,
                    forecast_1h, forecast_1d, forecast_7d, forecast_14d, forecast_30d, timestamp
             FROM trading_signals WHERE symbol = ?1",
            params![symbol],
            |row| {
                Ok(TradingSignal {
                    symbol: row.get(0)?,
                    current_price: row.get(1)?,
                    poly_1h_signal: parse_label(&row.get::<_, String>(2)?),
                    fib_1h_signal: parse_label(&row.get::<_, String>(3)?),
                    fib_signal: parse_label(&row.get::<_, String>(4)?),
                    poly_signal: parse_label(&row.get::<_, String>(5)?),
                    rsi_signal: parse_label(&row.get::<_, String>(6)?),
                    rsi_zone: RsiZone::parse(&row.get::<_, String>(7)?).unwrap_or(RsiZone::Neutral),
                    rsi_value: row.get(8)?,
                    macd_signal: parse_label(&row.get::<_, String>(9)?),
                    pivot_signal: parse_label(&row.get::<_, String>(10)?),
                    pivot_zone: PivotZone::parse(&row.get::<_, String>(11)?)
                        .unwrap_or(PivotZone::AboveBuyZone),
                    overall_signal: OverallSignal::parse(&row.get::<_, String>(12)?)
                        .unwrap_or(OverallSignal::Neutral),
                    bull_count: row.get::<_, i64>(13)? as usize,
                    bear_count: row.get::<_, i64>(14)? as usize,
                    forecast_1h: row.get(15)?,
                    forecast_1d: row.get(16)?,
                    forecast_7d: row.get(17)?,
                    forecast_14d: row.get(18)?,
                    forecast_30d: row.get(19)?,
                    timestamp: row.get(20)?,
                })
            },
        );

        match result {
            Ok(signal) => Some(signal),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                error!("error fetching signal for {}: {}", symbol, e);
                None
            }
        }
    }

    /// The singleton metadata row, if a run has completed.
    pub fn metadata(&self) -> Option<RunMetadata> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            "SELECT last_updated, total_symbols, status, duration_seconds, data_source
             FROM dashboard_metadata WHERE id = 1",
            [],
            |row| {
                Ok(RunMetadata {
                    last_updated: row.get(0)?,
                    total_symbols: row.get(1)?,
                    status: row.get(2)?,
                    duration_seconds: row.get(3)?,
                    data_source: row.get(4)?,
                })
            },
        );

        match result {
            Ok(metadata) => Some(metadata),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                error!("error fetching run metadata: {}", e);
                None
            }
        }
    }

    /// Number of latest-state rows.
    pub fn signal_count(&self) -> usize {
        self.count("SELECT COUNT(*) FROM trading_signals")
    }

    /// Number of Fibonacci history rows for a symbol.
    pub fn fibonacci_count(&self, symbol: &str) -> usize {
        self.count_for_symbol("SELECT COUNT(*) FROM fibonacci_1h WHERE symbol = ?1", symbol)
    }

    /// Number of regression history rows for a symbol.
    pub fn regression_count(&self, symbol: &str) -> usize {
        self.count_for_symbol(
            "SELECT COUNT(*) FROM polynomial_regression_daily WHERE symbol = ?1",
            symbol,
        )
    }

    /// Number of forecast history rows for a symbol.
    pub fn forecast_count(&self, symbol: &str) -> usize {
        self.count_for_symbol("SELECT COUNT(*) FROM hvts_forecast WHERE symbol = ?1", symbol)
    }

    fn count(&self, query: &str) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row(query, [], |row| row.get(0)).unwrap_or(0)
    }

    fn count_for_symbol(&self, query: &str, symbol: &str) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row(query, params![symbol], |row| row.get(0))
            .unwrap_or(0)
    }
}

fn parse_label(s: &str) -> SignalLabel {
    SignalLabel::parse(s).unwrap_or(SignalLabel::Neutral)
}
