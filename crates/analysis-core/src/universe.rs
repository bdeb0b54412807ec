use serde::{Deserialize, Serialize};

/// Which upstream serves a symbol's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderHint {
    /// Keyed EOD API (provider A)
    Eod,
    /// Keyless chart history API (provider B)
    YahooChart,
}

/// One tradable symbol in the configured universe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub ticker: String,
    pub name: String,
    pub category: String,
    /// Ticker this symbol's relative strength is measured against.
    pub benchmark: String,
    /// Exchange suffix for the EOD API (e.g. "US").
    pub exchange: String,
    pub provider: ProviderHint,
}

impl SymbolInfo {
    fn eod(ticker: &str, name: &str, category: &str, benchmark: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            benchmark: benchmark.to_string(),
            exchange: "US".to_string(),
            provider: ProviderHint::Eod,
        }
    }
}

/// Ordered set of symbols under analysis. Declaration order is the
/// deterministic iteration order for reports and ranking tie-breaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    symbols: Vec<SymbolInfo>,
}

impl Universe {
    pub fn new(symbols: Vec<SymbolInfo>) -> Self {
        Self { symbols }
    }

    /// Default ETF + volatility universe.
    pub fn standard() -> Self {
        let mut symbols = vec![
            SymbolInfo::eod("SPY", "S&P 500", "Equity Index", "SPY"),
            SymbolInfo::eod("QQQ", "Nasdaq 100", "Equity Index", "SPY"),
            SymbolInfo::eod("IWM", "Russell 2000", "Equity Index", "SPY"),
            SymbolInfo::eod("DIA", "Dow Jones Industrial", "Equity Index", "SPY"),
            SymbolInfo::eod("EFA", "Developed Markets ex-US", "International", "SPY"),
            SymbolInfo::eod("EEM", "Emerging Markets", "International", "SPY"),
            SymbolInfo::eod("XLK", "Technology Sector", "Sector", "SPY"),
            SymbolInfo::eod("XLF", "Financials Sector", "Sector", "SPY"),
            SymbolInfo::eod("XLE", "Energy Sector", "Sector", "SPY"),
            SymbolInfo::eod("XLV", "Health Care Sector", "Sector", "SPY"),
            SymbolInfo::eod("TLT", "20+ Year Treasuries", "Bond", "SPY"),
            SymbolInfo::eod("HYG", "High Yield Credit", "Bond", "TLT"),
            SymbolInfo::eod("GLD", "Gold", "Commodity", "SPY"),
            SymbolInfo::eod("USO", "Crude Oil", "Commodity", "SPY"),
            SymbolInfo::eod("VNQ", "US Real Estate", "Sector", "SPY"),
        ];
        symbols.push(SymbolInfo {
            ticker: "^VIX".to_string(),
            name: "CBOE Volatility Index".to_string(),
            category: "Volatility".to_string(),
            benchmark: "^VIX".to_string(),
            exchange: "INDX".to_string(),
            provider: ProviderHint::YahooChart,
        });
        Self { symbols }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<&SymbolInfo> {
        self.symbols.iter().find(|s| s.ticker == ticker)
    }

    /// Declaration position, used as the ranking tie-break.
    pub fn position(&self, ticker: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s.ticker == ticker)
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.symbols.iter().map(|s| s.ticker.as_str()).collect()
    }
}
