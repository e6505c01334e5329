//! Market-keyed tables and final table assembly.

use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use tracing::debug;

use crate::error::Result;
use crate::market_state::NormalizedMarketRow;
use crate::markets::{MarketRegistry, Network};
use crate::positions::PositionSummary;
use crate::suppliers::SupplierCount;

/// Rows keyed by market display name, kept in first-insertion order.
///
/// Inserting an existing name replaces its row in place.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketTable<R> {
    rows: Vec<(String, R)>,
    index: HashMap<String, usize>,
}

impl<R> MarketTable<R> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a row, returning the row it replaced.
    pub fn insert(&mut self, name: impl Into<String>, row: R) -> Option<R> {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => Some(std::mem::replace(&mut self.rows[i].1, row)),
            None => {
                self.index.insert(name.clone(), self.rows.len());
                self.rows.push((name, row));
                None
            }
        }
    }

    /// Row for `name`, inserting `make()` first if absent.
    pub fn get_or_insert_with(&mut self, name: &str, make: impl FnOnce() -> R) -> &mut R {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.index.insert(name.to_string(), self.rows.len());
                self.rows.push((name.to_string(), make()));
                self.rows.len() - 1
            }
        };
        &mut self.rows[i].1
    }

    pub fn get(&self, name: &str) -> Option<&R> {
        self.index.get(name).map(|&i| &self.rows[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut R> {
        self.index.get(name).map(|&i| &mut self.rows[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.rows.iter().map(|(name, row)| (name.as_str(), row))
    }

    /// Transform every row, keeping names and order.
    pub fn map<T>(&self, mut f: impl FnMut(&R) -> T) -> MarketTable<T> {
        MarketTable {
            rows: self
                .rows
                .iter()
                .map(|(name, row)| (name.clone(), f(row)))
                .collect(),
            index: self.index.clone(),
        }
    }
}

impl<R> Default for MarketTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> IntoIterator for MarketTable<R> {
    type Item = (String, R);
    type IntoIter = std::vec::IntoIter<(String, R)>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<R, S: Into<String>> FromIterator<(S, R)> for MarketTable<R> {
    fn from_iter<I: IntoIterator<Item = (S, R)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, row) in iter {
            table.insert(name, row);
        }
        table
    }
}

/// One row of the presentation table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub network: Option<Network>,
    pub market_state: Option<NormalizedMarketRow>,
    pub positions: Option<PositionSummary>,
    pub suppliers: Option<SupplierCount>,
}

impl TableRow {
    fn new(network: Option<Network>) -> Self {
        Self {
            network,
            market_state: None,
            positions: None,
            suppliers: None,
        }
    }

    /// Open positions: the participant count from position records, else the
    /// vault supplier count.
    pub fn open_positions(&self) -> Option<usize> {
        self.positions
            .as_ref()
            .map(|p| p.current_participants)
            .or_else(|| self.suppliers.as_ref().map(|s| s.count))
    }
}

/// Final presentation table keyed by market display name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalTable {
    rows: MarketTable<TableRow>,
}

impl FinalTable {
    const COLUMNS: [&'static str; 6] = [
        "Current Borrowers",
        "Current Participants",
        "Position Utilization",
        "Vault Suppliers",
        "Vault Supplier USD",
        "Open Positions",
    ];

    pub fn get(&self, market: &str) -> Option<&TableRow> {
        self.rows.get(market)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableRow)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV, leaving absent fields empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let header = ["Market", "Network"]
            .into_iter()
            .chain(NormalizedMarketRow::COLUMNS)
            .chain(Self::COLUMNS);
        wtr.write_record(header)?;

        for (market, row) in self.rows.iter() {
            let mut record = vec![
                market.to_string(),
                row.network.map(|n| n.label().to_string()).unwrap_or_default(),
            ];

            match &row.market_state {
                Some(state) => record.extend(state.values().into_iter().map(|v| v.to_string())),
                None => record.extend(NormalizedMarketRow::COLUMNS.iter().map(|_| String::new())),
            }

            let positions = row.positions.as_ref();
            let suppliers = row.suppliers.as_ref();
            record.push(opt(positions.map(|p| p.current_borrowers)));
            record.push(opt(positions.map(|p| p.current_participants)));
            record.push(opt(positions.map(|p| p.utilization)));
            record.push(opt(suppliers.map(|s| s.count)));
            record.push(opt(suppliers.map(|s| s.total_usd)));
            record.push(opt(row.open_positions()));

            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write the normalized market table as CSV (`Market` then the fixed columns).
pub fn write_market_csv<W: Write>(table: &MarketTable<NormalizedMarketRow>, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(std::iter::once("Market").chain(NormalizedMarketRow::COLUMNS))?;

    for (market, row) in table.iter() {
        let record = std::iter::once(market.to_string())
            .chain(row.values().into_iter().map(|v| v.to_string()));
        wtr.write_record(record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Outer-join market state, position summaries and vault supplier counts by
/// display name.
///
/// Market rows come first, then markets only seen in positions, then supplier
/// rows. A supplier count is attached only where no position summary already
/// reports participants; otherwise it is skipped.
pub fn assemble(
    market_rows: &MarketTable<NormalizedMarketRow>,
    positions: &MarketTable<PositionSummary>,
    supplier_counts: &[SupplierCount],
    registry: &MarketRegistry,
) -> FinalTable {
    let mut rows: MarketTable<TableRow> = MarketTable::new();

    for (market, state) in market_rows.iter() {
        let row = rows.get_or_insert_with(market, || TableRow::new(registry.network_of(market)));
        row.market_state = Some(state.clone());
    }

    for (market, summary) in positions.iter() {
        let row = rows.get_or_insert_with(market, || TableRow::new(registry.network_of(market)));
        row.positions = Some(summary.clone());
    }

    for count in supplier_counts {
        let row = rows.get_or_insert_with(&count.market, || {
            TableRow::new(count.network.or_else(|| registry.network_of(&count.market)))
        });
        if row.positions.is_some() {
            debug!(market = %count.market, "Position records already report participants, skipping supplier count");
            continue;
        }
        row.suppliers = Some(count.clone());
    }

    FinalTable { rows }
}
