// 📊 Aggregator
// Statistics, category breakdowns and monthly rollups over a transaction snapshot.
// Pure functions: no I/O, input order only matters for tie-breaking.

use crate::transaction::{Transaction, TransactionType};
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// STATISTICS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_transactions: usize,
    pub total_pemasukan: f64,
    pub total_pengeluaran: f64,
    pub avg_pemasukan: f64,
    pub avg_pengeluaran: f64,
    pub max_pemasukan: f64,
    pub max_pengeluaran: f64,
}

impl Statistics {
    /// Income minus expense over the whole snapshot
    pub fn saldo(&self) -> f64 {
        self.total_pemasukan - self.total_pengeluaran
    }
}

/// Count, totals, averages and maxima per type. Averages are 0 when a type
/// has no records; maxima have a 0 floor.
pub fn statistics(transactions: &[Transaction]) -> Statistics {
    let mut stats = Statistics {
        total_transactions: transactions.len(),
        ..Default::default()
    };
    let mut income_count = 0usize;
    let mut expense_count = 0usize;

    for tx in transactions {
        match tx.tipe {
            TransactionType::Pemasukan => {
                income_count += 1;
                stats.total_pemasukan += tx.nominal;
                stats.max_pemasukan = stats.max_pemasukan.max(tx.nominal);
            }
            TransactionType::Pengeluaran => {
                expense_count += 1;
                stats.total_pengeluaran += tx.nominal;
                stats.max_pengeluaran = stats.max_pengeluaran.max(tx.nominal);
            }
        }
    }

    if income_count > 0 {
        stats.avg_pemasukan = stats.total_pemasukan / income_count as f64;
    }
    if expense_count > 0 {
        stats.avg_pengeluaran = stats.total_pengeluaran / expense_count as f64;
    }

    stats
}

// ============================================================================
// CATEGORY BREAKDOWN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub kategori: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub kategori: String,
    pub total: f64,
    /// Whole percent of the breakdown total
    pub percentage: u32,
}

/// Sum of `nominal` per category for one type, largest first.
/// Equal sums keep the order in which their category first appeared.
pub fn category_breakdown(transactions: &[Transaction], tipe: TransactionType) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();

    for tx in transactions.iter().filter(|t| t.tipe == tipe) {
        match totals.iter_mut().find(|c| c.kategori == tx.kategori) {
            Some(entry) => entry.total += tx.nominal,
            None => totals.push(CategoryTotal {
                kategori: tx.kategori.clone(),
                total: tx.nominal,
            }),
        }
    }

    // sort_by is stable
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

/// Each row rounded on its own, so the shares may not add up to exactly 100
pub fn with_percentages(breakdown: &[CategoryTotal]) -> Vec<CategoryShare> {
    let total: f64 = breakdown.iter().map(|c| c.total).sum();

    breakdown
        .iter()
        .map(|c| CategoryShare {
            kategori: c.kategori.clone(),
            total: c.total,
            percentage: if total > 0.0 {
                (c.total / total * 100.0).round() as u32
            } else {
                0
            },
        })
        .collect()
}

// ============================================================================
// MONTHLY ROLLUP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    pub pemasukan: f64,
    pub pengeluaran: f64,
    pub saldo: f64,
}

/// Income, expense and balance per month, most recent month first
pub fn monthly_summary(transactions: &[Transaction]) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for tx in transactions {
        let entry = months.entry(tx.month_key()).or_insert((0.0, 0.0));
        match tx.tipe {
            TransactionType::Pemasukan => entry.0 += tx.nominal,
            TransactionType::Pengeluaran => entry.1 += tx.nominal,
        }
    }

    months
        .into_iter()
        .rev()
        .map(|(month, (pemasukan, pengeluaran))| MonthlySummary {
            month,
            pemasukan,
            pengeluaran,
            saldo: pemasukan - pengeluaran,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: String,
    pub pengeluaran: f64,
}

/// Monthly expense totals, oldest month first
pub fn expense_trend(transactions: &[Transaction]) -> Vec<TrendPoint> {
    monthly_summary(transactions)
        .into_iter()
        .rev()
        .map(|m| TrendPoint {
            month: m.month,
            pengeluaran: m.pengeluaran,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transaction::NewTransaction;
    use chrono::NaiveDate;

    pub(crate) fn tx(tanggal: &str, kategori: &str, nominal: f64, tipe: TransactionType) -> Transaction {
        let date = NaiveDate::parse_from_str(tanggal, "%Y-%m-%d").unwrap();
        Transaction::from_new(NewTransaction::new(date, kategori, nominal, tipe))
    }

    use crate::transaction::TransactionType::{Pemasukan, Pengeluaran};

    #[test]
    fn test_statistics_empty() {
        assert_eq!(
            statistics(&[]),
            Statistics {
                total_transactions: 0,
                total_pemasukan: 0.0,
                total_pengeluaran: 0.0,
                avg_pemasukan: 0.0,
                avg_pengeluaran: 0.0,
                max_pemasukan: 0.0,
                max_pengeluaran: 0.0,
            }
        );
    }

    #[test]
    fn test_statistics_mixed() {
        let txs = vec![
            tx("2026-01-05", "Gaji", 1000.0, Pemasukan),
            tx("2026-01-06", "Transfer", 500.0, Pemasukan),
            tx("2026-01-10", "Makan", 400.0, Pengeluaran),
        ];
        let stats = statistics(&txs);

        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.total_pemasukan, 1500.0);
        assert_eq!(stats.avg_pemasukan, 750.0);
        assert_eq!(stats.max_pemasukan, 1000.0);
        assert_eq!(stats.avg_pengeluaran, 400.0);
        assert_eq!(stats.saldo(), 1100.0);
    }

    #[test]
    fn test_statistics_only_expenses() {
        let stats = statistics(&[tx("2026-01-10", "Makan", 400.0, Pengeluaran)]);
        assert_eq!(stats.avg_pemasukan, 0.0);
        assert_eq!(stats.max_pemasukan, 0.0);
    }

    #[test]
    fn test_statistics_serializes_camel_case() {
        let json = serde_json::to_value(statistics(&[])).unwrap();
        assert_eq!(json["totalTransactions"], 0);
        assert!(json.get("maxPengeluaran").is_some());
    }

    #[test]
    fn test_category_breakdown_sorted_descending() {
        let txs = vec![
            tx("2026-01-01", "Transport", 50.0, Pengeluaran),
            tx("2026-01-02", "Makan", 100.0, Pengeluaran),
            tx("2026-01-03", "Makan", 200.0, Pengeluaran),
            tx("2026-01-04", "Gaji", 5000.0, Pemasukan),
            tx("2026-01-05", "Transport", 50.0, Pengeluaran),
        ];
        let breakdown = category_breakdown(&txs, Pengeluaran);

        assert_eq!(
            breakdown,
            vec![
                CategoryTotal { kategori: "Makan".into(), total: 300.0 },
                CategoryTotal { kategori: "Transport".into(), total: 100.0 },
            ]
        );
    }

    #[test]
    fn test_category_breakdown_ties_keep_first_seen() {
        let txs = vec![
            tx("2026-01-01", "B", 10.0, Pengeluaran),
            tx("2026-01-02", "A", 10.0, Pengeluaran),
        ];
        let names: Vec<String> = category_breakdown(&txs, Pengeluaran)
            .into_iter()
            .map(|c| c.kategori)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_percentages() {
        let breakdown = vec![
            CategoryTotal { kategori: "Makan".into(), total: 300.0 },
            CategoryTotal { kategori: "Transport".into(), total: 100.0 },
        ];
        let shares: Vec<u32> = with_percentages(&breakdown).iter().map(|s| s.percentage).collect();
        assert_eq!(shares, vec![75, 25]);
    }

    #[test]
    fn test_percentages_may_not_sum_to_100() {
        let breakdown: Vec<CategoryTotal> = ["A", "B", "C"]
            .iter()
            .map(|k| CategoryTotal { kategori: k.to_string(), total: 1.0 })
            .collect();
        let sum: u32 = with_percentages(&breakdown).iter().map(|s| s.percentage).sum();
        assert_eq!(sum, 99);
    }

    #[test]
    fn test_percentages_zero_total() {
        let breakdown = vec![CategoryTotal { kategori: "A".into(), total: 0.0 }];
        assert_eq!(with_percentages(&breakdown)[0].percentage, 0);
    }

    #[test]
    fn test_monthly_summary_example() {
        let txs = vec![
            tx("2026-01-05", "Gaji", 1000.0, Pemasukan),
            tx("2026-01-10", "Makan", 400.0, Pengeluaran),
        ];
        assert_eq!(
            monthly_summary(&txs),
            vec![MonthlySummary {
                month: "2026-01".into(),
                pemasukan: 1000.0,
                pengeluaran: 400.0,
                saldo: 600.0,
            }]
        );
    }

    #[test]
    fn test_monthly_summary_most_recent_first() {
        let txs = vec![
            tx("2025-11-30", "Makan", 10.0, Pengeluaran),
            tx("2026-02-01", "Makan", 20.0, Pengeluaran),
            tx("2025-12-15", "Gaji", 30.0, Pemasukan),
        ];
        let months: Vec<String> = monthly_summary(&txs).into_iter().map(|m| m.month).collect();
        assert_eq!(months, vec!["2026-02", "2025-12", "2025-11"]);
    }

    #[test]
    fn test_expense_trend_oldest_first() {
        let txs = vec![
            tx("2026-02-01", "Makan", 20.0, Pengeluaran),
            tx("2026-01-01", "Makan", 10.0, Pengeluaran),
            tx("2026-01-02", "Gaji", 99.0, Pemasukan),
        ];
        assert_eq!(
            expense_trend(&txs),
            vec![
                TrendPoint { month: "2026-01".into(), pengeluaran: 10.0 },
                TrendPoint { month: "2026-02".into(), pengeluaran: 20.0 },
            ]
        );
    }
}
