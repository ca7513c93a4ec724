// 💚 Financial health score
// A 0-100 score from savings rate and expense ratio. Expenses in the
// "Tabungan" category count as savings transfers, not consumption.

use crate::stats::statistics;
use crate::transaction::{Transaction, TransactionType};
use serde::Serialize;
use std::fmt;

pub const SAVINGS_CATEGORY: &str = "tabungan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    #[serde(rename = "Sangat Sehat")]
    SangatSehat,
    Sehat,
    Cukup,
    #[serde(rename = "Perlu Perhatian")]
    PerluPerhatian,
}

impl HealthStatus {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => HealthStatus::SangatSehat,
            60..=79 => HealthStatus::Sehat,
            40..=59 => HealthStatus::Cukup,
            _ => HealthStatus::PerluPerhatian,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::SangatSehat => "Sangat Sehat",
            HealthStatus::Sehat => "Sehat",
            HealthStatus::Cukup => "Cukup",
            HealthStatus::PerluPerhatian => "Perlu Perhatian",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub score: u32,
    pub status: HealthStatus,
    pub pemasukan: f64,
    /// Expenses minus savings transfers, floored at 0
    pub konsumsi: f64,
    pub tabungan: f64,
    pub savings_rate: f64,
    pub expense_ratio: f64,
}

impl HealthReport {
    pub fn has_income(&self) -> bool {
        self.pemasukan > 0.0
    }
}

pub fn financial_health(transactions: &[Transaction]) -> HealthReport {
    let stats = statistics(transactions);
    let pemasukan = stats.total_pemasukan;

    let tabungan: f64 = transactions
        .iter()
        .filter(|t| t.tipe == TransactionType::Pengeluaran)
        .filter(|t| t.kategori.to_lowercase() == SAVINGS_CATEGORY)
        .map(|t| t.nominal)
        .sum();
    let konsumsi = (stats.total_pengeluaran - tabungan).max(0.0);

    let (savings_rate, expense_ratio) = if pemasukan > 0.0 {
        ((pemasukan - konsumsi) / pemasukan, konsumsi / pemasukan)
    } else {
        (0.0, 1.0)
    };

    let score = if pemasukan <= 0.0 {
        0
    } else {
        let sr_score = ((savings_rate + 0.2) / 0.7).clamp(0.0, 1.0) * 70.0;
        let er_penalty = ((expense_ratio - 0.8) / 0.6).clamp(0.0, 1.0) * 30.0;
        (sr_score - er_penalty + 30.0).round().clamp(0.0, 100.0) as u32
    };

    HealthReport {
        score,
        status: HealthStatus::from_score(score),
        pemasukan,
        konsumsi,
        tabungan,
        savings_rate,
        expense_ratio,
    }
}
