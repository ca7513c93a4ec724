use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use dompet::config::{config_path, init_logging, load_config};
use dompet::export::{export_file_name, template_file_name};
use dompet::format::month_label;
use dompet::normalize::{normalize_date, parse_iso_date};
use dompet::schema::{describe_errors, validate_patch, ValidationError};
use dompet::{
    category_breakdown, categories, commit, export_csv, financial_health, format_rupiah,
    format_rupiah_short, import_template, monthly_summary, parse_file, resolve_type, statistics,
    validate_transaction, with_percentages, ExportLayout, NewTransaction, RecurringFrequency,
    RowValidator, Transaction, TransactionFilter, TransactionPatch, TransactionStore,
    TransactionType,
};

#[derive(Parser, Debug)]
#[command(name = "dompet", version, about = "Personal income/expense tracker")]
struct Cli {
    /// Config file (default: $DOMPET_CONFIG or ./dompet.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import transactions from a CSV or spreadsheet file
    Import {
        file: PathBuf,

        /// Validate and report without saving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Export transactions to CSV
    Export {
        /// full (6 columns) or template (spreadsheet import layout)
        #[arg(long, default_value = "full")]
        layout: ExportLayout,

        /// Output file (default: transaksi-<today>.csv)
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Write a blank import template with sample rows
    Template {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Record a transaction
    Add {
        #[arg(long, value_parser = parse_date)]
        tanggal: NaiveDate,

        #[arg(long)]
        kategori: String,

        #[arg(long)]
        nominal: f64,

        #[arg(long, value_parser = parse_tipe)]
        tipe: TransactionType,

        #[arg(long, default_value = "")]
        keterangan: String,

        /// daily, weekly, monthly or yearly
        #[arg(long)]
        recurring: Option<RecurringFrequency>,

        /// Last date of the recurrence
        #[arg(long, value_parser = parse_date, requires = "recurring")]
        until: Option<NaiveDate>,
    },

    /// Change fields of an existing transaction
    Edit {
        id: String,

        #[arg(long, value_parser = parse_date)]
        tanggal: Option<NaiveDate>,

        #[arg(long)]
        kategori: Option<String>,

        #[arg(long)]
        nominal: Option<f64>,

        #[arg(long, value_parser = parse_tipe)]
        tipe: Option<TransactionType>,

        #[arg(long)]
        keterangan: Option<String>,

        #[arg(long, conflicts_with = "no_recurring")]
        recurring: Option<RecurringFrequency>,

        /// Stop repeating this transaction
        #[arg(long)]
        no_recurring: bool,

        #[arg(long, value_parser = parse_date)]
        until: Option<NaiveDate>,
    },

    /// Delete a transaction by id
    Delete { id: String },

    /// List transactions
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Totals, averages and maxima per type
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Income, expense and balance per month
    Monthly,

    /// Spending or income per category
    Categories {
        #[arg(long, value_parser = parse_tipe, default_value = "Pengeluaran")]
        tipe: TransactionType,
    },

    /// Financial health score
    Health,

    /// Remove every transaction
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Earliest date (inclusive)
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,

    /// Latest date (inclusive)
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,

    #[arg(long = "kategori")]
    kategori: Option<String>,

    #[arg(long = "tipe", value_parser = parse_tipe)]
    tipe: Option<TransactionType>,

    /// Case-insensitive match on kategori or keterangan
    #[arg(long)]
    search: Option<String>,
}

impl From<FilterArgs> for TransactionFilter {
    fn from(args: FilterArgs) -> Self {
        TransactionFilter {
            start_date: args.from,
            end_date: args.to,
            kategori: args.kategori,
            tipe: args.tipe,
            search_query: args.search,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_iso_date(&normalize_date(s))
        .ok_or_else(|| format!("invalid date {:?} (use YYYY-MM-DD or DD/MM/YYYY)", s))
}

fn parse_tipe(s: &str) -> Result<TransactionType, String> {
    resolve_type(s).ok_or_else(|| format!("unknown type {:?} (use Pemasukan or Pengeluaran)", s))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg_path = config_path(cli.config.as_deref());
    let cfg = load_config(&cfg_path)?;
    init_logging(&cfg.logging)?;

    let mut store = cfg.open_store()?;

    match cli.command {
        Command::Import { file, dry_run } => {
            let aliases = cfg.alias_table()?;
            run_import(store.as_mut(), &file, &aliases, dry_run)?;
        }

        Command::Export { layout, out, filter } => {
            let txs = TransactionFilter::from(filter).apply(&store.list()?);
            let csv = export_csv(&txs, layout)?;
            let out = out.unwrap_or_else(|| PathBuf::from(export_file_name(today())));
            write_output(&out, &csv)?;
            println!("✓ Exported {} transactions to {}", txs.len(), out.display());
        }

        Command::Template { out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(template_file_name(today())));
            write_output(&out, &import_template()?)?;
            println!("✓ Template written to {}", out.display());
        }

        Command::Add {
            tanggal,
            kategori,
            nominal,
            tipe,
            keterangan,
            recurring,
            until,
        } => {
            let mut new = NewTransaction::new(tanggal, kategori, nominal, tipe).with_keterangan(keterangan);
            if let Some(frequency) = recurring {
                new = new.recurring(frequency, until);
            }
            if let Err(errors) = validate_transaction(&new) {
                return Err(rejected(&errors));
            }
            let tx = store.create(new)?;
            println!("✓ Added {}", tx.id);
            print_transaction(&tx);
        }

        Command::Edit {
            id,
            tanggal,
            kategori,
            nominal,
            tipe,
            keterangan,
            recurring,
            no_recurring,
            until,
        } => {
            let mut patch = TransactionPatch {
                tanggal,
                kategori,
                keterangan,
                nominal,
                tipe,
                recurring_end_date: until.map(Some),
                ..Default::default()
            };
            if let Some(frequency) = recurring {
                patch.is_recurring = Some(true);
                patch.recurring_frequency = Some(Some(frequency));
            }
            if no_recurring {
                patch.is_recurring = Some(false);
            }
            if patch.is_empty() {
                bail!("nothing to change (pass at least one field flag)");
            }

            let current = store
                .get(&id)?
                .with_context(|| format!("transaction not found: {}", id))?;
            if let Err(errors) = validate_patch(&current, &patch) {
                return Err(rejected(&errors));
            }
            let tx = store.update(&id, &patch)?;
            println!("✓ Updated {}", tx.id);
            print_transaction(&tx);
        }

        Command::Delete { id } => {
            if !store.delete(&id)? {
                bail!("transaction not found: {}", id);
            }
            println!("✓ Deleted {}", id);
        }

        Command::List { filter } => {
            let txs = TransactionFilter::from(filter).apply(&store.list()?);
            for tx in &txs {
                print_transaction(tx);
            }
            println!("\n{} transactions", txs.len());
        }

        Command::Stats { filter } => {
            let txs = TransactionFilter::from(filter).apply(&store.list()?);
            let stats = statistics(&txs);
            println!("📊 Statistik ({} transaksi)", stats.total_transactions);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("Total pemasukan     {:>20}", format_rupiah(stats.total_pemasukan));
            println!("Total pengeluaran   {:>20}", format_rupiah(stats.total_pengeluaran));
            println!("Saldo               {:>20}", format_rupiah(stats.saldo()));
            println!("Rata-rata pemasukan {:>20}", format_rupiah(stats.avg_pemasukan));
            println!("Rata-rata keluar    {:>20}", format_rupiah(stats.avg_pengeluaran));
            println!("Maks pemasukan      {:>20}", format_rupiah(stats.max_pemasukan));
            println!("Maks pengeluaran    {:>20}", format_rupiah(stats.max_pengeluaran));
        }

        Command::Monthly => {
            for month in monthly_summary(&store.list()?) {
                println!(
                    "{:<16} +{:<12} -{:<12} = {}",
                    month_label(&month.month),
                    format_rupiah_short(month.pemasukan),
                    format_rupiah_short(month.pengeluaran),
                    format_rupiah(month.saldo)
                );
            }
        }

        Command::Categories { tipe } => {
            let txs = store.list()?;
            let shares = with_percentages(&category_breakdown(&txs, tipe));
            println!("{} per kategori", tipe);
            for share in &shares {
                println!(
                    "  {:<16} {:>18} {:>4}%",
                    share.kategori,
                    format_rupiah(share.total),
                    share.percentage
                );
            }
            println!("\nKategori tercatat: {}", categories(&txs).join(", "));
        }

        Command::Health => {
            let report = financial_health(&store.list()?);
            println!("💚 Skor: {} ({})", report.score, report.status);
            println!("Pemasukan             {}", format_rupiah(report.pemasukan));
            println!("Pengeluaran (konsumsi) {}", format_rupiah(report.konsumsi));
            println!("Tabungan (transfer)   {}", format_rupiah(report.tabungan));
            if report.has_income() {
                println!("Savings rate          {:.0}%", report.savings_rate * 100.0);
                println!("Expense ratio         {:.0}%", report.expense_ratio * 100.0);
            } else {
                println!("Tambahkan data pemasukan agar skor bisa dihitung.");
            }
        }

        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every transaction without --yes");
            }
            let count = store.count()?;
            store.clear()?;
            println!("✓ Removed {} transactions", count);
        }
    }

    Ok(())
}

fn run_import(
    store: &mut dyn TransactionStore,
    file: &Path,
    aliases: &dompet::AliasTable,
    dry_run: bool,
) -> Result<()> {
    println!("📂 Importing {}", file.display());

    let rows = parse_file(file, aliases).with_context(|| format!("parsing {}", file.display()))?;
    let result = RowValidator::new(aliases).validate(rows);

    for error in &result.errors {
        println!("❌ Baris {}: {}", error.row, error.message);
    }
    println!(
        "✓ {} valid, {} rejected (of {} rows)",
        result.valid.len(),
        result.errors.len(),
        result.total()
    );

    if dry_run {
        println!("Dry run: nothing saved");
        return Ok(());
    }

    let inserted = commit(store, &result)?;
    println!("✓ Inserted: {} transactions", inserted);
    Ok(())
}

/// One `❌` line per field on stderr; the returned error carries plain text
fn rejected(errors: &[ValidationError]) -> anyhow::Error {
    for error in errors {
        eprintln!("❌ {}", error);
    }
    anyhow!("transaction rejected: {}", describe_errors(errors))
}

fn print_transaction(tx: &Transaction) {
    let sign = if tx.is_income() { '+' } else { '-' };
    let recurring = tx
        .recurring_frequency
        .map(|f| format!(" [{}]", f))
        .unwrap_or_default();
    let short_id: String = tx.id.chars().take(8).collect();
    println!(
        "{}  {}  {:<12} {}{:>16}  {}{}",
        short_id,
        tx.tanggal.format("%d/%m/%Y"),
        tx.kategori,
        sign,
        format_rupiah(tx.nominal),
        tx.keterangan,
        recurring
    );
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("write {}", path.display()))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_error_is_plain_text() {
        let errors = vec![
            ValidationError::new("kategori", "Kategori harus diisi"),
            ValidationError::new("nominal", "Nominal harus lebih dari 0"),
        ];
        let message = rejected(&errors).to_string();

        assert!(!message.contains('❌'));
        assert_eq!(
            message,
            "transaction rejected: kategori: Kategori harus diisi; nominal: Nominal harus lebih dari 0"
        );
    }

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_date("27/01/2026").unwrap().to_string(), "2026-01-27");
        assert!(parse_date("31/02/2026").is_err());
        assert_eq!(parse_tipe("uang masuk").unwrap(), TransactionType::Pemasukan);
        assert!(parse_tipe("transfer").is_err());
    }
}
