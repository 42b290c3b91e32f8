//! Обработка аргументов командной строки при запуске приложения.
//!
//! Пользователь может указать:
//! - пути к файлам заказов, мероприятий и курсов валют
//! - каталог для сохранения отчёта
//! - параметры анализа (уровень значимости, квантиль выбросов и т.д.)
//!
//! ## Пример
//!
//! ```text
//! $ afisha --orders data/orders.csv --output report --alpha 0.05
//! ```

use crate::config::*;
use crate::pipeline::MissingRatePolicy;
use clap::Parser;
use commons::utils::get_workspace_root;
use log::error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::process::exit;
use std::str::FromStr;

/// Перечисление ошибок при завершении приложения.
#[derive(Copy, Clone, Debug)]
#[repr(u8)]
pub enum ExitCode {
    /// Ошибка чтения или разбора входных данных.
    InvalidInput = 1,
    /// Ошибка подготовки данных.
    PipelineFailure,
    /// Ошибка сохранения отчёта.
    ReportFailure,
}

impl ExitCode {
    /// Предоставить цифровое значение выбранного перечисления (`u8`).
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Parser)]
#[command(about = "Afisha EDA. Cleans ticket orders, builds segment tables and tests device hypotheses.")]
#[command(author, version, long_about = None)]
struct CliArgs {
    /// Orders CSV file (default: data/final_tickets_orders_df.csv).
    #[arg(long, value_name = "FILE")]
    orders: Option<PathBuf>,

    /// Events CSV file (default: data/final_tickets_events_df.csv).
    #[arg(long, value_name = "FILE")]
    events: Option<PathBuf>,

    /// KZT exchange rates CSV file (default: data/final_tickets_tenge_df.csv).
    #[arg(long, value_name = "FILE")]
    rates: Option<PathBuf>,

    /// Directory for report files (default: report).
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Significance level for hypothesis tests.
    #[arg(short, long, default_value_t = ALPHA, value_parser = validate_alpha)]
    alpha: f64,

    /// Quantile used as the outlier cap.
    #[arg(short, long, default_value_t = OUTLIER_QUANTILE, value_parser = validate_quantile)]
    quantile: f64,

    /// What to do with KZT orders that have no exchange rate: drop or fail.
    #[arg(long, default_value_t = MissingRatePolicy::Drop, value_parser = validate_policy)]
    missing_rate: MissingRatePolicy,

    /// Number of rows of each table printed to the console.
    #[arg(short, long, default_value_t = DEFAULT_TOP, value_parser = validate_top)]
    top: usize,

    /// Write debug messages to the log file.
    #[arg(short, long)]
    verbose: bool,
}

/// Валидатор для числовых значений в допустимом диапазоне.
fn value_in_range<T>(s: &str, range: RangeInclusive<T>) -> Result<T, String>
where
    T: FromStr + PartialOrd + Display,
{
    let value: T = s.parse().map_err(|_| format!("invalid number: {s}"))?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "value {} not in range {} — {}",
            s,
            range.start(),
            range.end()
        ))
    }
}

/// Валидатор для поля `alpha`.
fn validate_alpha(s: &str) -> Result<f64, String> {
    value_in_range(s, ALPHA_ALLOWED)
}

/// Валидатор для поля `quantile`.
fn validate_quantile(s: &str) -> Result<f64, String> {
    value_in_range(s, QUANTILE_ALLOWED)
}

/// Валидатор для поля `top`.
fn validate_top(s: &str) -> Result<usize, String> {
    value_in_range(s, TOP_ALLOWED)
}

/// Валидатор для поля `missing_rate`.
fn validate_policy(s: &str) -> Result<MissingRatePolicy, String> {
    s.parse().map_err(|e| format!("{e}"))
}

/// Параметры, полученные из командной строки при запуске приложения.
#[derive(Debug)]
pub struct RunSet {
    /// Файл заказов.
    pub orders_path: PathBuf,
    /// Файл мероприятий.
    pub events_path: PathBuf,
    /// Файл курсов тенге.
    pub rates_path: PathBuf,
    /// Каталог для отчёта.
    pub output_dir: PathBuf,
    /// Уровень значимости.
    pub alpha: f64,
    /// Квантиль отсечения выбросов.
    pub quantile: f64,
    /// Политика для заказов в тенге без курса.
    pub missing_rate: MissingRatePolicy,
    /// Строк каждой таблицы в консоли.
    pub top: usize,
    /// Подробное логирование.
    pub verbose: bool,
}

impl Display for RunSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "orders: {} | events: {} | rates: {} | output: {} | alpha: {} | quantile: {} | missing rate: {}",
            self.orders_path.display(),
            self.events_path.display(),
            self.rates_path.display(),
            self.output_dir.display(),
            self.alpha,
            self.quantile,
            self.missing_rate
        )
    }
}

impl RunSet {
    /// Сформировать экземпляр [`RunSet`] на основе данных из командной
    /// строки. Неуказанные пути берутся относительно корня проекта.
    fn new(args: CliArgs) -> Self {
        let data_dir = get_workspace_root().join(DATA_FOLDER);

        Self {
            orders_path: args.orders.unwrap_or_else(|| data_dir.join(ORDERS_FILENAME)),
            events_path: args.events.unwrap_or_else(|| data_dir.join(EVENTS_FILENAME)),
            rates_path: args.rates.unwrap_or_else(|| data_dir.join(RATES_FILENAME)),
            output_dir: args
                .output
                .unwrap_or_else(|| get_workspace_root().join(REPORT_FOLDER)),
            alpha: args.alpha,
            quantile: args.quantile,
            missing_rate: args.missing_rate,
            top: args.top,
            verbose: args.verbose,
        }
    }
}

/// Получить от пользователя первичные настройки приложения.
///
/// Гарантировано, что числовые параметры находятся в допустимых пределах
/// (но не гарантируется, что файлы по указанным путям существуют).
pub fn parse_cli_args() -> RunSet {
    let args = CliArgs::parse();

    RunSet::new(args)
}

/// Опубликовать сообщение об ошибке и завершить работу приложения.
pub fn exit_err(message: &str, code: ExitCode) -> ! {
    error!("Ошибка: {} (код {})", message, code.value());
    eprintln!("Ошибка: {}", message);
    exit(code.value() as i32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_validator_accepts_default() {
        assert_eq!(validate_alpha("0.05"), Ok(0.05));
    }

    #[test]
    fn alpha_validator_rejects_out_of_range() {
        assert!(validate_alpha("0.7").is_err());
        assert!(validate_alpha("0").is_err());
        assert!(validate_alpha("abc").is_err());
    }

    #[test]
    fn quantile_validator_bounds() {
        assert!(validate_quantile("0.99").is_ok());
        assert!(validate_quantile("1.0").is_ok());
        assert!(validate_quantile("1.01").is_err());
    }

    #[test]
    fn top_validator_rejects_zero() {
        assert!(validate_top("0").is_err());
        assert_eq!(validate_top("10"), Ok(10));
    }

    #[test]
    fn defaults_point_to_workspace_data() {
        let args = CliArgs::parse_from(["afisha"]);
        let set = RunSet::new(args);

        let data_dir = get_workspace_root().join(DATA_FOLDER);
        assert_eq!(set.orders_path, data_dir.join(ORDERS_FILENAME));
        assert_eq!(set.rates_path, data_dir.join(RATES_FILENAME));
        assert_eq!(set.output_dir, get_workspace_root().join(REPORT_FOLDER));
        assert_eq!(set.alpha, ALPHA);
        assert_eq!(set.missing_rate, MissingRatePolicy::Drop);
        assert_eq!(set.top, DEFAULT_TOP);
    }

    #[test]
    fn explicit_arguments_override_defaults() {
        let args = CliArgs::parse_from([
            "afisha",
            "--orders",
            "/tmp/o.csv",
            "--output",
            "/tmp/out",
            "--alpha",
            "0.01",
            "--missing-rate",
            "fail",
            "--top",
            "5",
        ]);
        let set = RunSet::new(args);

        assert_eq!(set.orders_path, PathBuf::from("/tmp/o.csv"));
        assert_eq!(set.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(set.alpha, 0.01);
        assert_eq!(set.missing_rate, MissingRatePolicy::Fail);
        assert_eq!(set.top, 5);
    }

    #[test]
    fn invalid_policy_is_rejected_by_parser() {
        let res = CliArgs::try_parse_from(["afisha", "--missing-rate", "impute"]);
        assert!(res.is_err());
    }
}
