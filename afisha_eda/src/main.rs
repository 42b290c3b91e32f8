//! Afisha EDA. Консольное приложение исследовательского анализа продаж
//! билетов: загрузка заказов, мероприятий и курсов тенге, очистка и
//! объединение данных, сводные таблицы по сезонам, регионам и партнёрам,
//! проверка гипотез об активности пользователей mobile и desktop.

#![warn(missing_docs)]

use commons::errors::AfishaError;
use commons::models::{Event, ExchangeRate, Order};
use commons::utils::get_workspace_root;
use log::{LevelFilter, info};

mod cli;
mod config;
#[cfg(test)]
mod fixtures;
mod hypothesis;
mod loader;
mod pipeline;
mod report;
mod segments;

use cli::{ExitCode, RunSet, exit_err, parse_cli_args};
use commons::init_simple_logger;
use config::LOG_FOLDER;
use pipeline::PipelineSettings;
use report::Report;

fn main() {
    let settings = parse_cli_args();

    // Инициализация логгера.
    init_logger(settings.verbose);
    info!("Afisha EDA запущен: {}", settings);

    run(&settings);
}

/// Выполнить анализ от загрузки данных до сохранения отчёта.
fn run(settings: &RunSet) {
    let (orders, events, rates) = load_inputs(settings)
        .unwrap_or_else(|e| exit_err(&e.to_string(), ExitCode::InvalidInput));

    let pipeline_settings = PipelineSettings {
        quantile: settings.quantile,
        missing_rate: settings.missing_rate,
    };
    let prepared = pipeline::prepare(&orders, &events, &rates, pipeline_settings)
        .unwrap_or_else(|e| exit_err(&e.to_string(), ExitCode::PipelineFailure));

    let segments = segments::build_segments(&prepared.orders);
    let hypotheses = hypothesis::test_hypotheses(&prepared.orders, settings.alpha);

    let report = Report {
        orders: &prepared.orders,
        stats: &prepared.stats,
        summaries: &prepared.summaries,
        segments: &segments,
        hypotheses: &hypotheses,
    };

    println!("{}", report::console_summary(&report, settings.top));

    let files = report::write_report(&settings.output_dir, &report)
        .unwrap_or_else(|e| exit_err(&e.to_string(), ExitCode::ReportFailure));
    println!(
        "Отчёт сохранён в {} (файлов: {})",
        settings.output_dir.display(),
        files.len()
    );
}

/// Загрузить три исходные таблицы.
fn load_inputs(settings: &RunSet) -> Result<(Vec<Order>, Vec<Event>, Vec<ExchangeRate>), AfishaError> {
    let orders = loader::load_orders(&settings.orders_path)?;
    let events = loader::load_events(&settings.events_path)?;
    let rates = loader::load_rates(&settings.rates_path)?;
    Ok((orders, events, rates))
}

/// Инициализировать логгер приложения.
///
/// Используется метод [`init_simple_logger`] из крейта [`commons`].
fn init_logger(verbose: bool) {
    let log_folder = get_workspace_root().join(LOG_FOLDER);
    let app_name = env!("CARGO_PKG_NAME");
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    init_simple_logger(app_name, log_folder, level);
}
