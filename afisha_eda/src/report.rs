//! Сохранение результатов анализа и вывод сводки в консоль.
//!
//! Таблицы записываются в CSV (по одному файлу на таблицу), статистика
//! подготовки и результаты проверки гипотез — в JSON.

use crate::hypothesis::{Decision, HypothesisResult};
use crate::pipeline::{PartitionSummary, PipelineStats};
use crate::segments::Segments;
use commons::errors::AfishaError;
use commons::models::EnrichedOrder;
use commons::traits::{TableRow, render_table};
use log::{debug, info};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const CLEANED_ORDERS_FILE: &str = "cleaned_orders.csv";
pub const ORDERS_BY_MONTH_FILE: &str = "orders_by_month.csv";
pub const EVENT_TYPE_SHARES_FILE: &str = "event_type_shares.csv";
pub const DEVICE_TYPE_SHARES_FILE: &str = "device_type_shares.csv";
pub const AGE_LIMIT_SHARES_FILE: &str = "age_limit_shares.csv";
pub const TICKET_REVENUE_DELTA_FILE: &str = "ticket_revenue_delta.csv";
pub const AUTUMN_DAILY_FILE: &str = "autumn_daily.csv";
pub const AUTUMN_DAY_TYPE_FILE: &str = "autumn_day_type.csv";
pub const AUTUMN_WEEKDAY_FILE: &str = "autumn_weekday.csv";
pub const REGION_RANKING_FILE: &str = "region_ranking.csv";
pub const PARTNER_RANKING_FILE: &str = "partner_ranking.csv";
pub const DESCRIBE_FILE: &str = "describe.csv";
pub const PIPELINE_STATS_FILE: &str = "pipeline_stats.json";
pub const HYPOTHESES_FILE: &str = "hypotheses.json";

/// Всё, что попадает в отчёт.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    pub orders: &'a [EnrichedOrder],
    pub stats: &'a PipelineStats,
    pub summaries: &'a [PartitionSummary],
    pub segments: &'a Segments,
    pub hypotheses: &'a [HypothesisResult],
}

/// Записать строки в CSV-файл; заголовок берётся из имён полей.
fn write_rows<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<PathBuf, AfishaError> {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!("Записано строк: {} ({})", rows.len(), path.display());
    Ok(path)
}

/// Записать сводную таблицу в CSV. Заголовок пишется и для пустой таблицы.
fn write_table<T: Serialize + TableRow>(
    dir: &Path,
    name: &str,
    rows: &[T],
) -> Result<PathBuf, AfishaError> {
    let path = dir.join(name);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    writer.write_record(T::headers())?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!("Записано строк: {} ({})", rows.len(), path.display());
    Ok(path)
}

/// Записать значение в JSON-файл.
fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, AfishaError> {
    let path = dir.join(name);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(path)
}

/// Сохранить отчёт в каталог `dir` (создаётся при отсутствии).
///
/// ## Returns
///
/// Пути записанных файлов.
pub fn write_report(dir: &Path, report: &Report) -> Result<Vec<PathBuf>, AfishaError> {
    fs::create_dir_all(dir)?;
    let s = report.segments;

    let files = vec![
        write_rows(dir, CLEANED_ORDERS_FILE, report.orders)?,
        write_table(dir, ORDERS_BY_MONTH_FILE, &s.orders_by_month)?,
        write_table(dir, EVENT_TYPE_SHARES_FILE, &s.event_type_shares)?,
        write_table(dir, DEVICE_TYPE_SHARES_FILE, &s.device_type_shares)?,
        write_table(dir, AGE_LIMIT_SHARES_FILE, &s.age_limit_shares)?,
        write_table(dir, TICKET_REVENUE_DELTA_FILE, &s.ticket_revenue_delta)?,
        write_table(dir, AUTUMN_DAILY_FILE, &s.autumn_daily)?,
        write_table(dir, AUTUMN_DAY_TYPE_FILE, &s.autumn_day_type)?,
        write_table(dir, AUTUMN_WEEKDAY_FILE, &s.autumn_weekday)?,
        write_table(dir, REGION_RANKING_FILE, &s.region_ranking)?,
        write_table(dir, PARTNER_RANKING_FILE, &s.partner_ranking)?,
        write_table(dir, DESCRIBE_FILE, report.summaries)?,
        write_json(dir, PIPELINE_STATS_FILE, report.stats)?,
        write_json(dir, HYPOTHESES_FILE, report.hypotheses)?,
    ];

    info!("Отчёт сохранён: {} ({} файлов)", dir.display(), files.len());
    Ok(files)
}

/// Вывод по гипотезе человеческим языком.
fn verdict(res: &HypothesisResult) -> String {
    match (res.decision, res.p_value) {
        (Decision::Reject, Some(p)) => format!(
            "{}: p-value = {:.4} <= {}, нулевая гипотеза отвергается, у mobile значения выше",
            res.metric, p, res.alpha
        ),
        (Decision::FailToReject, Some(p)) => format!(
            "{}: p-value = {:.4} > {}, нулевая гипотеза не отвергается",
            res.metric, p, res.alpha
        ),
        _ => format!(
            "{}: критерий не определён (когорты: {} и {})",
            res.metric, res.cohort_a_size, res.cohort_b_size
        ),
    }
}

/// Сформировать текстовую сводку: первые `top` строк каждой таблицы и
/// выводы по гипотезам.
pub fn console_summary(report: &Report, top: usize) -> String {
    let s = report.segments;
    let st = report.stats;

    let sections = [
        ("Описательные статистики (до отсечения выбросов)", render_table(report.summaries, top)),
        ("Заказы по месяцам", render_table(&s.orders_by_month, top)),
        ("Доли типов мероприятий: лето / осень", render_table(&s.event_type_shares, top)),
        ("Доли типов устройств: лето / осень", render_table(&s.device_type_shares, top)),
        ("Доли возрастных ограничений: лето / осень", render_table(&s.age_limit_shares, top)),
        ("Выручка с билета: лето / осень", render_table(&s.ticket_revenue_delta, top)),
        ("Осень: по дням", render_table(&s.autumn_daily, top)),
        ("Осень: будни и выходные", render_table(&s.autumn_day_type, top)),
        ("Осень: по дням недели", render_table(&s.autumn_weekday, top)),
        ("Топ регионов", render_table(&s.region_ranking, top)),
        ("Топ партнёров", render_table(&s.partner_ranking, top)),
        ("Гипотезы", render_table(report.hypotheses, top)),
    ];

    let mut out = format!(
        "Заказов: загружено {}, после очистки {} (выбросов {}, дубликатов {}, без категорий {}, без курса {})\n",
        st.orders_loaded,
        st.final_rows,
        st.outliers_dropped,
        st.exact_duplicates + st.reissued_duplicates,
        st.unclassified_dropped,
        st.orders_missing_rate
    );
    for (title, table) in sections {
        out.push_str(&format!("\n== {title} ==\n{table}"));
    }
    out.push('\n');
    for res in report.hypotheses {
        out.push_str(&verdict(res));
        out.push('\n');
    }
    out
}
