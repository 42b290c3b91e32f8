//! Подготовка данных: объединение источников, конвертация валюты, очистка
//! и расчёт производных полей.
//!
//! Каждый шаг — функция, принимающая таблицу (вектор строк) и
//! возвращающая новую. Порядок шагов важен: квантили выбросов считаются
//! до удаления дубликатов, а производные поля — после.

use crate::config::{FOREIGN_CURRENCY, RATE_NOMINAL, REPORTING_CURRENCY};
use chrono::{Datelike, NaiveDate};
use commons::errors::AfishaError;
use commons::models::{Currency, EnrichedOrder, Event, ExchangeRate, Order, Season};
use commons::stats::{Summary, describe, quantile};
use commons::traits::TableRow;
use log::{debug, info, warn};
use macros::{EnumDisplay, TableRow};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Что делать с заказом в иностранной валюте, для даты которого нет курса.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingRatePolicy {
    /// Исключить заказ и учесть его в статистике.
    #[str("drop")]
    Drop,
    /// Прервать подготовку данных с ошибкой.
    #[str("fail")]
    Fail,
}

/// Параметры подготовки данных.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Уровень квантиля для отсечения выбросов.
    pub quantile: f64,
    pub missing_rate: MissingRatePolicy,
}

/// Заказ, объединённый с мероприятием и курсом на дату заказа.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedOrder {
    pub order: Order,
    pub event: Option<Event>,
    pub curs: Option<f64>,
}

/// Заказ с выручкой в валюте отчётности.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedOrder {
    pub order: Order,
    pub event: Option<Event>,
    pub revenue_rub: f64,
}

/// Заказ с обязательными категориями: типом мероприятия и регионом.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedOrder {
    pub order: Order,
    pub event: Event,
    pub event_type_main: String,
    pub region_name: String,
    pub revenue_rub: f64,
}

impl ClassifiedOrder {
    /// Значения всех столбцов, кроме идентификатора заказа.
    fn identity_fields(&self) -> Vec<String> {
        let o = &self.order;
        let e = &self.event;
        vec![
            o.user_id.clone(),
            o.created_dt_msk.to_string(),
            o.created_ts_msk.to_string(),
            o.event_id.to_string(),
            o.cinema_circuit.clone(),
            o.age_limit.to_string(),
            o.currency_code.to_string(),
            o.device_type_canonical.to_string(),
            format!("{:?}", o.revenue),
            o.service_name.clone(),
            o.tickets_count.to_string(),
            format!("{:?}", o.total),
            format!("{:?}", o.days_since_prev),
            e.event_name.clone(),
            format!("{:?}", e.event_type_description),
            self.event_type_main.clone(),
            e.organizers.clone(),
            self.region_name.clone(),
            e.city_name.clone(),
            e.city_id.to_string(),
            e.venue_id.to_string(),
            e.venue_name.clone(),
            e.venue_address.clone(),
            format!("{:?}", self.revenue_rub),
        ]
    }

    /// Ключ строки для поиска дубликатов.
    fn dedup_key(&self, with_order_id: bool) -> String {
        let mut fields = self.identity_fields();
        if with_order_id {
            fields.insert(0, self.order.order_id.to_string());
        }
        fields.join("\u{1f}")
    }
}

/// Пороги отсечения выбросов для одной валюты.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierThreshold {
    pub currency: Currency,
    pub rows_before: usize,
    pub revenue_cap: f64,
    /// Порог по количеству билетов (только для валюты отчётности).
    pub tickets_cap: Option<f64>,
    pub dropped: usize,
}

/// Описательные статистики столбца в разрезе валюты (до отсечения выбросов).
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct PartitionSummary {
    pub currency: Currency,
    pub metric: String,
    pub count: usize,
    #[precision(2)]
    pub mean: f64,
    #[precision(2)]
    pub std: Option<f64>,
    #[precision(2)]
    pub min: f64,
    #[precision(2)]
    pub p25: f64,
    #[precision(2)]
    pub p50: f64,
    #[precision(2)]
    pub p75: f64,
    #[precision(2)]
    pub max: f64,
    /// Количество отрицательных значений (возвраты).
    pub negative: usize,
}

impl PartitionSummary {
    fn new(currency: Currency, metric: &str, summary: Summary, negative: usize) -> Self {
        Self {
            currency,
            metric: metric.to_string(),
            count: summary.count,
            mean: summary.mean,
            std: summary.std,
            min: summary.min,
            p25: summary.p25,
            p50: summary.p50,
            p75: summary.p75,
            max: summary.max,
            negative,
        }
    }
}

/// Статистика подготовки данных.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub orders_loaded: usize,
    pub events_loaded: usize,
    pub rates_loaded: usize,
    pub orders_without_event: usize,
    pub orders_missing_rate: usize,
    pub unclassified_dropped: usize,
    pub thresholds: Vec<OutlierThreshold>,
    pub outliers_dropped: usize,
    pub exact_duplicates: usize,
    pub reissued_duplicates: usize,
    pub final_rows: usize,
}

/// Результат подготовки данных.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub orders: Vec<EnrichedOrder>,
    pub stats: PipelineStats,
    pub summaries: Vec<PartitionSummary>,
}

/// Объединить заказы с мероприятиями (по `event_id`) и курсами (по дате
/// заказа). Соединения левые: заказ без пары сохраняется с пустыми
/// полями, при нескольких парах строка повторяется для каждой.
pub fn join_sources(
    orders: &[Order],
    events: &[Event],
    rates: &[ExchangeRate],
) -> Vec<MergedOrder> {
    let mut events_by_id: HashMap<u64, Vec<&Event>> = HashMap::new();
    for event in events {
        events_by_id.entry(event.event_id).or_default().push(event);
    }

    let mut rates_by_date: HashMap<NaiveDate, Vec<f64>> = HashMap::new();
    for rate in rates {
        rates_by_date.entry(rate.data).or_default().push(rate.curs);
    }

    let mut merged = Vec::with_capacity(orders.len());
    for order in orders {
        let matched_events: Vec<Option<&Event>> = match events_by_id.get(&order.event_id) {
            Some(found) => found.iter().map(|e| Some(*e)).collect(),
            None => vec![None],
        };
        let matched_rates: Vec<Option<f64>> = match rates_by_date.get(&order.created_dt_msk) {
            Some(found) => found.iter().map(|c| Some(*c)).collect(),
            None => vec![None],
        };

        for event in &matched_events {
            for curs in &matched_rates {
                merged.push(MergedOrder {
                    order: order.clone(),
                    event: event.cloned(),
                    curs: *curs,
                });
            }
        }
    }

    debug!("Объединено строк: {}", merged.len());
    merged
}

/// Выручка заказа в валюте отчётности.
///
/// `None`, если заказ в иностранной валюте, а курса на его дату нет.
pub fn revenue_in_reporting(order: &Order, curs: Option<f64>) -> Option<f64> {
    if order.currency_code == FOREIGN_CURRENCY {
        curs.map(|rate| order.revenue * rate / RATE_NOMINAL)
    } else {
        Some(order.revenue)
    }
}

/// Перевести выручку в валюту отчётности.
///
/// ## Ошибки
///
/// [`AfishaError::MissingRate`] для заказа без курса, если выбрана политика
/// [`MissingRatePolicy::Fail`]. При [`MissingRatePolicy::Drop`] такие заказы
/// исключаются с предупреждением в логе.
pub fn convert_currency(
    rows: Vec<MergedOrder>,
    policy: MissingRatePolicy,
) -> Result<Vec<ConvertedOrder>, AfishaError> {
    let mut converted = Vec::with_capacity(rows.len());

    for row in rows {
        match revenue_in_reporting(&row.order, row.curs) {
            Some(revenue_rub) => converted.push(ConvertedOrder {
                order: row.order,
                event: row.event,
                revenue_rub,
            }),
            None => match policy {
                MissingRatePolicy::Drop => {
                    warn!(
                        "Нет курса {} на {}: заказ {} исключён",
                        row.order.currency_code, row.order.created_dt_msk, row.order.order_id
                    );
                }
                MissingRatePolicy::Fail => {
                    return Err(AfishaError::MissingRate {
                        order_id: row.order.order_id,
                        date: row.order.created_dt_msk.to_string(),
                    });
                }
            },
        }
    }

    Ok(converted)
}

/// Исключить заказы без типа мероприятия или региона.
pub fn drop_unclassified(rows: Vec<ConvertedOrder>) -> Vec<ClassifiedOrder> {
    rows.into_iter()
        .filter_map(|row| {
            let event = row.event?;
            let event_type_main = event.event_type_main.clone()?;
            let region_name = event.region_name.clone()?;
            Some(ClassifiedOrder {
                order: row.order,
                event,
                event_type_main,
                region_name,
                revenue_rub: row.revenue_rub,
            })
        })
        .collect()
}

/// Описательные статистики выручки и количества билетов по валютам.
pub fn describe_partitions(rows: &[ClassifiedOrder]) -> Vec<PartitionSummary> {
    let mut summaries = Vec::new();

    for currency in Currency::ALL {
        let part: Vec<&ClassifiedOrder> = rows
            .iter()
            .filter(|r| r.order.currency_code == *currency)
            .collect();

        let revenue: Vec<f64> = part.iter().map(|r| r.order.revenue).collect();
        let tickets: Vec<f64> = part.iter().map(|r| r.order.tickets_count as f64).collect();

        for (metric, values) in [("revenue", revenue), ("tickets_count", tickets)] {
            if let Some(summary) = describe(&values) {
                let negative = values.iter().filter(|v| **v < 0.0).count();
                summaries.push(PartitionSummary::new(*currency, metric, summary, negative));
            }
        }
    }

    summaries
}

/// Отсечь выбросы отдельно для каждой валюты.
///
/// Остаются заказы с положительной выручкой не выше квантиля выручки своей
/// валюты и положительным количеством билетов. Для валюты отчётности
/// количество билетов дополнительно ограничено своим квантилем; для
/// иностранной валюты этот порог не применяется.
///
/// Результат — строки валюты отчётности, затем иностранной, с сохранением
/// исходного порядка внутри каждой части.
pub fn truncate_outliers(
    rows: Vec<ClassifiedOrder>,
    level: f64,
) -> (Vec<ClassifiedOrder>, Vec<OutlierThreshold>) {
    let mut partitions: HashMap<Currency, Vec<ClassifiedOrder>> = HashMap::new();
    for row in rows {
        partitions
            .entry(row.order.currency_code)
            .or_default()
            .push(row);
    }

    let mut kept = Vec::new();
    let mut thresholds = Vec::new();

    for currency in Currency::ALL {
        let Some(part) = partitions.remove(currency) else {
            continue;
        };

        let revenue: Vec<f64> = part.iter().map(|r| r.order.revenue).collect();
        let Some(revenue_cap) = quantile(&revenue, level) else {
            continue;
        };
        let tickets_cap = if *currency == REPORTING_CURRENCY {
            let tickets: Vec<f64> = part.iter().map(|r| r.order.tickets_count as f64).collect();
            quantile(&tickets, level)
        } else {
            None
        };

        let rows_before = part.len();
        let retained: Vec<ClassifiedOrder> = part
            .into_iter()
            .filter(|r| {
                let revenue_ok = r.order.revenue > 0.0 && r.order.revenue <= revenue_cap;
                let tickets_ok = r.order.tickets_count > 0
                    && tickets_cap.is_none_or(|cap| r.order.tickets_count as f64 <= cap);
                revenue_ok && tickets_ok
            })
            .collect();

        debug!(
            "Выбросы {}: порог выручки {:.2}, порог билетов {:?}, исключено {}",
            currency,
            revenue_cap,
            tickets_cap,
            rows_before - retained.len()
        );

        thresholds.push(OutlierThreshold {
            currency: *currency,
            rows_before,
            revenue_cap,
            tickets_cap,
            dropped: rows_before - retained.len(),
        });
        kept.extend(retained);
    }

    (kept, thresholds)
}

/// Оставить первое вхождение каждой строки по ключу.
fn keep_first(rows: Vec<ClassifiedOrder>, with_order_id: bool) -> Vec<ClassifiedOrder> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert(row.dedup_key(with_order_id)))
        .collect()
}

/// Удалить полные дубликаты строк.
pub fn drop_exact_duplicates(rows: Vec<ClassifiedOrder>) -> Vec<ClassifiedOrder> {
    keep_first(rows, true)
}

/// Удалить строки, совпадающие во всех столбцах, кроме `order_id`
/// (повторно выпущенные заказы). Сохраняется первое вхождение.
pub fn drop_reissued_duplicates(rows: Vec<ClassifiedOrder>) -> Vec<ClassifiedOrder> {
    keep_first(rows, false)
}

/// Рассчитать производные поля: выручку с билета, месяц и сезон.
pub fn derive_fields(rows: Vec<ClassifiedOrder>) -> Vec<EnrichedOrder> {
    rows.into_iter()
        .map(|row| {
            let ClassifiedOrder {
                order,
                event,
                event_type_main,
                region_name,
                revenue_rub,
            } = row;
            let month = order.created_dt_msk.month();

            EnrichedOrder {
                one_ticket_revenue_rub: revenue_rub / order.tickets_count as f64,
                month,
                season: Season::from_month(month),
                order_id: order.order_id,
                user_id: order.user_id,
                created_dt_msk: order.created_dt_msk,
                created_ts_msk: order.created_ts_msk,
                event_id: order.event_id,
                cinema_circuit: order.cinema_circuit,
                age_limit: order.age_limit,
                currency_code: order.currency_code,
                device_type_canonical: order.device_type_canonical,
                revenue: order.revenue,
                service_name: order.service_name,
                tickets_count: order.tickets_count,
                total: order.total,
                days_since_prev: order.days_since_prev,
                event_name: event.event_name,
                event_type_description: event.event_type_description,
                event_type_main,
                organizers: event.organizers,
                region_name,
                city_name: event.city_name,
                city_id: event.city_id,
                venue_id: event.venue_id,
                venue_name: event.venue_name,
                venue_address: event.venue_address,
                revenue_rub,
            }
        })
        .collect()
}

/// Полный цикл подготовки данных.
pub fn prepare(
    orders: &[Order],
    events: &[Event],
    rates: &[ExchangeRate],
    settings: PipelineSettings,
) -> Result<Prepared, AfishaError> {
    let mut stats = PipelineStats {
        orders_loaded: orders.len(),
        events_loaded: events.len(),
        rates_loaded: rates.len(),
        ..Default::default()
    };

    let merged = join_sources(orders, events, rates);
    stats.orders_without_event = merged.iter().filter(|r| r.event.is_none()).count();

    let merged_len = merged.len();
    let converted = convert_currency(merged, settings.missing_rate)?;
    stats.orders_missing_rate = merged_len - converted.len();

    let converted_len = converted.len();
    let classified = drop_unclassified(converted);
    stats.unclassified_dropped = converted_len - classified.len();
    info!(
        "Без мероприятия: {}, без курса: {}, без типа или региона: {}",
        stats.orders_without_event, stats.orders_missing_rate, stats.unclassified_dropped
    );

    let summaries = describe_partitions(&classified);

    let (truncated, thresholds) = truncate_outliers(classified, settings.quantile);
    stats.outliers_dropped = thresholds.iter().map(|t| t.dropped).sum();
    stats.thresholds = thresholds;
    info!("Исключено выбросов: {}", stats.outliers_dropped);

    let truncated_len = truncated.len();
    let unique = drop_exact_duplicates(truncated);
    stats.exact_duplicates = truncated_len - unique.len();

    let unique_len = unique.len();
    let unique = drop_reissued_duplicates(unique);
    stats.reissued_duplicates = unique_len - unique.len();
    info!(
        "Удалено дубликатов: полных {}, без учёта order_id {}",
        stats.exact_duplicates, stats.reissued_duplicates
    );

    let enriched = derive_fields(unique);
    stats.final_rows = enriched.len();
    info!("Подготовлено заказов: {}", stats.final_rows);

    Ok(Prepared {
        orders: enriched,
        stats,
        summaries,
    })
}
