//! Загрузка исходных таблиц из CSV-файлов.
//!
//! Даты разбираются сразу при загрузке: нераспознанная дата прерывает
//! работу с ошибкой [`AfishaError::DateError`].

use commons::errors::AfishaError;
use commons::models::{Event, ExchangeRate, Order};
use commons::utils::{parse_date, parse_datetime};
use log::info;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Строка файла заказов до разбора дат и категорий.
#[derive(Debug, Deserialize)]
struct RawOrder {
    order_id: u64,
    user_id: String,
    created_dt_msk: String,
    created_ts_msk: String,
    event_id: u64,
    cinema_circuit: String,
    age_limit: u8,
    currency_code: String,
    device_type_canonical: String,
    revenue: f64,
    service_name: String,
    tickets_count: i64,
    total: f64,
    days_since_prev: Option<f64>,
}

impl TryFrom<RawOrder> for Order {
    type Error = AfishaError;

    fn try_from(raw: RawOrder) -> Result<Self, Self::Error> {
        Ok(Order {
            order_id: raw.order_id,
            user_id: raw.user_id,
            created_dt_msk: parse_date("created_dt_msk", &raw.created_dt_msk)?,
            created_ts_msk: parse_datetime("created_ts_msk", &raw.created_ts_msk)?,
            event_id: raw.event_id,
            cinema_circuit: raw.cinema_circuit,
            age_limit: raw.age_limit,
            currency_code: raw.currency_code.parse()?,
            device_type_canonical: raw.device_type_canonical.parse()?,
            revenue: raw.revenue,
            service_name: raw.service_name,
            tickets_count: raw.tickets_count,
            total: raw.total,
            days_since_prev: raw.days_since_prev,
        })
    }
}

/// Строка файла курсов до разбора даты.
#[derive(Debug, Deserialize)]
struct RawRate {
    data: String,
    nominal: u32,
    curs: f64,
    cdx: String,
}

impl TryFrom<RawRate> for ExchangeRate {
    type Error = AfishaError;

    fn try_from(raw: RawRate) -> Result<Self, Self::Error> {
        Ok(ExchangeRate {
            data: parse_date("data", &raw.data)?,
            nominal: raw.nominal,
            curs: raw.curs,
            cdx: raw.cdx,
        })
    }
}

/// Прочитать все строки CSV-файла с заголовком.
fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AfishaError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let records = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(records)
}

/// Загрузить заказы.
pub fn load_orders(path: &Path) -> Result<Vec<Order>, AfishaError> {
    let orders = read_records::<RawOrder>(path)?
        .into_iter()
        .map(Order::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    info!("Загружено заказов: {} ({})", orders.len(), path.display());
    Ok(orders)
}

/// Загрузить мероприятия.
pub fn load_events(path: &Path) -> Result<Vec<Event>, AfishaError> {
    let events = read_records::<Event>(path)?;

    info!("Загружено мероприятий: {} ({})", events.len(), path.display());
    Ok(events)
}

/// Загрузить курсы валют.
pub fn load_rates(path: &Path) -> Result<Vec<ExchangeRate>, AfishaError> {
    let rates = read_records::<RawRate>(path)?
        .into_iter()
        .map(ExchangeRate::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    info!("Загружено курсов: {} ({})", rates.len(), path.display());
    Ok(rates)
}
