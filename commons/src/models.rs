//! Модели данных для приложений.

use crate::errors::AfishaError;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use macros::EnumDisplay;
use serde::{Deserialize, Serialize};

/// Валюта оплаты заказа.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumDisplay, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// Российский рубль, валюта отчётности.
    #[str("rub")]
    Rub,
    /// Казахстанский тенге.
    #[str("kzt")]
    Kzt,
}

/// Тип устройства, с которого оформлен заказ.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumDisplay, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Мобильное устройство.
    #[str("mobile")]
    Mobile,
    /// Стационарное устройство.
    #[str("desktop")]
    Desktop,
}

/// Сезон года, вычисляемый по месяцу заказа.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumDisplay, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    #[str("winter")]
    Winter,
    #[str("spring")]
    Spring,
    #[str("summer")]
    Summer,
    #[str("autumn")]
    Autumn,
}

impl Season {
    /// Сезон для номера месяца (1–12).
    ///
    /// Декабрь, январь и февраль — зима, март–май — весна, июнь–август —
    /// лето, всё остальное — осень.
    pub fn from_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }
}

/// Тип дня недели: будни или выходные.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumDisplay, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    #[str("weekday")]
    Weekday,
    #[str("weekend")]
    Weekend,
}

impl DayType {
    /// Суббота и воскресенье — выходные, остальные дни — будни.
    pub fn from_weekday(day: Weekday) -> DayType {
        match day {
            Weekday::Sat | Weekday::Sun => DayType::Weekend,
            _ => DayType::Weekday,
        }
    }
}

/// Заказ билетов: одна покупка пользователя.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Уникальный идентификатор заказа.
    pub order_id: u64,
    /// Идентификатор пользователя.
    pub user_id: String,
    /// Дата создания заказа (московское время).
    pub created_dt_msk: NaiveDate,
    /// Дата и время создания заказа (московское время).
    pub created_ts_msk: NaiveDateTime,
    /// Идентификатор мероприятия.
    pub event_id: u64,
    /// Сеть кинотеатров ("нет", если не применимо).
    pub cinema_circuit: String,
    /// Возрастное ограничение мероприятия.
    pub age_limit: u8,
    /// Валюта оплаты.
    pub currency_code: Currency,
    /// Тип устройства.
    pub device_type_canonical: DeviceType,
    /// Выручка от заказа в валюте оплаты (до очистки может быть < 0).
    pub revenue: f64,
    /// Билетный оператор (партнёр).
    pub service_name: String,
    /// Количество билетов в заказе.
    pub tickets_count: i64,
    /// Общая сумма заказа.
    pub total: f64,
    /// Дней с предыдущей покупки; `None` — первая покупка.
    pub days_since_prev: Option<f64>,
}

/// Мероприятие, на которое ссылаются заказы.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    pub event_id: u64,
    pub event_name: String,
    pub event_type_description: Option<String>,
    /// Основной тип мероприятия: концерт, театр и т.д.
    pub event_type_main: Option<String>,
    pub organizers: String,
    pub region_name: Option<String>,
    pub city_name: String,
    pub city_id: u64,
    pub venue_id: u64,
    pub venue_name: String,
    pub venue_address: String,
}

/// Курс иностранной валюты к рублю на дату.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    /// Дата курса.
    pub data: NaiveDate,
    /// Номинал (100 единиц валюты).
    pub nominal: u32,
    /// Рублей за `nominal` единиц валюты.
    pub curs: f64,
    /// Обозначение валюты.
    pub cdx: String,
}

/// Очищенный и обогащённый заказ — единица всего последующего анализа.
///
/// Содержит поля заказа, поля мероприятия (тип и регион обязательны),
/// выручку в рублях и производные поля.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedOrder {
    pub order_id: u64,
    pub user_id: String,
    pub created_dt_msk: NaiveDate,
    pub created_ts_msk: NaiveDateTime,
    pub event_id: u64,
    pub cinema_circuit: String,
    pub age_limit: u8,
    pub currency_code: Currency,
    pub device_type_canonical: DeviceType,
    pub revenue: f64,
    pub service_name: String,
    pub tickets_count: i64,
    pub total: f64,
    pub days_since_prev: Option<f64>,
    pub event_name: String,
    pub event_type_description: Option<String>,
    pub event_type_main: String,
    pub organizers: String,
    pub region_name: String,
    pub city_name: String,
    pub city_id: u64,
    pub venue_id: u64,
    pub venue_name: String,
    pub venue_address: String,
    /// Выручка в валюте отчётности.
    pub revenue_rub: f64,
    /// Выручка с одного билета в валюте отчётности.
    pub one_ticket_revenue_rub: f64,
    /// Календарный месяц заказа.
    pub month: u32,
    pub season: Season,
}

impl EnrichedOrder {
    /// День недели заказа.
    pub fn weekday(&self) -> Weekday {
        self.created_dt_msk.weekday()
    }

    /// Будни или выходные.
    pub fn day_type(&self) -> DayType {
        DayType::from_weekday(self.weekday())
    }
}
