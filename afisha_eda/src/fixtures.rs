//! Вспомогательные конструкторы строк для тестов.

use chrono::Datelike;
use commons::models::{Currency, DeviceType, EnrichedOrder, Event, Order, Season};
use commons::utils::{parse_date, parse_datetime};

/// Заказ с минимальным набором значимых полей.
pub(crate) fn order(
    order_id: u64,
    user_id: &str,
    date: &str,
    currency: Currency,
    device: DeviceType,
    revenue: f64,
    tickets: i64,
) -> Order {
    Order {
        order_id,
        user_id: user_id.to_string(),
        created_dt_msk: parse_date("created_dt_msk", date).unwrap(),
        created_ts_msk: parse_datetime("created_ts_msk", &format!("{date} 12:00:00")).unwrap(),
        event_id: 1,
        cinema_circuit: "нет".to_string(),
        age_limit: 16,
        currency_code: currency,
        device_type_canonical: device,
        revenue,
        service_name: "Билеты без проблем".to_string(),
        tickets_count: tickets,
        total: revenue,
        days_since_prev: None,
    }
}

/// Мероприятие с заданными типом и регионом.
pub(crate) fn event(event_id: u64, event_type_main: Option<&str>, region: Option<&str>) -> Event {
    Event {
        event_id,
        event_name: format!("Мероприятие {event_id}"),
        event_type_description: event_type_main.map(str::to_string),
        event_type_main: event_type_main.map(str::to_string),
        organizers: "Организатор".to_string(),
        region_name: region.map(str::to_string),
        city_name: "Глиногорск".to_string(),
        city_id: 10,
        venue_id: 100 + event_id,
        venue_name: "Арена".to_string(),
        venue_address: "ул. Речная, 1".to_string(),
    }
}

/// Построитель очищенного заказа.
pub(crate) struct Enriched(EnrichedOrder);

/// Очищенный заказ с разумными значениями по умолчанию.
pub(crate) fn enriched(order_id: u64) -> Enriched {
    let date = parse_date("created_dt_msk", "2024-09-02").unwrap();
    Enriched(EnrichedOrder {
        order_id,
        user_id: format!("u{order_id}"),
        created_dt_msk: date,
        created_ts_msk: date.and_hms_opt(12, 0, 0).unwrap(),
        event_id: 1,
        cinema_circuit: "нет".to_string(),
        age_limit: 16,
        currency_code: Currency::Rub,
        device_type_canonical: DeviceType::Mobile,
        revenue: 100.0,
        service_name: "Билеты без проблем".to_string(),
        tickets_count: 1,
        total: 100.0,
        days_since_prev: None,
        event_name: "Мероприятие".to_string(),
        event_type_description: Some("концерт".to_string()),
        event_type_main: "концерты".to_string(),
        organizers: "Организатор".to_string(),
        region_name: "Каменевский регион".to_string(),
        city_name: "Глиногорск".to_string(),
        city_id: 10,
        venue_id: 100,
        venue_name: "Арена".to_string(),
        venue_address: "ул. Речная, 1".to_string(),
        revenue_rub: 100.0,
        one_ticket_revenue_rub: 100.0,
        month: 9,
        season: Season::Autumn,
    })
}

impl Enriched {
    pub(crate) fn user(mut self, user_id: &str) -> Self {
        self.0.user_id = user_id.to_string();
        self
    }

    pub(crate) fn date(mut self, date: &str) -> Self {
        let parsed = parse_date("created_dt_msk", date).unwrap();
        self.0.created_dt_msk = parsed;
        self.0.created_ts_msk = parsed.and_hms_opt(12, 0, 0).unwrap();
        self
    }

    pub(crate) fn device(mut self, device: DeviceType) -> Self {
        self.0.device_type_canonical = device;
        self
    }

    pub(crate) fn event(mut self, event_id: u64) -> Self {
        self.0.event_id = event_id;
        self
    }

    pub(crate) fn event_type(mut self, event_type_main: &str) -> Self {
        self.0.event_type_main = event_type_main.to_string();
        self
    }

    pub(crate) fn region(mut self, region: &str) -> Self {
        self.0.region_name = region.to_string();
        self
    }

    pub(crate) fn service(mut self, service: &str) -> Self {
        self.0.service_name = service.to_string();
        self
    }

    pub(crate) fn age(mut self, age_limit: u8) -> Self {
        self.0.age_limit = age_limit;
        self
    }

    pub(crate) fn revenue(mut self, revenue_rub: f64) -> Self {
        self.0.revenue = revenue_rub;
        self.0.revenue_rub = revenue_rub;
        self
    }

    pub(crate) fn tickets(mut self, tickets: i64) -> Self {
        self.0.tickets_count = tickets;
        self
    }

    pub(crate) fn days(mut self, days: f64) -> Self {
        self.0.days_since_prev = Some(days);
        self
    }

    /// Пересчитать производные поля и вернуть строку.
    pub(crate) fn build(mut self) -> EnrichedOrder {
        let row = &mut self.0;
        row.one_ticket_revenue_rub = row.revenue_rub / row.tickets_count as f64;
        row.month = row.created_dt_msk.month();
        row.season = Season::from_month(row.month);
        self.0
    }
}
