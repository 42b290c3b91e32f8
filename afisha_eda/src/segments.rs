//! Сводные таблицы по очищенным заказам.
//!
//! Все функции только читают таблицу заказов и возвращают новые строки
//! агрегатов. Сравнения сезонов строятся на объединении категорий обоих
//! периодов: отсутствующая в одном из них категория получает ноль.

use crate::config::SENTINEL_DELTA;
use chrono::{NaiveDate, Weekday};
use commons::errors::AfishaError;
use commons::models::{DayType, EnrichedOrder, Season};
use commons::traits::TableRow;
use commons::utils::round_to;
use log::{info, warn};
use macros::{EnumDisplay, TableRow};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Display;

/// Количество заказов за месяц.
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct MonthOrders {
    pub month: u32,
    pub orders: usize,
}

/// Доля категории в заказах летом и осенью.
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct ShareComparison {
    pub category: String,
    pub summer_share: f64,
    pub autumn_share: f64,
    /// Разница долей: осень минус лето.
    pub difference: f64,
}

/// Как получено значение изменения выручки с билета.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    /// Настоящее относительное изменение.
    #[str("computed")]
    Computed,
    /// Летнее значение равно нулю, подставлено фиксированное значение.
    #[str("baseline_zero")]
    BaselineZero,
}

/// Средняя выручка с билета по типу мероприятия и её изменение.
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct TicketRevenueDelta {
    pub event_type_main: String,
    #[precision(2)]
    pub summer: f64,
    #[precision(2)]
    pub autumn: f64,
    /// Изменение, %.
    #[precision(2)]
    pub delta_pct: f64,
    pub delta_kind: DeltaKind,
}

/// Показатели активности за группу дней.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Activity {
    pub orders: usize,
    pub users: usize,
    pub revenue_rub: f64,
    pub tickets: i64,
    pub orders_per_user: f64,
    pub revenue_per_ticket: f64,
}

/// Активность за календарный день.
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub orders: usize,
    pub users: usize,
    #[precision(2)]
    pub revenue_rub: f64,
    pub tickets: i64,
    #[precision(2)]
    pub orders_per_user: f64,
    #[precision(2)]
    pub revenue_per_ticket: f64,
}

/// Активность в будни и выходные.
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct DayTypeActivity {
    pub day_type: DayType,
    pub orders: usize,
    pub users: usize,
    #[precision(2)]
    pub revenue_rub: f64,
    pub tickets: i64,
    #[precision(2)]
    pub orders_per_user: f64,
    #[precision(2)]
    pub revenue_per_ticket: f64,
}

/// Активность по дням недели.
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct WeekdayActivity {
    pub weekday: String,
    pub orders: usize,
    pub users: usize,
    #[precision(2)]
    pub revenue_rub: f64,
    pub tickets: i64,
    #[precision(2)]
    pub orders_per_user: f64,
    #[precision(2)]
    pub revenue_per_ticket: f64,
}

/// Регион: уникальные мероприятия и заказы.
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct RegionRank {
    pub region_name: String,
    pub events: usize,
    pub events_share: f64,
    pub orders: usize,
    pub orders_share: f64,
}

/// Билетный партнёр: мероприятия, заказы и выручка.
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct PartnerRank {
    pub service_name: String,
    pub events: usize,
    pub events_share: f64,
    pub orders: usize,
    pub orders_share: f64,
    #[precision(2)]
    pub revenue_rub: f64,
    pub revenue_share: f64,
}

/// Все сводные таблицы отчёта.
#[derive(Debug, Clone)]
pub struct Segments {
    pub orders_by_month: Vec<MonthOrders>,
    pub event_type_shares: Vec<ShareComparison>,
    pub device_type_shares: Vec<ShareComparison>,
    pub age_limit_shares: Vec<ShareComparison>,
    pub ticket_revenue_delta: Vec<TicketRevenueDelta>,
    pub autumn_daily: Vec<DailyActivity>,
    pub autumn_day_type: Vec<DayTypeActivity>,
    pub autumn_weekday: Vec<WeekdayActivity>,
    pub region_ranking: Vec<RegionRank>,
    pub partner_ranking: Vec<PartnerRank>,
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Доля от суммы; ноль при нулевой сумме.
fn share(part: f64, total: f64) -> f64 {
    if total == 0.0 { 0.0 } else { part / total }
}

/// Количество заказов по месяцам, по возрастанию месяца.
pub fn orders_by_month(orders: &[EnrichedOrder]) -> Vec<MonthOrders> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for order in orders {
        *counts.entry(order.month).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(month, orders)| MonthOrders { month, orders })
        .collect()
}

/// Заказы одного сезона.
pub fn season_subset(orders: &[EnrichedOrder], season: Season) -> Vec<&EnrichedOrder> {
    orders.iter().filter(|o| o.season == season).collect()
}

/// Доли категорий в общем числе заказов подмножества.
pub fn category_shares<K, F>(orders: &[&EnrichedOrder], key: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&EnrichedOrder) -> K,
{
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    for order in orders {
        *counts.entry(key(*order)).or_default() += 1;
    }

    let total = orders.len() as f64;
    counts
        .into_iter()
        .map(|(k, count)| (k, share(count as f64, total)))
        .collect()
}

/// Сопоставить два распределения долей по объединению их категорий.
///
/// Категория, отсутствующая в одном из распределений, получает в нём
/// нулевую долю.
pub fn compare_shares<K>(summer: &BTreeMap<K, f64>, autumn: &BTreeMap<K, f64>) -> Vec<ShareComparison>
where
    K: Ord + Display,
{
    let categories: BTreeSet<&K> = summer.keys().chain(autumn.keys()).collect();

    categories
        .into_iter()
        .map(|category| {
            let summer_share = summer.get(category).copied().unwrap_or(0.0);
            let autumn_share = autumn.get(category).copied().unwrap_or(0.0);
            ShareComparison {
                category: category.to_string(),
                summer_share,
                autumn_share,
                difference: autumn_share - summer_share,
            }
        })
        .collect()
}

/// Средняя выручка с билета по типу мероприятия: сумма выручки, делённая
/// на сумму билетов.
pub fn ticket_revenue_by_type(orders: &[&EnrichedOrder]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, i64)> = BTreeMap::new();
    for order in orders {
        let entry = sums.entry(order.event_type_main.clone()).or_default();
        entry.0 += order.revenue_rub;
        entry.1 += order.tickets_count;
    }

    sums.into_iter()
        .map(|(event_type, (revenue, tickets))| (event_type, share(revenue, tickets as f64)))
        .collect()
}

/// Относительное изменение, %, округлённое до двух знаков.
///
/// При нулевой базе возвращается фиксированное значение
/// [`SENTINEL_DELTA`] с признаком [`DeltaKind::BaselineZero`].
///
/// ## Пример
///
/// ```ignore
/// assert_eq!(relative_delta(50.0, 100.0), (100.0, DeltaKind::Computed));
/// assert_eq!(relative_delta(0.0, 30.0), (100.0, DeltaKind::BaselineZero));
/// ```
pub fn relative_delta(summer: f64, autumn: f64) -> (f64, DeltaKind) {
    if summer == 0.0 {
        (SENTINEL_DELTA, DeltaKind::BaselineZero)
    } else {
        (round_to(autumn / summer * 100.0 - 100.0, 2), DeltaKind::Computed)
    }
}

/// Изменение средней выручки с билета от лета к осени по типам мероприятий.
pub fn ticket_revenue_delta(
    summer: &BTreeMap<String, f64>,
    autumn: &BTreeMap<String, f64>,
) -> Vec<TicketRevenueDelta> {
    let categories: BTreeSet<&String> = summer.keys().chain(autumn.keys()).collect();

    categories
        .into_iter()
        .map(|event_type| {
            let summer_value = summer.get(event_type).copied().unwrap_or(0.0);
            let autumn_value = autumn.get(event_type).copied().unwrap_or(0.0);
            let (delta_pct, delta_kind) = relative_delta(summer_value, autumn_value);
            TicketRevenueDelta {
                event_type_main: event_type.clone(),
                summer: summer_value,
                autumn: autumn_value,
                delta_pct,
                delta_kind,
            }
        })
        .collect()
}

/// Сгруппировать заказы по ключу и посчитать показатели активности.
pub fn activity_by<K, F>(orders: &[&EnrichedOrder], key: F) -> BTreeMap<K, Activity>
where
    K: Ord,
    F: Fn(&EnrichedOrder) -> K,
{
    let mut groups: BTreeMap<K, Vec<&EnrichedOrder>> = BTreeMap::new();
    for order in orders {
        groups.entry(key(*order)).or_default().push(*order);
    }

    groups
        .into_iter()
        .map(|(k, group)| {
            let users: HashSet<&str> = group.iter().map(|o| o.user_id.as_str()).collect();
            let revenue_rub: f64 = group.iter().map(|o| o.revenue_rub).sum();
            let tickets: i64 = group.iter().map(|o| o.tickets_count).sum();
            let activity = Activity {
                orders: group.len(),
                users: users.len(),
                revenue_rub,
                tickets,
                orders_per_user: share(group.len() as f64, users.len() as f64),
                revenue_per_ticket: share(revenue_rub, tickets as f64),
            };
            (k, activity)
        })
        .collect()
}

/// Дневная активность, по возрастанию даты.
pub fn daily_activity(orders: &[&EnrichedOrder]) -> Vec<DailyActivity> {
    activity_by(orders, |o| o.created_dt_msk)
        .into_iter()
        .map(|(date, a)| DailyActivity {
            date,
            orders: a.orders,
            users: a.users,
            revenue_rub: round_to(a.revenue_rub, 2),
            tickets: a.tickets,
            orders_per_user: a.orders_per_user,
            revenue_per_ticket: a.revenue_per_ticket,
        })
        .collect()
}

/// Активность в будни и выходные.
pub fn day_type_activity(orders: &[&EnrichedOrder]) -> Vec<DayTypeActivity> {
    activity_by(orders, EnrichedOrder::day_type)
        .into_iter()
        .map(|(day_type, a)| DayTypeActivity {
            day_type,
            orders: a.orders,
            users: a.users,
            revenue_rub: round_to(a.revenue_rub, 2),
            tickets: a.tickets,
            orders_per_user: a.orders_per_user,
            revenue_per_ticket: a.revenue_per_ticket,
        })
        .collect()
}

/// Активность по дням недели, с понедельника по воскресенье.
pub fn weekday_activity(orders: &[&EnrichedOrder]) -> Vec<WeekdayActivity> {
    activity_by(orders, |o| o.weekday().num_days_from_monday())
        .into_iter()
        .map(|(day, a)| {
            WeekdayActivity {
                weekday: WEEK[day as usize % WEEK.len()].to_string(),
                orders: a.orders,
                users: a.users,
                revenue_rub: round_to(a.revenue_rub, 2),
                tickets: a.tickets,
                orders_per_user: a.orders_per_user,
                revenue_per_ticket: a.revenue_per_ticket,
            }
        })
        .collect()
}

/// Рейтинг регионов по числу уникальных мероприятий (по убыванию).
///
/// Доли считаются от суммы по всем регионам.
pub fn region_ranking(orders: &[&EnrichedOrder]) -> Vec<RegionRank> {
    let mut groups: BTreeMap<&str, (HashSet<u64>, usize)> = BTreeMap::new();
    for order in orders {
        let entry = groups.entry(order.region_name.as_str()).or_default();
        entry.0.insert(order.event_id);
        entry.1 += 1;
    }

    let total_events: usize = groups.values().map(|(events, _)| events.len()).sum();
    let total_orders: usize = groups.values().map(|(_, count)| count).sum();

    let mut ranking: Vec<RegionRank> = groups
        .into_iter()
        .map(|(region, (events, count))| RegionRank {
            region_name: region.to_string(),
            events: events.len(),
            events_share: share(events.len() as f64, total_events as f64),
            orders: count,
            orders_share: share(count as f64, total_orders as f64),
        })
        .collect();

    ranking.sort_by(|a, b| b.events.cmp(&a.events));
    ranking
}

/// Рейтинг билетных партнёров по выручке (по убыванию).
///
/// Доли считаются от суммы по всем партнёрам; доля выручки округляется до
/// четырёх знаков, выручка — до двух.
pub fn partner_ranking(orders: &[&EnrichedOrder]) -> Vec<PartnerRank> {
    let mut groups: BTreeMap<&str, (HashSet<u64>, usize, f64)> = BTreeMap::new();
    for order in orders {
        let entry = groups.entry(order.service_name.as_str()).or_default();
        entry.0.insert(order.event_id);
        entry.1 += 1;
        entry.2 += order.revenue_rub;
    }

    let total_events: usize = groups.values().map(|(events, _, _)| events.len()).sum();
    let total_orders: usize = groups.values().map(|(_, count, _)| count).sum();
    let total_revenue: f64 = groups.values().map(|(_, _, revenue)| revenue).sum();

    let mut ranking: Vec<PartnerRank> = groups
        .into_iter()
        .map(|(service, (events, count, revenue))| PartnerRank {
            service_name: service.to_string(),
            events: events.len(),
            events_share: share(events.len() as f64, total_events as f64),
            orders: count,
            orders_share: share(count as f64, total_orders as f64),
            revenue_rub: round_to(revenue, 2),
            revenue_share: round_to(share(revenue, total_revenue), 4),
        })
        .collect();

    ranking.sort_by(|a, b| b.revenue_rub.total_cmp(&a.revenue_rub));
    ranking
}

/// Построить все сводные таблицы отчёта.
pub fn build_segments(orders: &[EnrichedOrder]) -> Segments {
    let summer = season_subset(orders, Season::Summer);
    let autumn = season_subset(orders, Season::Autumn);
    info!("Заказов летом: {}, осенью: {}", summer.len(), autumn.len());

    let event_type_shares = compare_shares(
        &category_shares(&summer, |o| o.event_type_main.clone()),
        &category_shares(&autumn, |o| o.event_type_main.clone()),
    );
    let device_type_shares = compare_shares(
        &category_shares(&summer, |o| o.device_type_canonical),
        &category_shares(&autumn, |o| o.device_type_canonical),
    );
    let age_limit_shares = compare_shares(
        &category_shares(&summer, |o| o.age_limit),
        &category_shares(&autumn, |o| o.age_limit),
    );

    let ticket_revenue_delta = ticket_revenue_delta(
        &ticket_revenue_by_type(&summer),
        &ticket_revenue_by_type(&autumn),
    );
    let sentinels = ticket_revenue_delta
        .iter()
        .filter(|d| d.delta_kind == DeltaKind::BaselineZero)
        .count();
    if sentinels > 0 {
        warn!("Типов мероприятий без летней выручки: {}", sentinels);
    }

    Segments {
        orders_by_month: orders_by_month(orders),
        event_type_shares,
        device_type_shares,
        age_limit_shares,
        ticket_revenue_delta,
        autumn_daily: daily_activity(&autumn),
        autumn_day_type: day_type_activity(&autumn),
        autumn_weekday: weekday_activity(&autumn),
        region_ranking: region_ranking(&autumn),
        partner_ranking: partner_ranking(&autumn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::enriched;
    use commons::models::DeviceType;

    #[test]
    fn orders_are_counted_by_month() {
        let orders = vec![
            enriched(1).date("2024-06-10").build(),
            enriched(2).date("2024-09-02").build(),
            enriched(3).date("2024-06-11").build(),
        ];

        let months = orders_by_month(&orders);

        assert_eq!(
            months,
            vec![
                MonthOrders { month: 6, orders: 2 },
                MonthOrders { month: 9, orders: 1 },
            ]
        );
    }

    #[test]
    fn disjoint_categories_are_union_filled() {
        let summer = BTreeMap::from([("A", 0.5), ("B", 0.5)]);
        let autumn = BTreeMap::from([("B", 0.25), ("C", 0.75)]);

        let rows = compare_shares(&summer, &autumn);

        assert_eq!(rows.len(), 3);
        let a = &rows[0];
        assert_eq!(a.category, "A");
        assert_eq!((a.summer_share, a.autumn_share), (0.5, 0.0));
        let b = &rows[1];
        assert_eq!((b.summer_share, b.autumn_share), (0.5, 0.25));
        let c = &rows[2];
        assert_eq!(c.category, "C");
        assert_eq!((c.summer_share, c.autumn_share), (0.0, 0.75));
        assert_eq!(c.difference, 0.75);
        let zero_filled = rows
            .iter()
            .flat_map(|r| [r.summer_share, r.autumn_share])
            .filter(|v| *v == 0.0)
            .count();
        assert_eq!(zero_filled, 2);
    }

    #[test]
    fn shares_sum_to_one() {
        let orders = vec![
            enriched(1).device(DeviceType::Mobile).build(),
            enriched(2).device(DeviceType::Mobile).build(),
            enriched(3).device(DeviceType::Desktop).build(),
            enriched(4).device(DeviceType::Mobile).build(),
        ];
        let refs: Vec<&EnrichedOrder> = orders.iter().collect();

        let shares = category_shares(&refs, |o| o.device_type_canonical);

        assert_eq!(shares[&DeviceType::Mobile], 0.75);
        assert_eq!(shares[&DeviceType::Desktop], 0.25);
    }

    #[test]
    fn sentinel_delta_is_flagged() {
        assert_eq!(relative_delta(0.0, 30.0), (SENTINEL_DELTA, DeltaKind::BaselineZero));
    }

    #[test]
    fn real_hundred_percent_increase_is_computed() {
        assert_eq!(relative_delta(50.0, 100.0), (100.0, DeltaKind::Computed));
        assert_eq!(relative_delta(300.0, 200.0), (-33.33, DeltaKind::Computed));
    }

    #[test]
    fn ticket_revenue_delta_covers_both_paths() {
        let orders = vec![
            enriched(1).date("2024-07-01").event_type("театр").revenue(100.0).tickets(2).build(),
            enriched(2).date("2024-10-01").event_type("театр").revenue(300.0).tickets(3).build(),
            enriched(3).date("2024-10-02").event_type("стендап").revenue(400.0).tickets(2).build(),
        ];
        let summer = season_subset(&orders, Season::Summer);
        let autumn = season_subset(&orders, Season::Autumn);

        let rows = ticket_revenue_delta(
            &ticket_revenue_by_type(&summer),
            &ticket_revenue_by_type(&autumn),
        );

        assert_eq!(rows.len(), 2);
        let standup = &rows[0];
        assert_eq!(standup.event_type_main, "стендап");
        assert_eq!(standup.summer, 0.0);
        assert_eq!(standup.autumn, 200.0);
        assert_eq!(standup.delta_kind, DeltaKind::BaselineZero);
        assert_eq!(standup.delta_pct, SENTINEL_DELTA);

        let theatre = &rows[1];
        assert_eq!(theatre.summer, 50.0);
        assert_eq!(theatre.autumn, 100.0);
        assert_eq!(theatre.delta_kind, DeltaKind::Computed);
        assert_eq!(theatre.delta_pct, 100.0);
    }

    #[test]
    fn daily_activity_counts_distinct_users() {
        let orders = vec![
            enriched(1).user("u1").date("2024-09-02").revenue(100.0).tickets(1).build(),
            enriched(2).user("u1").date("2024-09-02").revenue(300.0).tickets(3).build(),
            enriched(3).user("u2").date("2024-09-02").revenue(200.0).tickets(1).build(),
            enriched(4).user("u3").date("2024-09-03").revenue(50.0).tickets(1).build(),
        ];
        let refs: Vec<&EnrichedOrder> = orders.iter().collect();

        let days = daily_activity(&refs);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].orders, 3);
        assert_eq!(days[0].users, 2);
        assert_eq!(days[0].revenue_rub, 600.0);
        assert_eq!(days[0].tickets, 5);
        assert_eq!(days[0].orders_per_user, 1.5);
        assert_eq!(days[0].revenue_per_ticket, 120.0);
        assert_eq!(days[1].orders, 1);
    }

    #[test]
    fn weekend_and_weekday_are_separated() {
        // 2024-09-07 — суббота, 2024-09-02 — понедельник.
        let orders = vec![
            enriched(1).date("2024-09-02").build(),
            enriched(2).date("2024-09-07").build(),
            enriched(3).date("2024-09-08").build(),
        ];
        let refs: Vec<&EnrichedOrder> = orders.iter().collect();

        let by_type = day_type_activity(&refs);
        assert_eq!(by_type.len(), 2);
        assert_eq!(by_type[0].day_type, DayType::Weekday);
        assert_eq!(by_type[0].orders, 1);
        assert_eq!(by_type[1].day_type, DayType::Weekend);
        assert_eq!(by_type[1].orders, 2);

        let by_day = weekday_activity(&refs);
        let names: Vec<&str> = by_day.iter().map(|d| d.weekday.as_str()).collect();
        assert_eq!(names, vec!["Mon", "Sat", "Sun"]);
    }

    #[test]
    fn regions_are_ranked_by_distinct_events() {
        let orders = vec![
            enriched(1).region("Озёрный край").event(1).build(),
            enriched(2).region("Каменевский регион").event(2).build(),
            enriched(3).region("Каменевский регион").event(3).build(),
            enriched(4).region("Каменевский регион").event(3).build(),
        ];
        let refs: Vec<&EnrichedOrder> = orders.iter().collect();

        let ranking = region_ranking(&refs);

        assert_eq!(ranking[0].region_name, "Каменевский регион");
        assert_eq!(ranking[0].events, 2);
        assert_eq!(ranking[0].orders, 3);
        assert_eq!(ranking[0].orders_share, 0.75);
        assert_eq!(ranking[1].events_share, 1.0 / 3.0);
    }

    #[test]
    fn partners_are_ranked_by_revenue() {
        let orders = vec![
            enriched(1).service("Лови билет!").revenue(100.0).build(),
            enriched(2).service("Мой билет").revenue(250.0).build(),
            enriched(3).service("Лови билет!").revenue(50.0).build(),
        ];
        let refs: Vec<&EnrichedOrder> = orders.iter().collect();

        let ranking = partner_ranking(&refs);

        assert_eq!(ranking[0].service_name, "Мой билет");
        assert_eq!(ranking[0].revenue_share, 0.625);
        assert_eq!(ranking[1].service_name, "Лови билет!");
        assert_eq!(ranking[1].orders, 2);
        assert_eq!(ranking[1].revenue_rub, 150.0);
    }

    #[test]
    fn segments_use_autumn_for_rankings() {
        let orders = vec![
            enriched(1).date("2024-07-01").region("Летний край").age(0).build(),
            enriched(2).date("2024-09-02").region("Каменевский регион").age(16).build(),
        ];

        let segments = build_segments(&orders);

        assert_eq!(segments.region_ranking.len(), 1);
        assert_eq!(segments.region_ranking[0].region_name, "Каменевский регион");
        assert_eq!(segments.age_limit_shares.len(), 2);
        assert_eq!(segments.orders_by_month.len(), 2);
        assert_eq!(segments.autumn_daily.len(), 1);
    }
}
