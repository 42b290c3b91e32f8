//! Проверка гипотез об активности пользователей мобильных и стационарных
//! устройств.
//!
//! Обе проверки используют осенние заказы: когорта A — mobile, когорта B —
//! desktop. Пользователи, делавшие заказы с обоих типов устройств,
//! исключаются из обеих когорт, чтобы выборки были независимыми.
//! Применяется односторонний U-критерий Манна — Уитни
//! (альтернатива: A стохастически больше B).

use commons::errors::AfishaError;
use commons::models::{DeviceType, EnrichedOrder, Season};
use commons::stats::{Alternative, TestMethod, mann_whitney_u, mean};
use commons::traits::TableRow;
use log::{info, warn};
use macros::{EnumDisplay, TableRow};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Итог проверки гипотезы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// p-value не больше уровня значимости: нулевая гипотеза отвергается.
    #[str("reject")]
    Reject,
    #[str("fail_to_reject")]
    FailToReject,
    /// Хотя бы одна когорта пуста, критерий не определён.
    #[str("undetermined")]
    Undetermined,
}

/// Результат проверки одной гипотезы.
#[derive(Debug, Clone, PartialEq, Serialize, TableRow)]
pub struct HypothesisResult {
    pub metric: String,
    pub cohort_a_size: usize,
    pub cohort_b_size: usize,
    pub excluded_users: usize,
    #[precision(3)]
    pub mean_a: Option<f64>,
    #[precision(3)]
    pub mean_b: Option<f64>,
    #[precision(1)]
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub alpha: f64,
    pub method: Option<TestMethod>,
    pub decision: Decision,
}

/// Когорты заказов по типу устройства.
#[derive(Debug, Clone)]
pub struct Cohorts<'a> {
    pub mobile: Vec<&'a EnrichedOrder>,
    pub desktop: Vec<&'a EnrichedOrder>,
    /// Сколько пользователей исключено как заказывавшие с обоих устройств.
    pub excluded_users: usize,
}

/// Пользователи, делавшие заказы с устройства `device`.
fn users_with<'a>(orders: &[&'a EnrichedOrder], device: DeviceType) -> HashSet<&'a str> {
    orders
        .iter()
        .filter(|o| o.device_type_canonical == device)
        .map(|o| o.user_id.as_str())
        .collect()
}

/// Разделить заказы на когорты mobile и desktop, исключив пользователей,
/// присутствующих в обеих.
pub fn split_cohorts<'a>(orders: &[&'a EnrichedOrder]) -> Cohorts<'a> {
    let mobile_users = users_with(orders, DeviceType::Mobile);
    let desktop_users = users_with(orders, DeviceType::Desktop);
    let shared: HashSet<&str> = mobile_users.intersection(&desktop_users).copied().collect();

    let cohort = |device: DeviceType| -> Vec<&'a EnrichedOrder> {
        orders
            .iter()
            .filter(|o| o.device_type_canonical == device && !shared.contains(o.user_id.as_str()))
            .copied()
            .collect()
    };

    Cohorts {
        mobile: cohort(DeviceType::Mobile),
        desktop: cohort(DeviceType::Desktop),
        excluded_users: shared.len(),
    }
}

/// Количество заказов каждого пользователя когорты.
pub fn orders_per_user(cohort: &[&EnrichedOrder]) -> Vec<f64> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for order in cohort {
        *counts.entry(order.user_id.as_str()).or_default() += 1;
    }
    counts.into_values().map(|c| c as f64).collect()
}

/// Дни с предыдущего заказа; первые покупки (`None`) не учитываются.
pub fn days_between_orders(cohort: &[&EnrichedOrder]) -> Vec<f64> {
    cohort.iter().filter_map(|o| o.days_since_prev).collect()
}

/// Проверить гипотезу «выборка A больше выборки B».
pub fn compare_samples(
    metric: &str,
    sample_a: &[f64],
    sample_b: &[f64],
    excluded_users: usize,
    alpha: f64,
) -> HypothesisResult {
    let test = mann_whitney_u(sample_a, sample_b, Alternative::Greater);

    let decision = match test {
        None => {
            warn!(
                "{}: пустая когорта (A = {}, B = {}), критерий не определён",
                metric,
                sample_a.len(),
                sample_b.len()
            );
            Decision::Undetermined
        }
        Some(res) if res.p_value <= alpha => Decision::Reject,
        Some(_) => Decision::FailToReject,
    };

    HypothesisResult {
        metric: metric.to_string(),
        cohort_a_size: sample_a.len(),
        cohort_b_size: sample_b.len(),
        excluded_users,
        mean_a: mean(sample_a),
        mean_b: mean(sample_b),
        statistic: test.map(|t| t.statistic),
        p_value: test.map(|t| t.p_value),
        alpha,
        method: test.map(|t| t.method),
        decision,
    }
}

/// Проверить обе гипотезы на осенних заказах.
pub fn test_hypotheses(orders: &[EnrichedOrder], alpha: f64) -> Vec<HypothesisResult> {
    let autumn: Vec<&EnrichedOrder> = orders.iter().filter(|o| o.season == Season::Autumn).collect();
    let cohorts = split_cohorts(&autumn);
    info!(
        "Когорты: mobile {} заказов, desktop {} заказов, исключено пользователей {}",
        cohorts.mobile.len(),
        cohorts.desktop.len(),
        cohorts.excluded_users
    );

    let results = vec![
        compare_samples(
            "orders_per_user",
            &orders_per_user(&cohorts.mobile),
            &orders_per_user(&cohorts.desktop),
            cohorts.excluded_users,
            alpha,
        ),
        compare_samples(
            "days_since_prev",
            &days_between_orders(&cohorts.mobile),
            &days_between_orders(&cohorts.desktop),
            cohorts.excluded_users,
            alpha,
        ),
    ];

    for res in &results {
        info!("{}: p-value {:?}, решение {}", res.metric, res.p_value, res.decision);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::enriched;

    /// Заказы пользователей: `(user_id, устройство, число заказов)`.
    fn orders_for(users: &[(&str, DeviceType, usize)]) -> Vec<EnrichedOrder> {
        let mut id = 0;
        let mut orders = Vec::new();
        for (user, device, count) in users {
            for _ in 0..*count {
                id += 1;
                orders.push(enriched(id).user(user).device(*device).build());
            }
        }
        orders
    }

    #[test]
    fn cross_device_users_are_excluded() {
        let orders = orders_for(&[
            ("u1", DeviceType::Mobile, 2),
            ("u2", DeviceType::Desktop, 1),
            ("both", DeviceType::Mobile, 1),
            ("both", DeviceType::Desktop, 3),
        ]);
        let refs: Vec<&EnrichedOrder> = orders.iter().collect();

        let cohorts = split_cohorts(&refs);

        assert_eq!(cohorts.excluded_users, 1);
        assert_eq!(cohorts.mobile.len(), 2);
        assert_eq!(cohorts.desktop.len(), 1);
        assert!(cohorts.mobile.iter().all(|o| o.user_id != "both"));
        assert!(cohorts.desktop.iter().all(|o| o.user_id != "both"));
    }

    #[test]
    fn orders_per_user_reference_sample() {
        let orders = orders_for(&[
            ("m1", DeviceType::Mobile, 1),
            ("m2", DeviceType::Mobile, 2),
            ("m3", DeviceType::Mobile, 2),
            ("m4", DeviceType::Mobile, 3),
            ("m5", DeviceType::Mobile, 5),
            ("d1", DeviceType::Desktop, 1),
            ("d2", DeviceType::Desktop, 1),
            ("d3", DeviceType::Desktop, 2),
            ("d4", DeviceType::Desktop, 2),
            ("d5", DeviceType::Desktop, 2),
            ("x", DeviceType::Mobile, 4),
            ("x", DeviceType::Desktop, 4),
        ]);

        let results = test_hypotheses(&orders, 0.05);
        let res = &results[0];

        assert_eq!(res.metric, "orders_per_user");
        assert_eq!(res.cohort_a_size, 5);
        assert_eq!(res.cohort_b_size, 5);
        assert_eq!(res.excluded_users, 1);
        assert_eq!(res.statistic, Some(18.0));
        assert!((res.p_value.unwrap() - 0.129_266_479_892_780_95).abs() < 1e-9);
        assert_eq!(res.method, Some(TestMethod::Asymptotic));
        assert_eq!(res.decision, Decision::FailToReject);
        assert_eq!(res.mean_a, Some(2.6));
        assert_eq!(res.mean_b, Some(1.6));
    }

    #[test]
    fn separated_samples_are_rejected() {
        let res = compare_samples("days_since_prev", &[5.0, 6.0, 7.0, 8.0], &[1.0, 2.0, 3.0, 4.0], 0, 0.05);

        assert_eq!(res.method, Some(TestMethod::Exact));
        assert!((res.p_value.unwrap() - 1.0 / 70.0).abs() < 1e-12);
        assert_eq!(res.decision, Decision::Reject);
    }

    #[test]
    fn days_since_prev_drops_first_purchases() {
        let orders = vec![
            enriched(1).user("m1").device(DeviceType::Mobile).days(10.0).build(),
            enriched(2).user("m1").device(DeviceType::Mobile).build(),
            enriched(3).user("d1").device(DeviceType::Desktop).days(2.0).build(),
            enriched(4).user("d2").device(DeviceType::Desktop).build(),
        ];

        let results = test_hypotheses(&orders, 0.05);
        let res = &results[1];

        assert_eq!(res.metric, "days_since_prev");
        assert_eq!(res.cohort_a_size, 1);
        assert_eq!(res.cohort_b_size, 1);
        assert_eq!(res.mean_a, Some(10.0));
        assert_ne!(res.decision, Decision::Undetermined);
    }

    #[test]
    fn empty_cohort_is_undetermined() {
        let orders = orders_for(&[
            ("m1", DeviceType::Mobile, 2),
            ("both", DeviceType::Mobile, 1),
            ("both", DeviceType::Desktop, 1),
        ]);

        let results = test_hypotheses(&orders, 0.05);

        for res in &results {
            assert_eq!(res.decision, Decision::Undetermined);
            assert_eq!(res.p_value, None);
            assert_eq!(res.statistic, None);
        }
        assert_eq!(results[0].cohort_b_size, 0);
    }

    #[test]
    fn only_autumn_orders_are_tested() {
        let orders = vec![
            enriched(1).user("m1").device(DeviceType::Mobile).date("2024-07-01").build(),
            enriched(2).user("d1").device(DeviceType::Desktop).date("2024-07-01").build(),
        ];

        let results = test_hypotheses(&orders, 0.05);

        assert_eq!(results[0].cohort_a_size, 0);
        assert_eq!(results[0].decision, Decision::Undetermined);
    }
}
