//! Статистические инструменты: квантили, описательные статистики и
//! U-критерий Манна — Уитни.
//!
//! Расчёты повторяют поведение pandas/SciPy по умолчанию: линейная
//! интерполяция квантилей, выборочное стандартное отклонение (ddof = 1),
//! точный либо асимптотический метод для U-критерия.

use crate::errors::AfishaError;
use macros::EnumDisplay;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Максимальный размер меньшей выборки, при котором для выборок без связей
/// применяется точный метод.
pub const EXACT_MAX_SIZE: usize = 8;

/// Квантиль уровня `q` (0..=1) с линейной интерполяцией между соседними
/// порядковыми статистиками.
///
/// ## Пример
///
/// ```
/// use commons::stats::quantile;
///
/// let q = quantile(&[1.0, 2.0, 3.0, 4.0], 0.5).unwrap();
/// assert_eq!(q, 2.5);
/// assert!(quantile(&[], 0.5).is_none());
/// ```
///
/// ## Returns
///
/// `None` для пустого набора значений.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(quantile_sorted(&sorted, q))
}

/// Квантиль для уже отсортированного непустого набора.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Среднее арифметическое; `None` для пустого набора.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Описательные статистики набора значений (аналог `describe()`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Выборочное стандартное отклонение; `None` при одном значении.
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

/// Рассчитать [`Summary`]; `None` для пустого набора.
pub fn describe(values: &[f64]) -> Option<Summary> {
    let mean = mean(values)?;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let std = (count > 1).then(|| {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    Some(Summary {
        count,
        mean,
        std,
        min: sorted[0],
        p25: quantile_sorted(&sorted, 0.25),
        p50: quantile_sorted(&sorted, 0.5),
        p75: quantile_sorted(&sorted, 0.75),
        max: sorted[count - 1],
    })
}

/// Альтернативная гипотеза для U-критерия (семантика SciPy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    /// Распределения различаются.
    #[str("two-sided")]
    TwoSided,
    /// Первая выборка стохастически меньше второй.
    #[str("less")]
    Less,
    /// Первая выборка стохастически больше второй.
    #[str("greater")]
    Greater,
}

/// Способ расчёта p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMethod {
    /// Точное распределение U (нет связей, малая выборка).
    #[str("exact")]
    Exact,
    /// Нормальная аппроксимация с поправками на связи и непрерывность.
    #[str("asymptotic")]
    Asymptotic,
}

/// Результат U-критерия Манна — Уитни.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MannWhitney {
    /// Статистика U для первой выборки.
    pub statistic: f64,
    pub p_value: f64,
    pub method: TestMethod,
}

/// U-критерий Манна — Уитни для двух независимых выборок.
///
/// Точный метод выбирается, когда в объединённой выборке нет связей и
/// меньшая из выборок не больше [`EXACT_MAX_SIZE`]; иначе используется
/// нормальная аппроксимация с поправкой на связи и поправкой
/// на непрерывность 0.5.
///
/// ## Пример
///
/// ```
/// use commons::stats::{Alternative, mann_whitney_u};
///
/// let a = [1.0, 2.0, 2.0, 3.0, 5.0];
/// let b = [1.0, 1.0, 2.0, 2.0, 2.0];
/// let res = mann_whitney_u(&a, &b, Alternative::Greater).unwrap();
///
/// assert_eq!(res.statistic, 18.0);
/// assert!((res.p_value - 0.129266).abs() < 1e-5);
/// ```
///
/// ## Returns
///
/// `None`, если хотя бы одна из выборок пуста: критерий не определён.
pub fn mann_whitney_u(x: &[f64], y: &[f64], alternative: Alternative) -> Option<MannWhitney> {
    if x.is_empty() || y.is_empty() {
        return None;
    }

    let n1 = x.len();
    let n2 = y.len();
    let (rank_sum_x, tie_sizes) = rank_sum_first(x, y);

    let u1 = rank_sum_x - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;

    let (u, factor) = match alternative {
        Alternative::Greater => (u1, 1.0),
        Alternative::Less => (u2, 1.0),
        Alternative::TwoSided => (u1.max(u2), 2.0),
    };

    let has_ties = tie_sizes.iter().any(|t| *t > 1);
    let (p, method) = if !has_ties && n1.min(n2) <= EXACT_MAX_SIZE {
        (exact_sf(u, n1, n2), TestMethod::Exact)
    } else {
        (asymptotic_sf(u, n1, n2, &tie_sizes), TestMethod::Asymptotic)
    };

    Some(MannWhitney {
        statistic: u1,
        p_value: (p * factor).clamp(0.0, 1.0),
        method,
    })
}

/// Сумма рангов первой выборки в объединённой выборке (средние ранги
/// для связей) и размеры групп связанных значений.
fn rank_sum_first(x: &[f64], y: &[f64]) -> (f64, Vec<usize>) {
    let mut combined: Vec<(f64, bool)> = x
        .iter()
        .map(|v| (*v, true))
        .chain(y.iter().map(|v| (*v, false)))
        .collect();
    combined.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut rank_sum = 0.0;
    let mut tie_sizes = Vec::new();
    let mut start = 0;
    while start < combined.len() {
        let mut end = start + 1;
        while end < combined.len() && combined[end].0 == combined[start].0 {
            end += 1;
        }
        // Ранги start+1..=end, средний ранг группы.
        let mid_rank = (start + 1 + end) as f64 / 2.0;
        let from_x = combined[start..end].iter().filter(|(_, first)| *first).count();
        rank_sum += mid_rank * from_x as f64;
        tie_sizes.push(end - start);
        start = end;
    }

    (rank_sum, tie_sizes)
}

/// P(U >= u) по нормальной аппроксимации.
fn asymptotic_sf(u: f64, n1: usize, n2: usize, tie_sizes: &[usize]) -> f64 {
    let n = (n1 + n2) as f64;
    let (n1, n2) = (n1 as f64, n2 as f64);

    let mu = n1 * n2 / 2.0;
    let tie_term: f64 = tie_sizes
        .iter()
        .map(|t| {
            let t = *t as f64;
            t.powi(3) - t
        })
        .sum();
    let sigma = (n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();

    if sigma.is_nan() || sigma <= 0.0 {
        // Все наблюдения совпадают.
        return 1.0;
    }

    let z = (u - mu - 0.5) / sigma;
    match Normal::new(0.0, 1.0) {
        Ok(norm) => norm.sf(z),
        Err(_) => f64::NAN,
    }
}

/// P(U >= u) по точному распределению U при отсутствии связей.
fn exact_sf(u: f64, n1: usize, n2: usize) -> f64 {
    let counts = u_distribution(n1, n2);
    let total: f64 = counts.iter().sum();
    let k = u.round().max(0.0) as usize;
    if k >= counts.len() {
        return 0.0;
    }
    counts[k..].iter().sum::<f64>() / total
}

/// Число перестановок для каждого значения U: коэффициенты гауссова
/// биномиального коэффициента `[n1 + n2, n1]_q`.
fn u_distribution(n1: usize, n2: usize) -> Vec<f64> {
    let (m, n) = if n1 <= n2 { (n1, n2) } else { (n2, n1) };
    let mut c = vec![0.0; m * n + 1];
    c[0] = 1.0;

    for i in 1..=m {
        // Умножение на (1 - q^(n+i)); старшие степени за пределами m*n
        // в итоговом многочлене обнуляются, поэтому их можно отбросить.
        let k = n + i;
        for idx in (k..c.len()).rev() {
            c[idx] -= c[idx - k];
        }
        // Деление на (1 - q^i).
        for idx in i..c.len() {
            c[idx] += c[idx - i];
        }
    }

    c
}
