//! Конфигурация приложения.

use commons::models::Currency;
use std::ops::RangeInclusive;

/// Название директории для log-файлов.
pub const LOG_FOLDER: &str = "log";

/// Название каталога с входными данными по умолчанию.
pub const DATA_FOLDER: &str = "data";

/// Название каталога для результатов по умолчанию.
pub const REPORT_FOLDER: &str = "report";

/// Файл заказов по умолчанию.
pub const ORDERS_FILENAME: &str = "final_tickets_orders_df.csv";

/// Файл мероприятий по умолчанию.
pub const EVENTS_FILENAME: &str = "final_tickets_events_df.csv";

/// Файл курсов тенге по умолчанию.
pub const RATES_FILENAME: &str = "final_tickets_tenge_df.csv";

/// Валюта отчётности.
pub const REPORTING_CURRENCY: Currency = Currency::Rub;

/// Иностранная валюта, требующая конвертации.
pub const FOREIGN_CURRENCY: Currency = Currency::Kzt;

/// Курс задан в рублях за столько единиц иностранной валюты.
pub const RATE_NOMINAL: f64 = 100.0;

/// Уровень квантиля для отсечения выбросов.
pub const OUTLIER_QUANTILE: f64 = 0.99;

/// Уровень значимости для проверки гипотез.
pub const ALPHA: f64 = 0.05;

/// Значение изменения (%) при нулевой базе летнего сезона.
pub const SENTINEL_DELTA: f64 = 100.0;

/// Сколько строк сводных таблиц выводить в консоль.
pub const DEFAULT_TOP: usize = 10;

/// Допустимые значения уровня значимости.
pub const ALPHA_ALLOWED: RangeInclusive<f64> = RangeInclusive::new(0.000_1, 0.5);

/// Допустимые значения квантиля отсечения выбросов.
pub const QUANTILE_ALLOWED: RangeInclusive<f64> = RangeInclusive::new(0.5, 1.0);

/// Допустимое количество строк для вывода в консоль.
pub const TOP_ALLOWED: RangeInclusive<usize> = RangeInclusive::new(1, 100);
