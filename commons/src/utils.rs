//! Универсальные утилиты.

use crate::errors::AfishaError;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;

/// Формат даты во входных таблицах.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Допустимые форматы даты и времени во входных таблицах.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Разобрать дату формата `YYYY-MM-DD`.
///
/// ## Пример
///
/// ```
/// use commons::utils::parse_date;
///
/// let date = parse_date("created_dt_msk", "2024-09-02").unwrap();
/// assert_eq!(date.to_string(), "2024-09-02");
/// assert!(parse_date("created_dt_msk", "вчера").is_err());
/// ```
///
/// ## Ошибки
///
/// [`AfishaError::DateError`] с именем поля и исходным значением.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AfishaError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| AfishaError::date_err(field, value))
}

/// Разобрать дату и время (`YYYY-MM-DD HH:MM:SS`, допускается разделитель `T`).
pub fn parse_datetime(field: &str, value: &str) -> Result<NaiveDateTime, AfishaError> {
    let value_trim = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value_trim, fmt).ok())
        .ok_or_else(|| AfishaError::date_err(field, value))
}

/// Округлить значение до `digits` знаков после запятой.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Предоставить родительский каталог проекта.
///
/// Для `debug` это будет директория расположения `cargo.toml`, а для `release`
/// расположение скомпилированного файла.
#[cfg(debug_assertions)]
pub fn get_project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

#[cfg(not(debug_assertions))]
pub fn get_project_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .expect("Не удалось определить путь к исполняемому файлу")
}

/// Предоставить корневую директорию всего проекта.
///
/// В `debug` это директория `workspace`, а в `release` — место расположения
/// скомпилированного файла. Относительно неё ищутся каталоги `data`, `log`
/// и `report` по умолчанию.
///
/// Вызывает панику при неудачах определения путей.
pub fn get_workspace_root() -> PathBuf {
    let project_root = get_project_root();
    if cfg!(debug_assertions) {
        project_root
            .parent()
            .expect("Не удалось получить родительский каталог workspace")
            .to_path_buf()
    } else {
        project_root
    }
}
