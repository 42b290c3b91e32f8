//! Собственные типы ошибок приложения.
//!
//! Для поддержки функциональности применяется крейт `thiserror`.

use thiserror::Error;

/// Дерево ошибок приложений Afisha.
#[derive(Error, Debug)]
pub enum AfishaError {
    /// Некорректное значение.
    ///
    /// Например, код валюты, отличный от `rub` и `kzt`.
    #[error("неверное значение: {0}")]
    ValueError(String),

    /// Значение даты (времени) не удалось разобрать.
    #[error("не удалось разобрать дату в поле `{field}`: {value}")]
    DateError { field: String, value: String },

    /// Для заказа в иностранной валюте отсутствует курс на дату заказа.
    #[error("нет курса валюты на {date} для заказа {order_id}")]
    MissingRate { order_id: u64, date: String },

    /// Ошибка ввода-вывода.
    #[error("ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка чтения или записи CSV.
    #[error("ошибка CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Ошибка сериализации JSON.
    #[error("ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl AfishaError {
    /// Конструктор для ошибки [`AfishaError::ValueError`].
    pub fn value_err(message: impl Into<String>) -> AfishaError {
        Self::ValueError(message.into())
    }

    /// Конструктор для ошибки [`AfishaError::DateError`].
    pub fn date_err(field: impl Into<String>, value: impl Into<String>) -> AfishaError {
        Self::DateError {
            field: field.into(),
            value: value.into(),
        }
    }
}
