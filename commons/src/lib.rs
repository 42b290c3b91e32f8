use log::*;
use simplelog::{CombinedLogger, Config, WriteLogger};
use std::fs;
use std::fs::File;
use std::path::PathBuf;

pub mod errors;
pub mod models;
pub mod stats;
pub mod traits;
pub mod utils;

/// Фабрика по созданию индивидуальных логгеров для приложений.
///
/// Инициализация требуется один раз при запуске приложения. Далее используются
/// стандартные макросы [`log::info`], [`log::warn`], [`log::error`] для
/// логирования событий.
///
/// ## Args
///
/// - `app_name` — название приложения (будет использовано для создания файла)
/// - `log_dir` — путь к директории расположения log-файлов (при отсутствии
///   пытается создать)
/// - `level` — минимальный уровень записываемых сообщений
///
/// ## Пример
///
/// ```no_run
/// use log::*;
/// use commons::init_simple_logger;
/// use commons::utils::get_workspace_root;
///
/// let log_dir = get_workspace_root().join("log");
/// init_simple_logger("app_name", log_dir, LevelFilter::Info);
///
/// info!("Данные загружены");
/// warn!("Нет курса на дату заказа");
/// error!("Не удалось разобрать дату");
/// ```
///
/// ## Паника
///
/// Паникует при ошибке создания (открытия) директории и (или) log-файла,
/// и при инициализации логгера (предоставляет сообщение о причинах, если
/// есть).
pub fn init_simple_logger(app_name: &str, log_dir: PathBuf, level: LevelFilter) {
    let config = Config::default();
    let log_file_path = log_dir.join(format!("{}.log", app_name));

    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)
            .unwrap_or_else(|_| panic!("Не удалось сформировать путь: {}", log_dir.display()));
    }

    let log_file = File::create(&log_file_path)
        .unwrap_or_else(|_| panic!("Ошибка работы с log-файлом: {}", log_file_path.display()));

    let logger = WriteLogger::new(level, config, log_file);

    CombinedLogger::init(vec![logger])
        .unwrap_or_else(|e| panic!("Ошибка инициализации логгера: {e}"));
}
