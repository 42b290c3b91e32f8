//! Универсальные трейты для приложений Afisha.

/// Строка сводной таблицы, пригодная для вывода в консоль.
///
/// Реализацию удобно получать derive-макросом `macros::TableRow`.
pub trait TableRow {
    /// Заголовки столбцов.
    fn headers() -> Vec<&'static str>;
    /// Текстовые значения ячеек строки, в порядке заголовков.
    fn cells(&self) -> Vec<String>;
}

/// Сформировать выровненную текстовую таблицу из первых `limit` строк.
///
/// Столбцы разделяются ` | `, под заголовком выводится линия из `-`.
pub fn render_table<T: TableRow>(rows: &[T], limit: usize) -> String {
    let headers = T::headers();
    let body: Vec<Vec<String>> = rows.iter().take(limit).map(T::cells).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(headers.iter().map(|h| h.to_string()).collect()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in body {
        out.push_str(&format_line(row));
        out.push('\n');
    }
    out
}
