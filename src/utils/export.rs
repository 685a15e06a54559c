use crate::domain::model::{estimated_total, SelectionEntry};
use crate::utils::error::{PlannerError, Result};

const SHOPPING_LIST_HEADER: [&str; 7] = [
    "name",
    "package_size",
    "unit_description",
    "retail_price",
    "quantity",
    "line_total",
    "matched_term",
];

/// 將選購清單輸出為 CSV，最後一列為估計總額
pub fn shopping_list_csv(entries: &[SelectionEntry]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SHOPPING_LIST_HEADER)?;

    for entry in entries {
        let quantity = entry.quantity.to_string();
        let line_total = format!("{:.2}", entry.line_total());
        writer.write_record([
            entry.name(),
            entry.product.package_size.as_deref().unwrap_or(""),
            entry.product.unit_description.as_deref().unwrap_or(""),
            entry.product.retail_price.as_deref().unwrap_or(""),
            quantity.as_str(),
            line_total.as_str(),
            entry.product.matched_term.as_str(),
        ])?;
    }

    let total = format!("{:.2}", estimated_total(entries));
    writer.write_record(["TOTAL", "", "", "", "", total.as_str(), ""])?;

    let bytes = writer
        .into_inner()
        .map_err(|e| PlannerError::IoError(std::io::Error::other(e.to_string())))?;
    String::from_utf8(bytes)
        .map_err(|e| PlannerError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
