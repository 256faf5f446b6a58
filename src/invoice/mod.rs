//! Invoice rendering
//!
//! Fixed-width text receipts. Rendering is pure: the same cart, method
//! and timestamp give byte-identical output. Writing goes to the user's
//! Downloads directory unless the configuration overrides it.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cart::Cart;
use crate::payment::PaymentMethod;

/// Receipt width in characters
const WIDTH: usize = 50;

/// Invoice identifier derived from the issue timestamp
pub fn invoice_id(issued_at: DateTime<Local>) -> String {
    format!("INV_{}", issued_at.format("%Y%m%d_%H%M%S"))
}

/// Render the receipt for a cart. Excluded lines and zero quantities are
/// left off; the layout is fixed-width with comma-grouped prices.
pub fn render(cart: &Cart, method: &PaymentMethod, issued_at: DateTime<Local>) -> String {
    let totals = cart.totals();
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("{}{}", " ".repeat(20), "TRAY TILL"));
    lines.push(format!("{}{}", " ".repeat(18), "=".repeat(30)));
    lines.push(format!("{}{}", " ".repeat(20), "HÓA ĐƠN BÁN HÀNG"));
    lines.push(format!("{}{}", " ".repeat(18), "=".repeat(30)));
    lines.push(String::new());
    lines.push(format!("Ngày: {}", issued_at.format("%d/%m/%Y %H:%M:%S")));
    lines.push(format!("Mã HĐ: {}", invoice_id(issued_at)));
    lines.push(format!("Phương thức: {}", method.display_name()));
    lines.push("-".repeat(WIDTH));
    lines.push(format!(
        "{:<25} {:>3} {:>12} {:>12}",
        "Tên món", "SL", "Giá", "TT"
    ));
    lines.push("-".repeat(WIDTH));

    for item in cart.items().iter().filter(|item| item.billable()) {
        lines.push(format!(
            "{:<25} {:>3} {:>11}đ {:>11}đ",
            truncate(&item.display_name, 23),
            item.quantity,
            group_thousands(item.price as u64),
            group_thousands(item.line_total()),
        ));
    }

    lines.push("-".repeat(WIDTH));
    lines.push(format!("{:<25} {:>3}", "Tổng số phần:", totals.items));
    lines.push(format!(
        "{:<25} {} kcal",
        "Tổng calo:",
        group_thousands(totals.calories)
    ));
    lines.push(String::new());
    lines.push(format!(
        "{:<25} {:>11}đ",
        "TỔNG TIỀN:",
        group_thousands(totals.price)
    ));
    lines.push(String::new());
    lines.push(format!("{}{}", " ".repeat(15), "Cảm ơn quý khách!"));
    lines.push(format!("{}{}", " ".repeat(12), "Hẹn gặp lại"));
    lines.push("=".repeat(WIDTH));

    lines.join("\n")
}

/// Render and save an invoice under `dir`, named by the issue timestamp.
pub fn write_invoice(
    dir: &Path,
    cart: &Cart,
    method: &PaymentMethod,
    issued_at: DateTime<Local>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create invoice directory {:?}", dir))?;
    let file_name = format!("HoaDon_Food_{}.txt", issued_at.format("%Y%m%d_%H%M%S"));
    let path = dir.join(file_name);
    let content = render(cart, method, issued_at);
    std::fs::write(&path, content)
        .with_context(|| format!("failed to write invoice {:?}", path))?;
    info!("Invoice saved to {:?}", path);
    Ok(path)
}

/// Default invoice directory: the user's Downloads folder.
pub fn default_invoice_dir() -> Result<PathBuf> {
    let user_dirs = directories::UserDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Could not determine user directories"))?;
    match user_dirs.download_dir() {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(user_dirs.home_dir().join("Downloads")),
    }
}

fn truncate(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}

/// Comma-group an integer (12345 -> "12,345")
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogEntry};
    use crate::detect::Detection;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn entry(name: &str, price: u32, calories: u32) -> CatalogEntry {
        CatalogEntry {
            name_vi: name.to_string(),
            price,
            calories,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            description: String::new(),
        }
    }

    fn detection(label: &str) -> Detection {
        Detection {
            label: label.to_string(),
            confidence: 0.9,
        }
    }

    fn sample_cart() -> Cart {
        let mut entries = HashMap::new();
        entries.insert("Pho_bo".to_string(), entry("Phở bò", 45000, 350));
        entries.insert("Banh_mi".to_string(), entry("Bánh mì", 20000, 250));
        let catalog = Catalog::new(entries);
        let detections = vec![
            detection("Pho_bo"),
            detection("Pho_bo"),
            detection("Banh_mi"),
        ];
        Cart::from_detections(&detections, &catalog)
    }

    fn issue_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_render_is_deterministic() {
        let cart = sample_cart();
        let first = render(&cart, &PaymentMethod::Cash, issue_time());
        let second = render(&cart, &PaymentMethod::Cash, issue_time());
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_layout() {
        let cart = sample_cart();
        let rendered = render(&cart, &PaymentMethod::Momo, issue_time());

        assert!(rendered.contains("HÓA ĐƠN BÁN HÀNG"));
        assert!(rendered.contains("Ngày: 01/03/2024 12:30:45"));
        assert!(rendered.contains("Mã HĐ: INV_20240301_123045"));
        assert!(rendered.contains("Phương thức: Momo"));

        let pho_line = format!("{:<25} {:>3} {:>11}đ {:>11}đ", "Phở bò", 2, "45,000", "90,000");
        let banh_mi_line =
            format!("{:<25} {:>3} {:>11}đ {:>11}đ", "Bánh mì", 1, "20,000", "20,000");
        assert!(rendered.lines().any(|line| line == pho_line));
        assert!(rendered.lines().any(|line| line == banh_mi_line));

        let total_line = format!("{:<25} {:>11}đ", "TỔNG TIỀN:", "110,000");
        assert!(rendered.lines().any(|line| line == total_line));
        assert!(rendered.contains("Tổng số phần:"));
        assert!(rendered.contains("950 kcal"));
        assert!(rendered.ends_with(&"=".repeat(50)));
    }

    #[test]
    fn test_excluded_lines_left_off() {
        let mut cart = sample_cart();
        cart.toggle_excluded(None, "Banh_mi");

        let rendered = render(&cart, &PaymentMethod::Cash, issue_time());
        assert!(!rendered.contains("Bánh mì"));

        let total_line = format!("{:<25} {:>11}đ", "TỔNG TIỀN:", "90,000");
        assert!(rendered.lines().any(|line| line == total_line));
    }

    #[test]
    fn test_long_names_truncated() {
        let mut entries = HashMap::new();
        entries.insert(
            "Com_tam".to_string(),
            entry("Cơm tấm sườn bì chả trứng ốp la đặc biệt", 55000, 650),
        );
        let catalog = Catalog::new(entries);
        let cart = Cart::from_detections(&[detection("Com_tam")], &catalog);

        let rendered = render(&cart, &PaymentMethod::Cash, issue_time());
        let truncated: String = "Cơm tấm sườn bì chả trứng ốp la đặc biệt"
            .chars()
            .take(23)
            .collect();
        assert!(rendered.contains(&truncated));
        assert!(!rendered.contains("đặc biệt"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(45000), "45,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_write_invoice_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cart = sample_cart();

        let path = write_invoice(dir.path(), &cart, &PaymentMethod::VietQr, issue_time()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "HoaDon_Food_20240301_123045.txt"
        );

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render(&cart, &PaymentMethod::VietQr, issue_time()));
    }

    #[test]
    fn test_write_invoice_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("invoices").join("2024");
        let cart = sample_cart();

        let path = write_invoice(&nested, &cart, &PaymentMethod::Cash, issue_time()).unwrap();
        assert!(path.exists());
        assert!(path.starts_with(&nested));
    }
}
