use colored::Colorize;
use lp_overlay::PartialRecord;

pub mod config;

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

/// `f_SPEED=2.5, s_NAME="Hero"`, or `(key only)` for a record with no fields.
pub fn format_fields(record: &PartialRecord) -> String {
    if record.fields.is_empty() {
        return "(key only)".dimmed().to_string();
    }
    record
        .fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Owner column shared by every listing.
pub fn format_owner(owner: &str) -> String {
    format!("[{}]", owner).bright_magenta().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_fields_sorted_by_name() {
        colored::control::set_override(false);
        let record = PartialRecord::new(1)
            .with("s_NAME", "Hero")
            .with("f_SPEED", 2.5f32);
        assert_eq!(format_fields(&record), "f_SPEED=2.5, s_NAME=\"Hero\"");
        assert_eq!(format_fields(&PartialRecord::new(1)), "(key only)");
    }
}
