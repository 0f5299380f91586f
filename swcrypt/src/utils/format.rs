//! Formatting utilities

use humansize::{DECIMAL, format_size};

/// Format bytes into human-readable size
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a provider diagnostic code the way the provider reports it
pub fn format_code(code: u32) -> String {
    format!("{code:#010X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(148), "148 B");
        assert_eq!(format_bytes(1024), "1.02 kB");
        assert_eq!(format_bytes(1_000_000), "1 MB");
    }

    #[test]
    fn test_format_code() {
        assert_eq!(format_code(0x8009_0006), "0x80090006");
        assert_eq!(format_code(0xEA), "0x000000EA");
    }
}
