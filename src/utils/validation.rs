//! Input validation utilities

use crate::constants;
use crate::models::Language;

/// Validate source code size in bytes
pub fn validate_source_code(code: &str, max_bytes: usize) -> Result<(), String> {
    if code.trim().is_empty() {
        return Err("Source code cannot be empty".to_string());
    }
    if code.len() > max_bytes {
        return Err(format!(
            "Source code exceeds maximum size of {max_bytes} bytes"
        ));
    }
    Ok(())
}

/// Validate programming language
pub fn validate_language(language: &str) -> Result<Language, String> {
    language.parse().map_err(|_| {
        format!(
            "Unsupported language '{language}', expected one of: {}",
            constants::languages::ALL.join(", ")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_source_code() {
        assert!(validate_source_code("int main() { return 0; }", 50_000).is_ok());
        assert!(validate_source_code("", 50_000).is_err());
        assert!(validate_source_code("  \n\t", 50_000).is_err());

        let exact = "a".repeat(50_000);
        assert!(validate_source_code(&exact, 50_000).is_ok());
        let oversized = "a".repeat(50_001);
        assert!(validate_source_code(&oversized, 50_000).is_err());
    }

    #[test]
    fn test_source_limit_counts_bytes() {
        // 'é' is two bytes in UTF-8
        let code = "é".repeat(30);
        assert_eq!(code.chars().count(), 30);
        assert!(validate_source_code(&code, 59).is_err());
        assert!(validate_source_code(&code, 60).is_ok());
    }

    #[test]
    fn test_validate_language() {
        assert_eq!(validate_language("cpp").unwrap(), Language::Cpp);
        assert_eq!(validate_language("python").unwrap(), Language::Python);
        assert!(validate_language("rust").is_err());
        assert!(validate_language("").is_err());
    }
}
