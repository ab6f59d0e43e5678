//! Result type alias for Harbor

use super::errors::HarborError;

/// Result type alias for Harbor operations
///
/// # Examples
///
/// ```
/// use harbor::domain::result::Result;
/// use harbor::domain::errors::HarborError;
///
/// fn failing_function() -> Result<()> {
///     Err(HarborError::InvalidInput("empty document".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, HarborError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
