use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Message recovered from a panic payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicInfo {
    pub message: String,
}

impl PanicInfo {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        Self { message }
    }
}

impl fmt::Display for PanicInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Run `f`, turning a panic into an error value.
pub(crate) fn catch<F, R>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(PanicInfo::from_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catch_str_panic() {
        let result: Result<(), _> = catch(|| panic!("test panic"));
        assert_eq!(result.unwrap_err().message, "test panic");
    }

    #[test]
    fn test_catch_formatted_panic() {
        let n = 7;
        let result: Result<(), _> = catch(|| panic!("bad index {}", n));
        assert_eq!(result.unwrap_err().to_string(), "bad index 7");
    }

    #[test]
    fn test_catch_success() {
        assert_eq!(catch(|| 42).unwrap(), 42);
    }
}
