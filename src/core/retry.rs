//! 有界线性退避重试

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use log::warn;

/// 单次调用内的顺序 sleep-and-reattempt 循环。
/// 判定为不可重试的错误立即返回，重试耗尽后返回最后一次的错误。
#[derive(Debug, Clone)]
pub struct Backoff {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_secs(3),
        }
    }
}

impl Backoff {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    pub fn run<T, E, F, C>(&self, mut op: F, is_transient: C) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
        C: Fn(&E) -> bool,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= attempts || !is_transient(&err) {
                        return Err(err);
                    }
                    // 线性增长：3s, 6s, 9s, ...
                    let delay = self.base_delay * attempt;
                    warn!(
                        "attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, attempts, err, delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn immediate(attempts: u32) -> Backoff {
        Backoff::new(attempts, Duration::ZERO)
    }

    #[test]
    fn test_succeeds_first_try() {
        let result: Result<u32, TestError> = immediate(3).run(|_| Ok(7), |_| true);
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_retries_transient_until_success() {
        let mut calls = 0;
        let result = immediate(5).run(
            |attempt| {
                calls += 1;
                if attempt < 3 {
                    Err(TestError::Transient)
                } else {
                    Ok(attempt)
                }
            },
            |e| *e == TestError::Transient,
        );
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_fatal_error_stops_immediately() {
        let mut calls = 0;
        let result: Result<(), TestError> = immediate(5).run(
            |_| {
                calls += 1;
                Err(TestError::Fatal)
            },
            |e| *e == TestError::Transient,
        );
        assert_eq!(result.unwrap_err(), TestError::Fatal);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_exhaustion_returns_last_error() {
        let mut calls = 0;
        let result: Result<(), TestError> = immediate(4).run(
            |_| {
                calls += 1;
                Err(TestError::Transient)
            },
            |_| true,
        );
        assert_eq!(result.unwrap_err(), TestError::Transient);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let mut calls = 0;
        let result: Result<u32, TestError> = Backoff::new(0, Duration::ZERO).run(
            |_| {
                calls += 1;
                Ok(1)
            },
            |_| true,
        );
        assert!(result.is_ok());
        assert_eq!(calls, 1);
    }
}
