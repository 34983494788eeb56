//! Sliding-window admission control for outbound provider calls

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::core::errors::{Result, TranslationError};
use crate::core::models::RateBudget;

/// Shortest pause between admission polls
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Timestamps of calls admitted under one budget
#[derive(Debug)]
struct RateWindow {
    budget: RateBudget,
    admitted: VecDeque<Instant>,
}

impl RateWindow {
    fn new(budget: RateBudget) -> Self {
        Self {
            budget,
            admitted: VecDeque::with_capacity(budget.max_requests.min(1024)),
        }
    }

    fn purge(&mut self, now: Instant) {
        let window = self.budget.window();
        while let Some(&oldest) = self.admitted.front() {
            if now.duration_since(oldest) >= window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }

    fn has_room(&self) -> bool {
        self.admitted.len() < self.budget.max_requests
    }

    /// Time until the oldest entry leaves the window
    fn wait_time(&self, now: Instant) -> Duration {
        if self.has_room() {
            return Duration::ZERO;
        }
        self.admitted
            .front()
            .map(|&oldest| (oldest + self.budget.window()).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

/// Usage of one budget at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub max_requests: usize,
    pub window_ms: u64,
    /// Calls admitted inside the current window
    pub in_window: usize,
    /// Calls still admissible before the window is full
    pub remaining: usize,
}

/// Snapshot of every budget
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub budgets: Vec<BudgetStatus>,
    pub can_admit: bool,
    /// Advisory wait before the next admission, 0 when `can_admit`
    pub wait_time_ms: u64,
}

/// Admission controller shared by every caller of one remote quota
#[derive(Debug)]
pub struct AdmissionController {
    windows: Mutex<Vec<RateWindow>>,
}

impl AdmissionController {
    /// Create a controller enforcing every budget at once
    ///
    /// Every budget must allow at least one request per window of at least 1 ms.
    pub fn new(budgets: impl IntoIterator<Item = RateBudget>) -> Result<Self> {
        let windows = budgets
            .into_iter()
            .map(|budget| {
                budget.validate().map_err(|e| TranslationError::ConfigError {
                    message: format!("invalid rate budget {:?}: {}", budget, e),
                })?;
                Ok(RateWindow::new(budget))
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Admission controller enforcing {} budget(s)", windows.len());
        Ok(Self {
            windows: Mutex::new(windows),
        })
    }

    /// Admit now if every budget has room, recording the call in each window
    pub async fn try_admit(&self) -> bool {
        self.admit_or_wait().await.is_ok()
    }

    /// Advisory time until `try_admit` would next succeed
    pub async fn wait_time(&self) -> Duration {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        Self::longest_wait(&mut windows, now)
    }

    /// Suspend until a slot is free, then take it
    pub async fn block_until_admitted(&self) {
        loop {
            match self.admit_or_wait().await {
                Ok(()) => return,
                Err(wait) => {
                    debug!("Rate limit reached, waiting {:?}", wait);
                    sleep(wait.max(MIN_POLL_INTERVAL)).await;
                }
            }
        }
    }

    /// Current usage of each budget; never consumes a slot
    pub async fn status(&self) -> RateLimitStatus {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let wait = Self::longest_wait(&mut windows, now);

        let budgets = windows
            .iter()
            .map(|w| BudgetStatus {
                max_requests: w.budget.max_requests,
                window_ms: w.budget.window_ms,
                in_window: w.admitted.len(),
                remaining: w.budget.max_requests.saturating_sub(w.admitted.len()),
            })
            .collect();

        RateLimitStatus {
            budgets,
            can_admit: wait.is_zero(),
            wait_time_ms: wait.as_millis() as u64,
        }
    }

    /// Check-and-append under one lock; on refusal return the advisory wait
    async fn admit_or_wait(&self) -> std::result::Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let wait = Self::longest_wait(&mut windows, now);

        if windows.iter().any(|w| !w.has_room()) {
            return Err(wait);
        }

        for window in windows.iter_mut() {
            window.admitted.push_back(now);
        }
        Ok(())
    }

    fn longest_wait(windows: &mut [RateWindow], now: Instant) -> Duration {
        windows
            .iter_mut()
            .map(|w| {
                w.purge(now);
                w.wait_time(now)
            })
            .max()
            .unwrap_or(Duration::ZERO)
    }
}
