use chrono::{Days, NaiveDate};

/// Calendar clock shared by all agents of one simulation model.
///
/// A tick is one simulated day. The clock is owned by the model and advanced
/// once per step; agents only ever read `date` and `tick`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use ec_sim::sim::clock::SimulationClock;
///
/// let start = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap();
/// let mut clock = SimulationClock::new(start);
/// clock.advance();
/// assert_eq!(clock.tick(), 1);
/// assert_eq!(clock.date(), NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    /// First simulated day (tick 0).
    start: NaiveDate,
    /// Days elapsed since `start`.
    tick: usize,
}

impl SimulationClock {
    /// Creates a clock positioned at tick 0 on `start`.
    pub fn new(start: NaiveDate) -> Self {
        Self { start, tick: 0 }
    }

    /// Current tick (days since start).
    pub fn tick(&self) -> usize {
        self.tick
    }

    /// First simulated day.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Calendar day of the current tick.
    pub fn date(&self) -> NaiveDate {
        tick_to_date(self.start, self.tick)
    }

    /// Calendar day after the current tick, used for day-ahead lookups.
    pub fn next_date(&self) -> NaiveDate {
        tick_to_date(self.start, self.tick + 1)
    }

    /// Moves the clock forward by one day and returns the new tick.
    pub fn advance(&mut self) -> usize {
        self.tick += 1;
        self.tick
    }
}

/// Converts a tick into a calendar day relative to `start`.
///
/// Saturates at [`NaiveDate::MAX`] instead of overflowing.
pub fn tick_to_date(start: NaiveDate, tick: usize) -> NaiveDate {
    start
        .checked_add_days(Days::new(tick as u64))
        .unwrap_or(NaiveDate::MAX)
}

/// Converts a calendar day into a tick relative to `start`.
///
/// Returns `None` for days before `start`.
pub fn date_to_tick(start: NaiveDate, date: NaiveDate) -> Option<usize> {
    let days = (date - start).num_days();
    usize::try_from(days).ok()
}

/// Day after `date`, saturating at [`NaiveDate::MAX`].
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}
