use crate::framework::INFINITY;
use std::cmp::min;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Adds two metrics, saturating at INFINITY
///
/// # Examples
///
/// ```
/// use ripng::framework::INFINITY;
/// assert_eq!(ripng::util::sum_inf(2, 4), 6);
/// assert_eq!(ripng::util::sum_inf(15, 3), INFINITY);
/// assert_eq!(ripng::util::sum_inf(INFINITY, 1), INFINITY);
/// ```
pub fn sum_inf(metric: u8, cost: u8) -> u8 {
    min(INFINITY as u16, metric as u16 + cost as u16) as u8
}

/// Virtual time printed as seconds with millisecond precision, used in log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Secs(pub Duration);

impl Display for Secs {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>8.3}s", self.0.as_secs_f64())
    }
}
