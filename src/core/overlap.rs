use crate::models::AvailabilityBlock;

/// Calculate the total overlap between two availability schedules in hours
///
/// Every window from one schedule is intersected with every window from the
/// other and the overlapping minutes are summed. Windows are half-open, so
/// a block ending at 12:00 does not overlap a block starting at 12:00.
///
/// # Arguments
/// * `a` - First schedule's windows in minutes since midnight
/// * `b` - Second schedule's windows in minutes since midnight
///
/// # Returns
/// Overlap in fractional hours, 0.0 when the schedules never coincide
pub fn availability_overlap_hours(a: &[AvailabilityBlock], b: &[AvailabilityBlock]) -> f64 {
    let mut minutes: u32 = 0;
    for first in a {
        for second in b {
            minutes += u32::from(overlap_minutes(first, second));
        }
    }
    f64::from(minutes) / 60.0
}

/// Overlap between two windows in minutes, 0 when they are disjoint
#[inline]
fn overlap_minutes(a: &AvailabilityBlock, b: &AvailabilityBlock) -> u16 {
    let start = a.start_min.max(b.start_min);
    let end = a.end_min.min(b.end_min);
    end.saturating_sub(start)
}
