/// Strictly increasing absolute tick times for one phase, in seconds.
///
/// Once generated the schedule only changes through [`OnsetSchedule::shift_from`],
/// which moves a suffix forward by a non-negative offset and therefore keeps
/// the order intact.
#[derive(Clone, Debug, PartialEq)]
pub struct OnsetSchedule {
    onsets: Vec<f64>,
}

impl OnsetSchedule {
    /// Generates `onset[i] = lead_in + i / tick_rate_hz` covering `horizon_seconds`.
    #[must_use]
    pub fn generate(lead_in: f64, tick_rate_hz: f64, horizon_seconds: f64) -> Self {
        let count = (horizon_seconds * tick_rate_hz).ceil().max(0.0) as usize;
        let onsets = (0..count)
            .map(|index| lead_in + index as f64 / tick_rate_hz)
            .collect();
        Self { onsets }
    }

    /// Adds `offset` to every onset from `index` on; earlier onsets are untouched.
    pub fn shift_from(&mut self, index: usize, offset: f64) {
        let offset = offset.max(0.0);
        if let Some(suffix) = self.onsets.get_mut(index..) {
            for onset in suffix {
                *onset += offset;
            }
        }
    }

    /// Onset at `index`, if the schedule reaches that far.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.onsets.get(index).copied()
    }

    /// Number of scheduled ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.onsets.len()
    }

    /// Reports whether the schedule holds no ticks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.onsets.is_empty()
    }

    /// Onsets in tick order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.onsets
    }
}

#[cfg(test)]
mod tests {
    use super::OnsetSchedule;

    #[test]
    fn generation_covers_horizon_after_lead_in() {
        let schedule = OnsetSchedule::generate(1.0, 30.0, 10.0);

        assert_eq!(schedule.len(), 300);
        assert_eq!(schedule.get(0), Some(1.0));
        let last = schedule.get(299).expect("last onset");
        assert!((last - (1.0 + 299.0 / 30.0)).abs() < 1e-12);
        assert_eq!(schedule.get(300), None);
    }

    #[test]
    fn shifting_past_the_end_is_a_no_op() {
        let mut schedule = OnsetSchedule::generate(1.0, 10.0, 1.0);
        let before = schedule.clone();
        schedule.shift_from(10, 2.0);
        assert_eq!(schedule, before);
    }
}
