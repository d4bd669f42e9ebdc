use crate::scoring::AttemptRecord;

pub fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().sum::<f64>() / count as f64),
    }
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;

            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}

/// How consistently the player hit phase starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    pub mean_deviation: f64,
    pub std_dev: f64,
    pub perfect_hits: usize,
}

pub fn timing_summary(attempts: &[AttemptRecord]) -> Option<TimingSummary> {
    let deviations: Vec<f64> = attempts.iter().map(|a| a.deviation_secs).collect();
    Some(TimingSummary {
        mean_deviation: mean(&deviations)?,
        std_dev: std_dev(&deviations)?,
        perfect_hits: attempts
            .iter()
            .filter(|a| a.points_awarded >= crate::scoring::PERFECT_POINTS)
            .count(),
    })
}
