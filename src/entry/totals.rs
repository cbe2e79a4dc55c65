use std::time::Duration;

use grinder_bridge::results::Sample;
use tracing::info;

/// Running counters over every sample read during a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RunTotals {
    samples: u64,
    errors: u64,
    response_time: Duration,
    first_timestamp: Option<u64>,
    last_timestamp: Option<u64>,
}

impl RunTotals {
    pub(crate) fn record(&mut self, sample: &Sample) {
        self.samples = self.samples.saturating_add(1);
        if sample.error.is_some() {
            self.errors = self.errors.saturating_add(1);
        }
        self.response_time = self.response_time.saturating_add(sample.response_time);
        self.first_timestamp = Some(
            self.first_timestamp
                .map_or(sample.timestamp, |first| first.min(sample.timestamp)),
        );
        self.last_timestamp = Some(
            self.last_timestamp
                .map_or(sample.timestamp, |last| last.max(sample.timestamp)),
        );
    }

    pub(crate) fn extend<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = Sample>,
    {
        for sample in samples {
            self.record(&sample);
        }
    }

    #[must_use]
    pub(crate) const fn samples(&self) -> u64 {
        self.samples
    }

    #[must_use]
    pub(crate) const fn errors(&self) -> u64 {
        self.errors
    }

    #[must_use]
    pub(crate) fn mean_response_time(&self) -> Option<Duration> {
        let nanos = self
            .response_time
            .as_nanos()
            .checked_div(u128::from(self.samples))?;
        u64::try_from(nanos).ok().map(Duration::from_nanos)
    }

    pub(crate) fn log_summary(&self) {
        let span_secs = match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            (None, _) | (_, None) => 0,
        };
        info!(
            "Samples: {}, errors: {}, mean response time: {} ms, span: {} s",
            self.samples,
            self.errors,
            self.mean_response_time().map_or(0, |mean| mean.as_millis()),
            span_secs
        );
    }
}
