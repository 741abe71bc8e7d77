/// One of the three reported case categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Confirmed,
    Recovered,
    Deaths,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Confirmed, Category::Recovered, Category::Deaths];

    /// Property key in the feed.
    pub fn key(self) -> &'static str {
        match self {
            Category::Confirmed => "confirmed",
            Category::Recovered => "recovered",
            Category::Deaths => "deaths",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Confirmed => "Confirmed",
            Category::Recovered => "Recovered",
            Category::Deaths => "Deaths",
        }
    }
}

/// Cumulative counts on a shared time axis (seconds since the epoch).
/// All four vectors always have the same length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Series {
    pub time: Vec<i64>,
    pub confirmed: Vec<u64>,
    pub recovered: Vec<u64>,
    pub deaths: Vec<u64>,
}

impl Series {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            time: Vec::with_capacity(capacity),
            confirmed: Vec::with_capacity(capacity),
            recovered: Vec::with_capacity(capacity),
            deaths: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, time: i64, confirmed: u64, recovered: u64, deaths: u64) {
        self.time.push(time);
        self.confirmed.push(confirmed);
        self.recovered.push(recovered);
        self.deaths.push(deaths);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn counts(&self, category: Category) -> &[u64] {
        match category {
            Category::Confirmed => &self.confirmed,
            Category::Recovered => &self.recovered,
            Category::Deaths => &self.deaths,
        }
    }

    fn counts_mut(&mut self, category: Category) -> &mut Vec<u64> {
        match category {
            Category::Confirmed => &mut self.confirmed,
            Category::Recovered => &mut self.recovered,
            Category::Deaths => &mut self.deaths,
        }
    }

    /// Counts at index `i`; all zero out of range.
    pub fn at(&self, i: usize) -> (u64, u64, u64) {
        match (self.confirmed.get(i), self.recovered.get(i), self.deaths.get(i)) {
            (Some(&c), Some(&r), Some(&d)) => (c, r, d),
            _ => (0, 0, 0),
        }
    }

    pub fn latest(&self) -> (u64, u64, u64) {
        self.len().checked_sub(1).map_or((0, 0, 0), |last| self.at(last))
    }

    pub fn last_time(&self) -> Option<i64> {
        self.time.last().copied()
    }

    /// Add `other` into `self` aligned on the most recent sample. The longer
    /// time axis wins; a shorter history adds nothing to earlier indices.
    pub fn add_aligned_from_end(&mut self, other: &Series) {
        if other.len() > self.len() {
            let missing = other.len() - self.len();
            self.time.splice(0..0, other.time[..missing].iter().copied());
            for category in Category::ALL {
                self.counts_mut(category)
                    .splice(0..0, std::iter::repeat(0).take(missing));
            }
        }

        let offset = self.len() - other.len();
        for category in Category::ALL {
            let target = &mut self.counts_mut(category)[offset..];
            for (sum, &count) in target.iter_mut().zip(other.counts(category)) {
                *sum += count;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(time: &[i64], confirmed: &[u64]) -> Series {
        let mut s = Series::default();
        for (&t, &c) in time.iter().zip(confirmed) {
            s.push(t, c, c / 2, c / 4);
        }
        s
    }

    #[test]
    fn test_add_shorter_history_aligns_from_end() {
        let mut total = series(&[1, 2, 3, 4], &[1, 2, 3, 4]);
        total.add_aligned_from_end(&series(&[3, 4], &[10, 20]));
        assert_eq!(total.time, vec![1, 2, 3, 4]);
        assert_eq!(total.confirmed, vec![1, 2, 13, 24]);
        assert_eq!(total.recovered, vec![0, 1, 6, 12]);
    }

    #[test]
    fn test_add_longer_history_extends_axis() {
        let mut total = series(&[3, 4], &[10, 20]);
        total.add_aligned_from_end(&series(&[1, 2, 3, 4], &[1, 2, 3, 4]));
        assert_eq!(total.time, vec![1, 2, 3, 4]);
        assert_eq!(total.confirmed, vec![1, 2, 13, 24]);
        assert_eq!(total.deaths, vec![0, 0, 2, 6]);
    }

    #[test]
    fn test_latest_of_empty_series_is_zero() {
        let s = Series::default();
        assert_eq!(s.latest(), (0, 0, 0));
        assert_eq!(s.last_time(), None);
    }
}
