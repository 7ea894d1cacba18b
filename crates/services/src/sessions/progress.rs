/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn new(total: usize, completed: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((completed * 100 + total / 2) / total).min(100) as u8
        };
        Self {
            total,
            completed,
            percent,
            is_complete: total > 0 && completed >= total,
        }
    }
}
