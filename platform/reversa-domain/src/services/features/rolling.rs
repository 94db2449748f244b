use std::collections::VecDeque;

/// Trailing simple moving average that yields a value only once the window
/// is full and holds no missing entries.
#[derive(Debug, Clone)]
pub struct RollingSma {
    window: usize,
    buf: VecDeque<Option<f64>>,
    sum: f64,
    missing: usize,
}

impl RollingSma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::with_capacity(window),
            sum: 0.0,
            missing: 0,
        }
    }

    pub fn update(&mut self, value: Option<f64>) -> Option<f64> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        match value {
            Some(v) => self.sum += v,
            None => self.missing += 1,
        }
        while self.buf.len() > self.window {
            match self.buf.pop_front() {
                Some(Some(front)) => self.sum -= front,
                Some(None) => self.missing -= 1,
                None => {}
            }
        }

        if self.buf.len() == self.window && self.missing == 0 {
            Some(self.sum / self.window as f64)
        } else {
            None
        }
    }
}
