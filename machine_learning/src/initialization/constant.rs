use super::ParamGen;

/// A parameter generator that always yields the same value.
pub struct ConstParamGen {
    value: f32,
    remaining: usize,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` yielding `value` at most `limit` times.
    pub fn new(value: f32, limit: usize) -> Self {
        Self {
            value,
            remaining: limit,
        }
    }
}

impl ParamGen for ConstParamGen {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        let n = n.min(self.remaining);
        self.remaining -= n;
        Some(vec![self.value; n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_limit() {
        let mut param_gen = ConstParamGen::new(2., 4);

        assert_eq!(param_gen.sample(3).unwrap(), vec![2.; 3]);
        assert_eq!(param_gen.sample(3).unwrap(), vec![2.; 1]);
        assert!(param_gen.sample(1).is_none());
    }
}
