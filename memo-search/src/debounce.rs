/// 输入稳定多久后才重新计算建议（毫秒）
pub const DEBOUNCE_MS: f64 = 300.0;

/// 到期的防抖查询
#[derive(Debug, Clone, PartialEq)]
pub struct DebouncedQuery {
    pub generation: u64,
    pub query: String,
}

/// 防抖器
///
/// 每次输入都会重新计时并前进 `generation`。计算结果带着发起时的 generation，
/// 落地时如果已经不是最新的就丢弃，避免旧结果覆盖新结果。
/// 时间由调用方传入，浏览器中取自 `performance.now()`。
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay_ms: f64,
    generation: u64,
    pending: Option<(String, f64)>,
}

impl Debouncer {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            generation: 0,
            pending: None,
        }
    }

    /// 记录一次输入，返回新的 generation
    pub fn input(&mut self, query: &str, now_ms: f64) -> u64 {
        self.generation += 1;
        self.pending = Some((query.to_string(), now_ms + self.delay_ms));
        self.generation
    }

    /// 到期时取出待计算的查询
    pub fn poll(&mut self, now_ms: f64) -> Option<DebouncedQuery> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now_ms => {
                let (query, _) = self.pending.take()?;
                Some(DebouncedQuery {
                    generation: self.generation,
                    query,
                })
            }
            _ => None,
        }
    }

    /// 放弃待计算的查询，之前发起的计算结果都视为过期
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 距离到期还有多久，没有待计算的查询时返回 `None`
    pub fn remaining_ms(&self, now_ms: f64) -> Option<f64> {
        self.pending
            .as_ref()
            .map(|(_, deadline)| (deadline - now_ms).max(0.0))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_after_quiet_period() {
        let mut debouncer = Debouncer::default();
        debouncer.input("r", 0.0);
        debouncer.input("ru", 100.0);
        assert_eq!(debouncer.poll(350.0), None);
        assert_eq!(debouncer.remaining_ms(350.0), Some(50.0));

        let fired = debouncer.poll(400.0).unwrap();
        assert_eq!(fired.query, "ru");
        assert_eq!(fired.generation, 2);
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(1000.0), None);
    }

    #[test]
    fn newer_input_makes_older_generation_stale() {
        let mut debouncer = Debouncer::new(10.0);
        debouncer.input("a", 0.0);
        let first = debouncer.poll(10.0).unwrap();
        debouncer.input("ab", 11.0);

        assert!(!debouncer.is_current(first.generation));
        assert!(debouncer.is_current(debouncer.generation()));

        debouncer.cancel();
        assert_eq!(debouncer.poll(100.0), None);
    }
}
