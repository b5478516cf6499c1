#[derive(Clone, Debug, Default)]
pub struct MemConfig {
    /// If true, every provider call is appended to the call log.
    pub record_calls: bool,
}
