/// Configuration for [`crate::BatchWriter`], grounded on the upstream
/// `batch.configuration` (`ReuseWriter`, `CloseConnector`).
#[derive(Debug, Clone)]
pub struct BatchWriterConfig {
    /// Keep the underlying `CommitWriter` open across calls to `write`
    /// instead of reopening one every time.
    pub reuse_writer: bool,
    /// Close the `Connector` itself (not just the connection it handed out)
    /// whenever this writer tears its handles down.
    pub close_connector: bool,
}

impl Default for BatchWriterConfig {
    fn default() -> Self {
        Self {
            reuse_writer: true,
            close_connector: true,
        }
    }
}

impl BatchWriterConfig {
    pub fn with_reuse_writer(mut self, value: bool) -> Self {
        self.reuse_writer = value;
        self
    }

    pub fn with_close_connector(mut self, value: bool) -> Self {
        self.close_connector = value;
        self
    }
}
