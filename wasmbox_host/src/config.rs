use crate::DEFAULT_MAX_MEMORY;

/// Host-side limits and switches applied to a [`crate::Runtime`].
pub struct Config {
    pub(crate) max_memory: usize,
    pub(crate) fuel: Option<u64>,
    pub(crate) text: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_memory: DEFAULT_MAX_MEMORY,
            fuel: None,
            text: true,
        }
    }
}

impl Config {
    pub(crate) fn engine_config(&self) -> wasmtime::Config {
        let mut cfg = wasmtime::Config::new();
        cfg.consume_fuel(self.fuel.is_some());
        cfg
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Upper bound on guest linear memory, enforced through the store limiter.
    pub fn max_memory(mut self, size: usize) -> Self {
        self.config.max_memory = size;
        self
    }

    /// Instruction budget for the whole call sequence. Exhaustion surfaces
    /// as an out-of-fuel trap on the running invocation.
    pub fn fuel(mut self, fuel: u64) -> Self {
        self.config.fuel = Some(fuel);
        self
    }

    /// Accept text format modules (on by default).
    pub fn text(mut self, accept: bool) -> Self {
        self.config.text = accept;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl From<ConfigBuilder> for Config {
    fn from(builder: ConfigBuilder) -> Self {
        builder.build()
    }
}
