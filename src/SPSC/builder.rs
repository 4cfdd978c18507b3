use crate::Core::region::SharedRegion;
use crate::SPSC::InPlace;

/// Places queues in named shared-memory regions.
///
/// ```no_run
/// use dmxp_spsc::SPSC::RegionBuilder;
/// use dmxp_spsc::SPSC::Variable::VariableQueue;
///
/// let region = RegionBuilder::new()
///     .with_name("telemetry")
///     .create::<VariableQueue<65536>>()?;
/// let mut producer = region.queue().producer().expect("producer already claimed");
/// producer.send(b"hello")?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct RegionBuilder {
    name: String,
}

impl Default for RegionBuilder {
    fn default() -> Self {
        Self {
            name: String::from("dmxp_spsc"), // Default region name
        }
    }
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the region and construct an empty queue in it. Fails with `AlreadyExists` if
    /// a region with this name is present.
    pub fn create<Q: InPlace>(self) -> std::io::Result<SharedRegion<Q>> {
        SharedRegion::create(&self.name)
    }

    /// Attach to a region created by another process (or another part of this one).
    pub fn attach<Q: InPlace>(self) -> std::io::Result<SharedRegion<Q>> {
        SharedRegion::attach(&self.name)
    }

    /// Attach if the region exists, otherwise create it.
    pub fn open_or_create<Q: InPlace>(self) -> std::io::Result<SharedRegion<Q>> {
        match SharedRegion::attach(&self.name) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SharedRegion::create(&self.name),
            other => other,
        }
    }
}
