use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub missions_created_total: IntCounter,
    pub transitions_total: IntCounterVec,
    pub verification_failures_total: IntCounterVec,
    pub missions_active: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let missions_created_total =
            IntCounter::new("missions_created_total", "Total missions created")
                .expect("valid missions_created_total metric");

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Mission transitions by outcome"),
            &["transition", "outcome"],
        )
        .expect("valid transitions_total metric");

        let verification_failures_total = IntCounterVec::new(
            Opts::new(
                "verification_failures_total",
                "Rejected checkpoint scans by checkpoint",
            ),
            &["checkpoint"],
        )
        .expect("valid verification_failures_total metric");

        let missions_active = IntGauge::new(
            "missions_active",
            "Missions not yet delivered or cancelled",
        )
        .expect("valid missions_active metric");

        registry
            .register(Box::new(missions_created_total.clone()))
            .expect("register missions_created_total");
        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(verification_failures_total.clone()))
            .expect("register verification_failures_total");
        registry
            .register(Box::new(missions_active.clone()))
            .expect("register missions_active");

        Self {
            registry,
            missions_created_total,
            transitions_total,
            verification_failures_total,
            missions_active,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
