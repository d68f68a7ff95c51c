/// Automated multi-scenario validation of the publish path.
///
/// The harness drives the publisher facade through a fixed scenario sequence against a
/// live broker and records one [`ScenarioResult`] per scenario, judged on the client's
/// local publish acknowledgements only. A failing scenario never aborts the run: its
/// error is recorded and the remaining scenarios still execute, so every run ends in a
/// summary. Interrupting a run summarizes whatever already completed; untried scenarios
/// get no fabricated result. The client connection is released on every exit path.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::{
    client::PubSubClient,
    publisher::{PttPublisher, Session},
    PttResult,
};

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub namespace: String,
    pub channel: String,
    pub device_id: String,
    /// Channels exercised by the fan-out scenario.
    pub fanout_channels: Vec<String>,
    pub connect_timeout: Duration,
    /// Pause between scenarios, letting a slow broker drain.
    pub scenario_delay: Duration,
    pub burst_count: usize,
    /// Pause between publishes inside the burst scenario.
    pub burst_delay: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            namespace: "/WJI/PTT".to_string(),
            channel: "test".to_string(),
            device_id: "AUTO-TEST-001".to_string(),
            fanout_channels: vec![
                "channel1".to_string(),
                "channel2".to_string(),
                "emergency".to_string(),
            ],
            connect_timeout: Duration::from_secs(2),
            scenario_delay: Duration::from_secs(1),
            burst_count: 10,
            burst_delay: Duration::from_millis(100),
        }
    }
}

impl HarnessConfig {
    /// Zero-delay variant for in-process runs.
    pub fn without_delays(mut self) -> Self {
        self.scenario_delay = Duration::ZERO;
        self.burst_delay = Duration::ZERO;
        self
    }
}

/// Outcome of one scenario. Append-only: written once when the scenario finishes and
/// read at summary time.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: &'static str,
    pub success: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Idle,
    Connecting,
    Running(usize),
    Summarizing,
    Done,
}

/// Final report: ordered scenario results plus the aggregate count.
#[derive(Debug)]
pub struct HarnessReport {
    pub results: Vec<ScenarioResult>,
}

impl HarnessReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }
}

impl fmt::Display for HarnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario results:")?;
        for (i, result) in self.results.iter().enumerate() {
            let status = if result.success { "PASS" } else { "FAIL" };
            writeln!(
                f,
                "{:2}. {:<22} {}  {}",
                i + 1,
                result.name,
                status,
                result.detail
            )?;
        }
        write!(f, "total: {}/{} passed", self.passed(), self.total())
    }
}

type Scenario<C> = fn(&mut PttPublisher<C>, &HarnessConfig) -> PttResult<String>;

/// Number of scenarios in the fixed sequence.
pub const SCENARIO_COUNT: usize = 7;

fn scenarios<C: PubSubClient>() -> [(&'static str, Scenario<C>); SCENARIO_COUNT] {
    [
        ("text message", scenario_text),
        ("gps location", scenario_gps),
        ("sos alert", scenario_sos),
        ("broadcast", scenario_broadcast),
        ("mark start/stop", scenario_mark_pair),
        ("multi-channel fan-out", scenario_fanout),
        ("burst", scenario_burst),
    ]
}

pub struct TestHarness<C: PubSubClient> {
    publisher: PttPublisher<C>,
    config: HarnessConfig,
    state: HarnessState,
    interrupt: Arc<AtomicBool>,
}

impl<C: PubSubClient> TestHarness<C> {
    pub fn new(client: C, config: HarnessConfig) -> Self {
        Self {
            publisher: PttPublisher::new(client, &config.namespace),
            config,
            state: HarnessState::Idle,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    /// Flag shared with e.g. a signal handler; setting it stops the run after the
    /// scenario in flight and goes straight to the summary.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Connect, run every scenario in order, summarize, disconnect.
    ///
    /// Only a connect failure aborts without scenario data; any later error is
    /// downgraded to the failing scenario's result. The summary is produced on every
    /// other path, including interruption.
    pub fn run(&mut self) -> PttResult<HarnessReport> {
        self.state = HarnessState::Connecting;
        info!(namespace = %self.config.namespace, channel = %self.config.channel, "harness starting");

        if let Err(err) = self
            .publisher
            .client_mut()
            .connect(self.config.connect_timeout)
        {
            error!(error = %err, "broker connection failed, aborting run");
            self.publisher.client_mut().disconnect();
            self.state = HarnessState::Done;
            return Err(err);
        }

        let mut results = Vec::with_capacity(SCENARIO_COUNT);
        for (i, (name, scenario)) in scenarios::<C>().into_iter().enumerate() {
            if self.interrupt.load(Ordering::SeqCst) {
                warn!(completed = i, "run interrupted, summarizing early");
                break;
            }
            self.state = HarnessState::Running(i);
            info!(scenario = name, "running scenario");
            let result = match scenario(&mut self.publisher, &self.config) {
                Ok(detail) => ScenarioResult {
                    name,
                    success: true,
                    detail,
                },
                Err(err) => {
                    warn!(scenario = name, error = %err, "scenario failed");
                    ScenarioResult {
                        name,
                        success: false,
                        detail: err.to_string(),
                    }
                }
            };
            results.push(result);
            std::thread::sleep(self.config.scenario_delay);
        }

        self.state = HarnessState::Summarizing;
        let report = HarnessReport { results };
        info!(passed = report.passed(), total = report.total(), "run complete");
        info!("\n{}", report);

        self.publisher.client_mut().disconnect();
        self.state = HarnessState::Done;
        Ok(report)
    }
}

fn scenario_text<C: PubSubClient>(
    publisher: &mut PttPublisher<C>,
    config: &HarnessConfig,
) -> PttResult<String> {
    let session = Session::new(&config.channel, &config.device_id);
    let text = "automated check-in";
    publisher.publish_text(&session, text)?;
    Ok(format!("text {:?}", text))
}

fn scenario_gps<C: PubSubClient>(
    publisher: &mut PttPublisher<C>,
    config: &HarnessConfig,
) -> PttResult<String> {
    let session = Session::new(&config.channel, &config.device_id);
    let (lat, lon) = (25.033964, 121.564472);
    publisher.publish_gps(&session, lat, lon)?;
    Ok(format!("position ({}, {})", lat, lon))
}

fn scenario_sos<C: PubSubClient>(
    publisher: &mut PttPublisher<C>,
    config: &HarnessConfig,
) -> PttResult<String> {
    let session = Session::new(&config.channel, &config.device_id);
    let (lat, lon) = (25.04, 121.57);
    publisher.publish_sos(&session, lat, lon)?;
    Ok(format!("sos at ({}, {})", lat, lon))
}

fn scenario_broadcast<C: PubSubClient>(
    publisher: &mut PttPublisher<C>,
    config: &HarnessConfig,
) -> PttResult<String> {
    let session = Session::new(&config.channel, &config.device_id);
    publisher.publish_broadcast(&session, "system broadcast check")?;
    Ok("broadcast sent".to_string())
}

/// One scenario covering both publishes; it passes only when start and stop both go out.
fn scenario_mark_pair<C: PubSubClient>(
    publisher: &mut PttPublisher<C>,
    config: &HarnessConfig,
) -> PttResult<String> {
    let session = Session::new(&config.channel, &config.device_id);
    publisher.publish_mark_start(&session)?;
    std::thread::sleep(config.burst_delay);
    publisher.publish_mark_stop(&session)?;
    Ok("MARK_START + MARK_STOP".to_string())
}

/// Passes only when every configured channel accepts a publish.
fn scenario_fanout<C: PubSubClient>(
    publisher: &mut PttPublisher<C>,
    config: &HarnessConfig,
) -> PttResult<String> {
    let total = config.fanout_channels.len();
    for (sent, channel) in config.fanout_channels.iter().enumerate() {
        let session = Session::new(channel, &config.device_id);
        publisher
            .publish_text(&session, &format!("channel check {}", channel))
            .map_err(|err| {
                warn!(channel = %channel, sent, total, "fan-out stopped");
                err
            })?;
        std::thread::sleep(config.burst_delay);
    }
    Ok(format!("{}/{}", total, total))
}

/// Rapid sequential publishes; passes only when every one is accepted.
fn scenario_burst<C: PubSubClient>(
    publisher: &mut PttPublisher<C>,
    config: &HarnessConfig,
) -> PttResult<String> {
    let session = Session::new(&config.channel, &config.device_id);
    for i in 0..config.burst_count {
        publisher
            .publish_text(&session, &format!("burst message #{}", i + 1))
            .map_err(|err| {
                warn!(sent = i, total = config.burst_count, "burst stopped");
                err
            })?;
        std::thread::sleep(config.burst_delay);
    }
    Ok(format!("{}/{}", config.burst_count, config.burst_count))
}
