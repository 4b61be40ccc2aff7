//! The cycle loop: reset, run, drain, done.
//!
//! [`SimulationDriver`] owns the clock and is the only caller of `tick()`.
//! Every cycle it evaluates the source, the device and the sink in stream
//! order, records a trace snapshot, and only then ticks all three, so no
//! component ever observes a peer's next-cycle state while evaluating.

use strobe_common::BitVector;
use tracing::{debug, error, info};

use crate::adapter::{AdapterSignals, DeviceAdapter};
use crate::clock::{Phase, SimClock};
use crate::error::SimError;
use crate::sink::StreamSink;
use crate::source::StreamSource;
use crate::stream::{channel_trace, Offer};
use crate::trace::TraceRecorder;
use crate::verdict::Verdict;
use crate::waveform::WaveformRecorder;

/// Scheduling policy for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    /// Cycles the device is held in reset.
    pub reset_cycles: u32,
    /// Extra cycles simulated after both endpoints finish.
    pub drain_cycles: u32,
    /// Upper bound on running cycles.
    pub max_cycles: u64,
    /// Collect a per-cycle line trace.
    pub line_trace: bool,
    /// Render the signal table into the verdict.
    pub textwave: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            reset_cycles: 2,
            drain_cycles: 3,
            max_cycles: 10_000,
            line_trace: false,
            textwave: true,
        }
    }
}

/// The result of a single driver step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A cycle was simulated.
    Continued,
    /// The run is over.
    Done,
}

/// Drives a source, a device and a sink through the harness phases.
pub struct SimulationDriver {
    clock: SimClock,
    source: StreamSource,
    adapter: DeviceAdapter,
    sink: StreamSink,
    trace: TraceRecorder,
    config: DriverConfig,
    drain_remaining: u32,
    line_trace: Vec<String>,
    halted: bool,
}

impl SimulationDriver {
    /// Wires the components together and declares the trace signals.
    ///
    /// The source width must match the device's ingress and the sink width
    /// its egress.
    pub fn new(
        source: StreamSource,
        adapter: DeviceAdapter,
        sink: StreamSink,
        config: DriverConfig,
    ) -> Result<Self, SimError> {
        if source.width() != adapter.ingress_width() {
            return Err(SimError::PortWidthMismatch {
                name: "source".to_string(),
                expected: adapter.ingress_width(),
                actual: source.width(),
            });
        }
        if sink.width() != adapter.egress_width() {
            return Err(SimError::PortWidthMismatch {
                name: "sink".to_string(),
                expected: adapter.egress_width(),
                actual: sink.width(),
            });
        }

        let mut signals = vec![
            ("src.val".to_string(), 1),
            ("src.rdy".to_string(), 1),
            ("src.msg".to_string(), source.width()),
        ];
        signals.extend(adapter.signal_decls());
        signals.extend([
            ("sink.val".to_string(), 1),
            ("sink.rdy".to_string(), 1),
            ("sink.msg".to_string(), sink.width()),
        ]);
        let trace = TraceRecorder::new(signals)?;

        Ok(Self {
            clock: SimClock::new(),
            source,
            adapter,
            sink,
            trace,
            drain_remaining: config.drain_cycles,
            config,
            line_trace: Vec::new(),
            halted: false,
        })
    }

    /// Forwards every recorded value change to a waveform recorder.
    pub fn attach_waveform(&mut self, recorder: Box<dyn WaveformRecorder>) -> Result<(), SimError> {
        self.trace.attach_waveform(recorder)
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// The recorded trace.
    pub fn trace(&self) -> &TraceRecorder {
        &self.trace
    }

    /// The stream source.
    pub fn source(&self) -> &StreamSource {
        &self.source
    }

    /// The stream sink.
    pub fn sink(&self) -> &StreamSink {
        &self.sink
    }

    /// The device adapter.
    pub fn adapter(&self) -> &DeviceAdapter {
        &self.adapter
    }

    fn enter(&mut self, phase: Phase) {
        info!(cycle = self.clock.cycle(), %phase, "entering phase");
        self.clock.enter(phase);
    }

    /// Holds the device and endpoints in reset, then starts the run at cycle 0.
    ///
    /// Called implicitly by the first [`step`](Self::step).
    pub fn reset(&mut self) -> Result<(), SimError> {
        if self.clock.phase() != Phase::Reset {
            return Err(SimError::protocol(
                self.clock.cycle(),
                format!("reset requested in phase {}", self.clock.phase()),
            ));
        }
        for _ in 0..self.config.reset_cycles {
            self.adapter.reset_cycle()?;
            self.source.reset();
            self.sink.reset();
        }
        self.adapter.release_reset()?;
        self.clock.clear();
        self.enter(Phase::Running);
        Ok(())
    }

    /// Advances the run by one cycle, handling phase transitions first.
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        if self.halted {
            return Err(SimError::protocol(
                self.clock.cycle(),
                "driver stepped after a fatal error",
            ));
        }
        self.step_inner().inspect_err(|e| {
            self.halted = true;
            error!(cycle = self.clock.cycle(), error = %e, "run aborted");
        })
    }

    fn step_inner(&mut self) -> Result<StepResult, SimError> {
        match self.clock.phase() {
            Phase::Reset => self.reset()?,
            Phase::Done => return Ok(StepResult::Done),
            Phase::Running | Phase::Draining => {}
        }

        if self.clock.phase() == Phase::Running && self.source.done() && self.sink.done() {
            self.enter(Phase::Draining);
        }
        match self.clock.phase() {
            Phase::Running if self.clock.cycle() >= self.config.max_cycles => {
                return Err(SimError::CycleLimitExceeded {
                    limit: self.config.max_cycles,
                });
            }
            Phase::Draining if self.drain_remaining == 0 => {
                self.enter(Phase::Done);
                self.trace.finish()?;
                return Ok(StepResult::Done);
            }
            Phase::Draining => self.drain_remaining -= 1,
            _ => {}
        }

        self.run_cycle()?;
        Ok(StepResult::Continued)
    }

    fn run_cycle(&mut self) -> Result<(), SimError> {
        let cycle = self.clock.cycle();

        // Evaluate, in stream order.
        let offer = self.source.evaluate(cycle)?;
        let sink_ready = self.sink.ready();
        let signals = self.adapter.evaluate(cycle, &offer, sink_ready)?;
        let sink_ready = self
            .sink
            .evaluate(signals.egress_valid, signals.egress_msg)?;

        self.snapshot(cycle, &offer, &signals, sink_ready)?;
        let line = self.line(&offer, &signals, sink_ready);
        debug!(cycle, "{line}");
        if self.config.line_trace {
            self.line_trace.push(line);
        }

        // Commit.
        self.source.tick(cycle, signals.ingress_ready)?;
        self.adapter.tick(cycle)?;
        self.sink.tick(cycle)?;
        self.clock.advance();
        Ok(())
    }

    fn snapshot(
        &mut self,
        cycle: u64,
        offer: &Offer,
        signals: &AdapterSignals,
        sink_ready: bool,
    ) -> Result<(), SimError> {
        let mut values = vec![
            BitVector::from_bool(offer.valid),
            BitVector::from_bool(signals.ingress_ready),
            offer.msg,
        ];
        values.extend(self.adapter.port_values()?);
        values.extend([
            BitVector::from_bool(signals.egress_valid),
            BitVector::from_bool(sink_ready),
            signals.egress_msg,
        ]);
        self.trace.record(cycle, values)
    }

    fn line(&self, offer: &Offer, signals: &AdapterSignals, sink_ready: bool) -> String {
        let dut_width = offer.msg.hex_digits() + 1;
        format!(
            "{:>3}: {} > {:<dut_width$} > {}",
            self.clock.cycle(),
            channel_trace(offer.valid, signals.ingress_ready, &offer.msg),
            self.adapter.line_trace(),
            channel_trace(signals.egress_valid, sink_ready, &signals.egress_msg),
        )
    }

    /// Steps until the run is done and returns the verdict.
    pub fn run_to_completion(&mut self) -> Result<Verdict, SimError> {
        while self.step()? == StepResult::Continued {}
        let verdict = self.verdict();
        info!(
            cycles = verdict.cycles,
            checks = verdict.checks,
            mismatches = verdict.mismatches.len(),
            "run complete"
        );
        Ok(verdict)
    }

    /// Verdict for the cycles simulated so far.
    pub fn verdict(&self) -> Verdict {
        Verdict {
            cycles: self.clock.cycle(),
            checks: self.sink.checks(),
            mismatches: self.sink.mismatches().to_vec(),
            tally: self.sink.tally().to_string(),
            textwave: self.config.textwave.then(|| self.trace.render()),
            line_trace: self.line_trace.clone(),
        }
    }
}
