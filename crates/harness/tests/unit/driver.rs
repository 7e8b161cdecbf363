//! # Driver Tests
//!
//! Clock and reset stimulus, waveform latch, termination policy, console output, and the
//! shutdown order of the trace outputs.

use std::cell::RefCell;
use std::rc::Rc;

use fsoc_tb_core::common::NS_PER_SECOND;
use fsoc_tb_core::config::RunConfig;
use fsoc_tb_core::sim::{Driver, RunOutcome, StopFlag};
use fsoc_tb_core::SimTime;
use mockall::Sequence;
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use crate::common::logs::capture_logs;
use crate::common::mocks::MockHwModel;
use crate::common::models::ScriptedModel;
use crate::common::recorders::{CloseOrder, LoggingPc, LoggingWaveform};

fn driver(model: ScriptedModel, config: RunConfig) -> Driver<ScriptedModel, Vec<u8>> {
    Driver::new(model, config, Vec::new()).unwrap()
}

fn console_text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[test]
fn test_completion_scenario_reset_window() {
    // Evaluation 21 happens at t = 5000; the loop exits at the following check.
    let model = ScriptedModel::finishing_after(21).with_history();
    let finished = driver(model, RunConfig::default()).run();

    assert_eq!(finished.report.outcome, RunOutcome::ModelSignaledCompletion);
    assert_eq!(finished.report.stats.iterations, 21);
    assert_eq!(finished.report.final_time, SimTime::new(5250));
    assert_eq!(finished.report.exit_code(), 0);

    let resets = &finished.model.resets;
    assert_eq!(resets.len(), 21);
    for (k, &reset) in resets.iter().enumerate() {
        let time = 250 * k as u64;
        assert_eq!(reset, time < 2000, "reset level at t={time}");
    }
}

#[test]
fn test_clock_starts_high_and_first_toggle_is_at_zero() {
    let model = ScriptedModel::new().with_history();
    let mut driver = driver(model, RunConfig::default());
    assert!(driver.clock());
    assert_eq!(driver.model().clock_writes, vec![true]);

    assert_eq!(driver.step(), None);
    assert!(!driver.clock());
    assert_eq!(driver.time(), SimTime::new(250));

    assert_eq!(driver.step(), None);
    assert!(!driver.clock(), "t=250 is not a clock boundary");

    assert_eq!(driver.step(), None);
    assert!(driver.clock(), "t=500 toggles");
    assert_eq!(driver.model().clock_writes, vec![true, false, true]);
    assert_eq!(driver.stats().rising_edges, 1);
    assert_eq!(driver.stats().clock_edges, 2);
}

#[test]
fn test_timeout_scenario_one_second() {
    let config = RunConfig {
        timeout: SimTime::from_seconds(1, NS_PER_SECOND),
        ..RunConfig::default()
    };
    let finished = driver(ScriptedModel::new(), config).run();

    assert_eq!(finished.report.outcome, RunOutcome::TimeoutExpired);
    assert_eq!(finished.report.stats.iterations, 4_000_001);
    assert_eq!(finished.report.final_time, SimTime::new(1_000_000_250));

    let console = console_text(&finished.console);
    assert!(console.contains("Timeout set: 1000000000 ns"));
    assert!(console.contains("Timeout: Exiting at time 1000000000"));
    assert!(console.contains("Timeout: 1000000000 \t MainTime: 1000000000"));
}

#[test]
fn test_timeout_between_steps_uses_first_time_past_budget() {
    let config = RunConfig {
        timeout: SimTime::new(1001),
        ..RunConfig::default()
    };
    let finished = driver(ScriptedModel::new(), config).run();

    assert_eq!(finished.report.outcome, RunOutcome::TimeoutExpired);
    // Iterations at 0, 250, ..., 1250; 1250 is the first time >= 1001.
    assert_eq!(finished.report.stats.iterations, 6);
    assert!(console_text(&finished.console).contains("MainTime: 1250"));
}

#[test]
fn test_zero_timeout_never_expires() {
    let finished = driver(ScriptedModel::finishing_after(50_000), RunConfig::default()).run();
    assert_eq!(finished.report.outcome, RunOutcome::ModelSignaledCompletion);
    assert!(!console_text(&finished.console).contains("Timeout"));
}

#[test]
fn test_interrupt_observed_at_next_iteration() {
    let stop = StopFlag::new();
    let model = ScriptedModel::new().interrupting_at(5, stop.clone());
    let finished = driver(model, RunConfig::default())
        .with_stop_flag(stop.clone())
        .run();

    assert_eq!(finished.report.outcome, RunOutcome::InterruptRequested);
    assert_eq!(finished.report.stats.iterations, 5);
    assert!(stop.is_requested(), "the flag is never cleared");
    assert!(console_text(&finished.console).contains("Caught ctrl-c"));
}

#[test]
fn test_interrupt_before_first_iteration() {
    let stop = StopFlag::new();
    stop.request();
    let finished = driver(ScriptedModel::new(), RunConfig::default())
        .with_stop_flag(stop)
        .run();

    assert_eq!(finished.report.outcome, RunOutcome::InterruptRequested);
    assert_eq!(finished.report.stats.iterations, 0);
    assert_eq!(finished.model.evals, 0);
}

#[test]
fn test_recorded_timeout_wins_over_later_interrupt() {
    let stop = StopFlag::new();
    // Timeout is recorded on the iteration at t=500 (evaluation 3); the interrupt arrives
    // during that same iteration.
    let model = ScriptedModel::new().interrupting_at(3, stop.clone());
    let config = RunConfig {
        timeout: SimTime::new(500),
        ..RunConfig::default()
    };
    let finished = driver(model, config).with_stop_flag(stop).run();
    assert_eq!(finished.report.outcome, RunOutcome::TimeoutExpired);
}

#[test]
fn test_gpio_transitions_printed_once_per_change() {
    let model = ScriptedModel::finishing_after(4).with_gpio(&[true, true, false, true]);
    let finished = driver(model, RunConfig::default()).run();

    assert_eq!(
        console_text(&finished.console),
        "0 output q is ON\n500 output q is OFF\n750 output q is ON\n"
    );
    assert_eq!(finished.report.stats.gpio_transitions, 3);
}

#[test]
fn test_pc_trace_receives_retired_pcs() {
    let (pc, log) = LoggingPc::new();
    let mut driver = driver(ScriptedModel::finishing_after(3).with_pcs(), RunConfig::default());
    driver.attach_pc_trace(Box::new(pc));
    let finished = driver.run();

    assert_eq!(log.borrow().pcs, vec![4, 8, 12]);
    assert_eq!(finished.report.stats.pc_records, 3);
}

#[test]
fn test_waveform_declares_model_signals() {
    let (wave, log) = LoggingWaveform::new();
    let mut driver = driver(ScriptedModel::finishing_after(1), RunConfig::default());
    driver.attach_waveform(Box::new(wave));
    assert!(driver.tracing_enabled());

    let names: Vec<String> = log.borrow().declared.iter().map(|s| s.name.clone()).collect();
    assert_eq!(names, vec!["clk".to_string(), "rst".to_string()]);
}

#[test]
fn test_waveform_sample_values_follow_stimulus() {
    let (wave, log) = LoggingWaveform::new();
    let mut driver = driver(ScriptedModel::finishing_after(2), RunConfig::default());
    driver.attach_waveform(Box::new(wave));
    let _ = driver.run();

    // vcd_start = 0: t=0 is not past it, so only t=250 is sampled. The clock went low at t=0.
    let log = log.borrow();
    assert_eq!(log.dump_times, vec![250]);
    assert_eq!(log.dump_values, vec![vec![0, 1]]);
}

#[test]
fn test_waveform_declare_failure_disables_tracing() {
    let (mut wave, log) = LoggingWaveform::new();
    wave.fail_declare = true;
    let mut driver = driver(ScriptedModel::finishing_after(10), RunConfig::default());
    driver.attach_waveform(Box::new(wave));

    assert!(!driver.tracing_enabled());
    let finished = driver.run();
    assert_eq!(finished.report.outcome, RunOutcome::ModelSignaledCompletion);
    assert_eq!(log.borrow().closes, 1);
    assert!(log.borrow().dump_times.is_empty());
}

#[test]
fn test_waveform_write_failure_disables_tracing_and_run_continues() {
    let (mut wave, log) = LoggingWaveform::new();
    wave.fail_from_dump = Some(3);
    let mut driver = driver(ScriptedModel::finishing_after(20), RunConfig::default());
    driver.attach_waveform(Box::new(wave));
    let finished = driver.run();

    assert_eq!(finished.report.outcome, RunOutcome::ModelSignaledCompletion);
    assert_eq!(finished.report.stats.iterations, 20);
    assert_eq!(finished.report.stats.trace_samples, 2);
    let log = log.borrow();
    assert_eq!(log.dump_times.len(), 2);
    assert_eq!(log.closes, 1, "closed when disabled, not again at shutdown");
}

#[test]
fn test_close_failure_after_write_error_is_logged() {
    let (mut wave, wave_log) = LoggingWaveform::new();
    wave.fail_from_dump = Some(1);
    wave.fail_close = true;
    let (mut pc, pc_log) = LoggingPc::new();
    pc.fail_from_record = Some(2);
    pc.fail_close = true;

    let mut driver = driver(ScriptedModel::finishing_after(6).with_pcs(), RunConfig::default());
    driver.attach_waveform(Box::new(wave));
    driver.attach_pc_trace(Box::new(pc));
    let (finished, logs) = capture_logs(|| driver.run());

    assert_eq!(finished.report.outcome, RunOutcome::ModelSignaledCompletion);
    assert_eq!(finished.report.stats.pc_records, 1);
    assert_eq!(wave_log.borrow().closes, 1);
    assert_eq!(pc_log.borrow().closes, 1);
    assert!(logs.contains("waveform write failed"), "{logs}");
    assert!(logs.contains("failed to close waveform trace"), "{logs}");
    assert!(logs.contains("pc trace write failed"), "{logs}");
    assert!(logs.contains("failed to close pc trace"), "{logs}");
}

#[test]
fn test_close_failure_after_declare_error_is_logged() {
    let (mut wave, log) = LoggingWaveform::new();
    wave.fail_declare = true;
    wave.fail_close = true;
    let mut driver = driver(ScriptedModel::finishing_after(2), RunConfig::default());

    let ((), logs) = capture_logs(|| driver.attach_waveform(Box::new(wave)));

    assert!(!driver.tracing_enabled());
    assert_eq!(log.borrow().closes, 1);
    assert!(logs.contains("waveform tracing disabled"), "{logs}");
    assert!(logs.contains("failed to close waveform trace"), "{logs}");
}

#[test]
fn test_open_trace_outputs_failure_is_not_fatal() {
    let config = RunConfig {
        trace: true,
        trace_path: "/nonexistent-dir/trace.vcd".into(),
        trace_pc: true,
        trace_pc_path: "/nonexistent-dir/trace.bin".into(),
        ..RunConfig::default()
    };
    let mut driver = driver(ScriptedModel::finishing_after(8), config);
    driver.open_trace_outputs();

    assert!(!driver.tracing_enabled());
    assert!(!driver.pc_tracing_enabled());
    let finished = driver.run();
    assert_eq!(finished.report.outcome, RunOutcome::ModelSignaledCompletion);
    assert_eq!(finished.report.stats.trace_samples, 0);
}

#[test]
fn test_open_trace_outputs_writes_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        trace: true,
        trace_path: dir.path().join("trace.vcd"),
        trace_pc: true,
        trace_pc_path: dir.path().join("trace.bin"),
        ..RunConfig::default()
    };
    let mut driver = driver(ScriptedModel::finishing_after(40).with_pcs(), config);
    driver.open_trace_outputs();
    assert!(driver.tracing_enabled());
    assert!(driver.pc_tracing_enabled());
    let finished = driver.run();

    let pcs = std::fs::read(dir.path().join("trace.bin")).unwrap();
    assert_eq!(pcs.len() as u64, 4 * finished.report.stats.pc_records);
    assert_eq!(&pcs[..4], &4u32.to_le_bytes());

    let vcd = std::fs::read_to_string(dir.path().join("trace.vcd")).unwrap();
    assert!(vcd.contains("$enddefinitions $end"));
    assert!(vcd.contains("#250\n"));
    assert!(!vcd.contains("#0\n"));
}

#[test]
fn test_pc_trace_opened_even_if_nothing_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.bin");
    let config = RunConfig {
        trace_pc: true,
        trace_pc_path: path.clone(),
        ..RunConfig::default()
    };
    let mut driver = driver(ScriptedModel::finishing_after(4), config);
    driver.open_trace_outputs();
    let finished = driver.run();

    assert_eq!(finished.report.stats.pc_records, 0);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
}

#[derive(Debug, Clone, Copy)]
enum Ending {
    Completion,
    Timeout,
    Interrupt,
}

#[rstest]
#[case(Ending::Completion, RunOutcome::ModelSignaledCompletion)]
#[case(Ending::Timeout, RunOutcome::TimeoutExpired)]
#[case(Ending::Interrupt, RunOutcome::InterruptRequested)]
fn test_shutdown_closes_each_output_once_in_order(
    #[case] ending: Ending,
    #[case] expected: RunOutcome,
) {
    let stop = StopFlag::new();
    let (model, config) = match ending {
        Ending::Completion => (ScriptedModel::finishing_after(12), RunConfig::default()),
        Ending::Timeout => (
            ScriptedModel::new(),
            RunConfig {
                timeout: SimTime::new(3000),
                ..RunConfig::default()
            },
        ),
        Ending::Interrupt => (
            ScriptedModel::new().interrupting_at(7, stop.clone()),
            RunConfig::default(),
        ),
    };

    let order: CloseOrder = Rc::new(RefCell::new(Vec::new()));
    let (mut wave, wave_log) = LoggingWaveform::new();
    wave.order = Some(Rc::clone(&order));
    let (mut pc, pc_log) = LoggingPc::new();
    pc.order = Some(Rc::clone(&order));

    let mut driver = driver(model, config).with_stop_flag(stop);
    driver.attach_waveform(Box::new(wave));
    driver.attach_pc_trace(Box::new(pc));
    let finished = driver.run();

    assert_eq!(finished.report.outcome, expected);
    assert_eq!(finished.report.exit_code(), 0);
    assert_eq!(wave_log.borrow().closes, 1);
    assert_eq!(pc_log.borrow().closes, 1);
    assert_eq!(*order.borrow(), vec!["pc", "waveform"]);
}

#[test]
fn test_first_iteration_call_order() {
    let mut seq = Sequence::new();
    let mut model = MockHwModel::new();
    model
        .expect_set_clock()
        .with(eq(true))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    model
        .expect_got_finish()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(false);
    model
        .expect_set_reset()
        .with(eq(true))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    model
        .expect_eval()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    model
        .expect_gpio()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(false);
    model
        .expect_set_clock()
        .with(eq(false))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    model
        .expect_got_finish()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(true);

    let mut driver = Driver::new(model, RunConfig::default(), Vec::<u8>::new()).unwrap();
    assert_eq!(driver.step(), None);
    assert_eq!(driver.step(), Some(RunOutcome::ModelSignaledCompletion));
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let config = RunConfig {
        half_period: 7,
        ..RunConfig::default()
    };
    assert!(Driver::new(ScriptedModel::new(), config, Vec::<u8>::new()).is_err());
}

proptest! {
    /// The clock toggles exactly on multiples of the half period and time advances by half of it.
    #[test]
    fn clock_toggles_iff_time_on_half_period(half in 1u64..=1000, iters in 1usize..200) {
        let half_period = half * 2;
        let config = RunConfig { half_period, ..RunConfig::default() };
        let mut driver = driver(ScriptedModel::new(), config);
        for _ in 0..iters {
            let t = driver.time().val();
            let before = driver.clock();
            prop_assert!(driver.step().is_none());
            prop_assert_eq!(driver.clock() != before, t % half_period == 0);
            prop_assert_eq!(driver.time().val() - t, half_period / 2);
        }
    }

    /// A budget ends the run at the first iteration whose time reaches it, never before.
    #[test]
    fn timeout_fires_at_first_time_reaching_budget(budget in 1u64..50_000) {
        let config = RunConfig { timeout: SimTime::new(budget), ..RunConfig::default() };
        let finished = driver(ScriptedModel::new(), config).run();
        let first_reaching = budget.div_ceil(250) * 250;
        prop_assert_eq!(finished.report.outcome, RunOutcome::TimeoutExpired);
        prop_assert_eq!(finished.report.stats.iterations, first_reaching / 250 + 1);
        prop_assert_eq!(finished.report.final_time.val(), first_reaching + 250);
    }

    /// No sample at or before `vcd_start`; every iteration after it samples.
    #[test]
    fn waveform_samples_start_strictly_after_vcd_start(vcd_start in 0u64..32_000) {
        let (wave, log) = LoggingWaveform::new();
        let config = RunConfig { vcd_start: SimTime::new(vcd_start), ..RunConfig::default() };
        let mut driver = driver(ScriptedModel::finishing_after(120), config);
        driver.attach_waveform(Box::new(wave));
        let finished = driver.run();

        let expected: Vec<u64> = (0..120u64).map(|k| k * 250).filter(|&t| t > vcd_start).collect();
        prop_assert_eq!(&log.borrow().dump_times, &expected);
        prop_assert_eq!(finished.report.stats.trace_samples, expected.len() as u64);
    }

    /// Reset is a pure function of time.
    #[test]
    fn reset_follows_threshold(threshold in 0u64..10_000) {
        let config = RunConfig { reset_threshold: threshold, ..RunConfig::default() };
        let finished = driver(ScriptedModel::finishing_after(60).with_history(), config).run();
        for (k, &reset) in finished.model.resets.iter().enumerate() {
            prop_assert_eq!(reset, (k as u64) * 250 < threshold);
        }
    }
}
