//! 会话集成测试（Mock 驱动）

use soarm_driver::{Joint, JointPositions, MockCall, MockDriver, MockHandle};
use soarm_teleop::{
    CancelToken, KeyError, KeyEvent, KeySource, ScriptedKeys, Session, TeleopConfig, TeleopError,
    TerminationReason,
};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// 可在会话结束后读取的输出缓冲
#[derive(Clone, Default)]
struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn config() -> TeleopConfig {
    TeleopConfig {
        tick_ms: 0,
        grace_ms: 0,
        ..Default::default()
    }
}

fn start(driver: MockDriver) -> (Session<MockDriver>, MockHandle, SharedOutput) {
    let handle = driver.handle();
    let output = SharedOutput::default();
    let session = Session::with_output(
        driver,
        config(),
        CancelToken::new(),
        Box::new(output.clone()),
    )
    .unwrap();
    (session, handle, output)
}

fn positions(values: &[(Joint, f64)]) -> JointPositions {
    let mut positions = JointPositions::zeros(&Joint::ALL);
    for &(joint, value) in values {
        positions.insert(joint, value);
    }
    positions
}

#[test]
fn test_example_scenario() {
    let (session, handle, output) = start(MockDriver::new());
    let outcome = session.run(&mut ScriptedKeys::from_chars("ddw k"));

    assert!(matches!(outcome.reason, TerminationReason::QuitKey));
    assert_eq!(outcome.ticks, 4);

    let sends = handle.sends();
    // neutral + 4 个按键 + folded
    assert_eq!(sends.len(), 6);
    assert_eq!(sends[0], JointPositions::zeros(&Joint::ALL));
    assert_eq!(
        sends[3],
        positions(&[(Joint::ShoulderPan, 6.0), (Joint::ShoulderLift, -3.0)])
    );
    assert_eq!(
        sends[4],
        positions(&[
            (Joint::ShoulderPan, 6.0),
            (Joint::ShoulderLift, -3.0),
            (Joint::Gripper, 90.0)
        ])
    );

    let folded = &sends[5];
    assert_eq!(folded.get(Joint::ShoulderLift), Some(-90.0));
    assert_eq!(folded.get(Joint::ElbowFlex), Some(90.0));
    assert_eq!(folded.get(Joint::WristFlex), Some(-90.0));
    assert_eq!(folded.get(Joint::Gripper), Some(0.0));

    // disconnect 恰好一次，且在 folded 之后
    assert_eq!(handle.disconnect_count(), 1);
    assert_eq!(handle.calls().last(), Some(&MockCall::Disconnect));

    let text = output.text();
    assert!(text.contains("Robot control started:"));
    assert!(text.contains("'shoulder_pan.pos': 6.0, 'shoulder_lift.pos': -3.0"));
    assert!(text.contains("Quitting..."));
    assert!(text.contains("Moving to folding position..."));
    assert!(text.contains("Disconnected from robot."));
}

#[test]
fn test_send_failure_still_folds_and_disconnects() {
    // neutral 和第一个按键成功，第二个按键失败
    let (session, handle, output) = start(MockDriver::new().fail_send_after(2));
    let outcome = session.run(&mut ScriptedKeys::from_chars("dddk"));

    assert!(matches!(
        outcome.reason,
        TerminationReason::Fault(TeleopError::Driver(_))
    ));
    assert_eq!(outcome.ticks, 1);

    let sends = handle.sends();
    // neutral, d, d（失败）, folded（失败但仍尝试）
    assert_eq!(sends.len(), 4);
    assert!(outcome.shutdown.fold_error.is_some());
    assert_eq!(handle.disconnect_count(), 1);

    assert_eq!(sends[3].get(Joint::ShoulderLift), Some(-90.0));
    assert!(output.text().contains("Error: Driver error"));
}

#[test]
fn test_disconnect_failure_is_suppressed() {
    let (session, handle, output) = start(MockDriver::new().fail_disconnect());
    let outcome = session.run(&mut ScriptedKeys::from_chars("k"));

    assert!(matches!(outcome.reason, TerminationReason::QuitKey));
    assert!(outcome.shutdown.folded.is_some());
    assert!(outcome.shutdown.disconnect_error.is_some());
    assert_eq!(handle.disconnect_count(), 1);
    assert!(!output.text().contains("Disconnected from robot."));
}

#[test]
fn test_cancel_during_session_routes_to_shutdown() {
    struct CancelAfter {
        keys: ScriptedKeys,
        cancel: CancelToken,
    }

    impl KeySource for CancelAfter {
        fn read_key(&mut self) -> Result<KeyEvent, KeyError> {
            match self.keys.read_key() {
                Ok(key) => Ok(key),
                Err(_) => {
                    // 模拟信号处理函数设置标志，读取随后被打断
                    self.cancel.cancel();
                    Err(KeyError::Interrupted)
                },
            }
        }
    }

    let driver = MockDriver::new();
    let handle = driver.handle();
    let cancel = CancelToken::new();
    let session =
        Session::with_output(driver, config(), cancel.clone(), Box::new(io::sink())).unwrap();

    let mut keys = CancelAfter {
        keys: ScriptedKeys::from_chars("aa"),
        cancel,
    };
    let outcome = session.run(&mut keys);

    assert!(matches!(outcome.reason, TerminationReason::Interrupted));
    assert_eq!(outcome.ticks, 2);
    assert_eq!(handle.sends().len(), 4);
    assert_eq!(handle.disconnect_count(), 1);
}

#[test]
fn test_reset_key() {
    let (session, handle, _) = start(MockDriver::new());
    let mut keys = ScriptedKeys::new([
        KeyEvent::Char('d'),
        KeyEvent::Up,
        KeyEvent::Right,
        KeyEvent::Char(' '),
        KeyEvent::Char('n'),
        KeyEvent::Char('k'),
    ]);
    session.run(&mut keys);

    let sends = handle.sends();
    assert_eq!(sends[5], JointPositions::zeros(&Joint::ALL));
}

#[test]
fn test_partial_joint_set_is_respected() {
    let declared = [Joint::ShoulderPan, Joint::ShoulderLift, Joint::Gripper];
    let (session, handle, _) = start(MockDriver::with_joints(&declared));

    let mut keys = ScriptedKeys::new([
        KeyEvent::Up,
        KeyEvent::Left,
        KeyEvent::Char('q'),
        KeyEvent::Char('s'),
        KeyEvent::Char('k'),
    ]);
    let outcome = session.run(&mut keys);

    assert!(matches!(outcome.reason, TerminationReason::QuitKey));
    for sent in handle.sends() {
        assert_eq!(sent.joints().collect::<Vec<_>>(), declared.to_vec());
    }
    assert!(outcome.shutdown.is_clean());
}

#[test]
fn test_unbound_keys_keep_running() {
    let (session, handle, _) = start(MockDriver::new());
    let mut keys = ScriptedKeys::new([
        KeyEvent::Char('x'),
        KeyEvent::Char('\x1b'),
        KeyEvent::Char('é'),
        KeyEvent::Char('k'),
    ]);
    let outcome = session.run(&mut keys);

    assert!(matches!(outcome.reason, TerminationReason::QuitKey));
    assert_eq!(outcome.ticks, 3);
    // 未绑定的按键仍然下发当前状态
    let sends = handle.sends();
    assert!(sends[1..4].iter().all(|s| *s == JointPositions::zeros(&Joint::ALL)));
}

#[test]
fn test_dropped_session_still_shuts_down() {
    let driver = MockDriver::new();
    let handle = driver.handle();
    {
        let _session =
            Session::with_output(driver, config(), CancelToken::new(), Box::new(io::sink()))
                .unwrap();
    }
    assert_eq!(handle.sends().len(), 1);
    assert_eq!(handle.disconnect_count(), 1);
}

#[test]
fn test_shutdown_runs_exactly_once() {
    let (session, handle, _) = start(MockDriver::new());
    let outcome = session.run(&mut ScriptedKeys::from_chars("k"));
    // Session 已在 run 结束时被消耗并 drop
    assert!(outcome.shutdown.is_clean());
    assert_eq!(handle.disconnect_count(), 1);
    // neutral + folded
    assert_eq!(handle.sends().len(), 2);
}

#[test]
fn test_fold_fills_missing_joints_from_last_accepted_command() {
    let driver = MockDriver::new().fail_send_after(2);
    let handle = driver.handle();
    let config = TeleopConfig {
        folded: Some([(Joint::ElbowFlex, 45.0)].into_iter().collect()),
        ..config()
    };
    let session =
        Session::with_output(driver, config, CancelToken::new(), Box::new(io::sink())).unwrap();
    session.run(&mut ScriptedKeys::from_chars("ddk"));

    let folded = handle.sends().pop().unwrap();
    assert_eq!(folded.get(Joint::ElbowFlex), Some(45.0));
    // 被拒绝的第二次 'd' 不计入
    assert_eq!(folded.get(Joint::ShoulderPan), Some(3.0));
    assert_eq!(folded.len(), Joint::ALL.len());
}
