//! MockDriver 行为测试
//!
//! 控制循环的集成测试依赖这些语义，单独验证一遍。

use soarm_driver::{Driver, DriverError, Joint, JointPositions, MockCall, MockDriver};

#[test]
fn test_records_calls_in_order() {
    let mut driver = MockDriver::new();
    let handle = driver.handle();

    let positions = JointPositions::zeros(driver.declared_joints());
    driver.send(&positions).unwrap();
    driver.disconnect().unwrap();

    assert_eq!(
        handle.calls(),
        vec![MockCall::Send(positions), MockCall::Disconnect]
    );
    assert_eq!(handle.disconnect_count(), 1);
}

#[test]
fn test_fail_send_after() {
    let mut driver = MockDriver::new().fail_send_after(2);
    let handle = driver.handle();
    let positions = JointPositions::zeros(&Joint::ALL);

    assert!(driver.send(&positions).is_ok());
    assert!(driver.send(&positions).is_ok());
    assert!(matches!(
        driver.send(&positions),
        Err(DriverError::Rejected(_))
    ));
    // 失败的尝试同样被记录
    assert_eq!(handle.sends().len(), 3);
}

#[test]
fn test_fail_sends_from_now() {
    let mut driver = MockDriver::new();
    let handle = driver.handle();
    let positions = JointPositions::zeros(&Joint::ALL);

    driver.send(&positions).unwrap();
    handle.fail_sends_from_now();
    assert!(driver.send(&positions).is_err());
}

#[test]
fn test_rejects_undeclared_joint() {
    let mut driver = MockDriver::with_joints(&[Joint::ShoulderPan]);
    let positions = JointPositions::zeros(&[Joint::ShoulderPan, Joint::Gripper]);
    assert!(matches!(
        driver.send(&positions),
        Err(DriverError::UndeclaredJoint(Joint::Gripper))
    ));
}

#[test]
fn test_fail_disconnect_still_recorded() {
    let mut driver = MockDriver::new().fail_disconnect();
    let handle = driver.handle();
    assert!(driver.disconnect().is_err());
    assert_eq!(handle.disconnect_count(), 1);
}
