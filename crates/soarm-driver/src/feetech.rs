//! Feetech STS 串口总线驱动
//!
//! 连接流程：
//! 1. 打开串口（1 Mbps）
//! 2. PING 每个已标定关节的舵机
//! 3. 关扭矩 → 解锁 EEPROM → 写入位置模式与 PID 参数 → 上锁
//! 4. 开扭矩
//!
//! 运行期每个 tick 只发送一个 SYNC_WRITE（广播，无应答），写入全部目标位置。
//! 断开时逐个关闭扭矩（尽力而为），然后释放串口。

use crate::calibration::Calibration;
use crate::{Driver, DriverError, Joint, JointPositions};
use soarm_protocol::{
    ACCELERATION, D_COEFFICIENT, GOAL_POSITION, I_COEFFICIENT, InstructionPacket, LOCK,
    OPERATING_MODE, OperatingMode, P_COEFFICIENT, RETURN_DELAY_TIME, StatusPacket,
    TORQUE_ENABLE, u16_to_bytes_le,
};
use std::io::{ErrorKind, Read, Write};
use tracing::{debug, info, warn};

/// 默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// 位置环参数
///
/// 默认值与官方 SO-101 跟随臂配置一致（降低 P 以减少抖动）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoTuning {
    pub p: u8,
    pub i: u8,
    pub d: u8,
    pub acceleration: u8,
}

impl Default for ServoTuning {
    fn default() -> Self {
        Self {
            p: 16,
            i: 0,
            d: 32,
            acceleration: 254,
        }
    }
}

/// Feetech 总线驱动
///
/// `P` 为任意字节流（真实串口为 `Box<dyn SerialPort>`），便于在测试中替换。
pub struct FeetechDriver<P: Read + Write> {
    /// `None` 表示已断开
    port: Option<P>,
    joints: Vec<Joint>,
    calibration: Calibration,
}

#[cfg(feature = "feetech")]
impl FeetechDriver<Box<dyn serialport::SerialPort>> {
    /// 打开串口并完成舵机初始化
    pub fn connect(
        path: &str,
        baud_rate: u32,
        calibration: Calibration,
        tuning: ServoTuning,
    ) -> Result<Self, DriverError> {
        info!("Opening serial port {} @ {} baud", path, baud_rate);
        let port = serialport::new(path, baud_rate)
            .timeout(std::time::Duration::from_millis(100))
            .open()?;
        Self::with_port(port, calibration, tuning)
    }
}

impl<P: Read + Write> FeetechDriver<P> {
    /// 在已打开的字节流上完成舵机初始化
    pub fn with_port(
        port: P,
        calibration: Calibration,
        tuning: ServoTuning,
    ) -> Result<Self, DriverError> {
        let mut driver = Self {
            port: Some(port),
            joints: calibration.joints(),
            calibration,
        };

        for id in driver.servo_ids() {
            driver.ping(id)?;
        }
        driver.configure(tuning)?;
        driver.set_torque(true)?;

        info!("Feetech bus ready ({} servos)", driver.joints.len());
        Ok(driver)
    }

    fn servo_ids(&self) -> Vec<u8> {
        self.joints
            .iter()
            .filter_map(|&joint| self.calibration.get(joint).map(|m| m.id))
            .collect()
    }

    fn port(&mut self) -> Result<&mut P, DriverError> {
        self.port.as_mut().ok_or(DriverError::Disconnected)
    }

    /// 发送指令包，若该指令有应答则读取并校验状态包
    fn transact(&mut self, packet: &InstructionPacket) -> Result<Option<StatusPacket>, DriverError> {
        let port = self.port()?;
        port.write_all(&packet.encode())?;
        port.flush()?;

        if !packet.expects_status() {
            return Ok(None);
        }

        let status = read_status(port, packet.id)?.expect_id(packet.id)?;
        if !status.error.is_ok() {
            return Err(DriverError::ServoFault {
                id: status.id,
                flags: status.error.0,
            });
        }
        Ok(Some(status))
    }

    /// 检查舵机在线
    pub fn ping(&mut self, id: u8) -> Result<(), DriverError> {
        debug!("PING servo {}", id);
        self.transact(&InstructionPacket::ping(id))?;
        Ok(())
    }

    fn write_u8(&mut self, id: u8, address: u8, value: u8) -> Result<(), DriverError> {
        self.transact(&InstructionPacket::write(id, address, &[value])?)?;
        Ok(())
    }

    fn configure(&mut self, tuning: ServoTuning) -> Result<(), DriverError> {
        // EEPROM 只能在扭矩关闭时写入
        self.set_torque(false)?;
        for id in self.servo_ids() {
            self.write_u8(id, LOCK, 0)?;
            self.write_u8(id, RETURN_DELAY_TIME, 0)?;
            self.write_u8(id, OPERATING_MODE, OperatingMode::Position.as_u8())?;
            self.write_u8(id, P_COEFFICIENT, tuning.p)?;
            self.write_u8(id, I_COEFFICIENT, tuning.i)?;
            self.write_u8(id, D_COEFFICIENT, tuning.d)?;
            self.write_u8(id, ACCELERATION, tuning.acceleration)?;
            self.write_u8(id, LOCK, 1)?;
        }
        Ok(())
    }

    /// 开/关全部舵机扭矩
    pub fn set_torque(&mut self, enabled: bool) -> Result<(), DriverError> {
        for id in self.servo_ids() {
            self.write_u8(id, TORQUE_ENABLE, u8::from(enabled))?;
        }
        Ok(())
    }

    /// 逐个关扭矩，任一失败不影响后续舵机，返回第一个错误
    fn release_torque(&mut self) -> Result<(), DriverError> {
        let mut first_error = None;
        for id in self.servo_ids() {
            if let Err(e) = self.write_u8(id, TORQUE_ENABLE, 0) {
                warn!("Failed to disable torque on servo {}: {}", id, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<P: Read + Write> Driver for FeetechDriver<P> {
    fn declared_joints(&self) -> &[Joint] {
        &self.joints
    }

    fn send(&mut self, positions: &JointPositions) -> Result<(), DriverError> {
        if self.port.is_none() {
            return Err(DriverError::Disconnected);
        }
        if let Some(joint) = positions.first_undeclared(&self.joints) {
            return Err(DriverError::UndeclaredJoint(joint));
        }

        let mut goals = Vec::with_capacity(positions.len());
        for (joint, value) in positions.iter() {
            let id = self
                .calibration
                .get(joint)
                .map(|m| m.id)
                .ok_or(DriverError::UndeclaredJoint(joint))?;
            goals.push((id, u16_to_bytes_le(self.calibration.to_raw(joint, value)?)));
        }
        let entries: Vec<(u8, &[u8])> = goals.iter().map(|(id, raw)| (*id, &raw[..])).collect();

        self.transact(&InstructionPacket::sync_write(GOAL_POSITION, 2, &entries)?)?;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        if self.port.is_none() {
            return Ok(());
        }
        let result = self.release_torque();
        self.port = None;
        info!("Feetech bus released");
        result
    }
}

impl<P: Read + Write> Drop for FeetechDriver<P> {
    fn drop(&mut self) {
        // 未显式断开时尝试关扭矩（忽略错误）
        if self.port.is_some() {
            let _ = self.release_torque();
        }
    }
}

/// 读取一个完整状态包
fn read_status<P: Read>(port: &mut P, id: u8) -> Result<StatusPacket, DriverError> {
    let mut head = [0u8; 4];
    read_exact_or_timeout(port, &mut head, id)?;
    let remaining = StatusPacket::remaining_len(&head)?;

    let mut bytes = Vec::with_capacity(4 + remaining);
    bytes.extend_from_slice(&head);
    bytes.resize(4 + remaining, 0);
    read_exact_or_timeout(port, &mut bytes[4..], id)?;

    Ok(StatusPacket::parse(&bytes)?)
}

fn read_exact_or_timeout<P: Read>(port: &mut P, buf: &mut [u8], id: u8) -> Result<(), DriverError> {
    port.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::TimedOut | ErrorKind::UnexpectedEof => DriverError::NoResponse { id },
        _ => DriverError::Io(e),
    })
}
