use crate::modbus::protocol::ExceptionCode;

/// Capability set of a registered slave device.
///
/// The client holds registered devices as shared handles and routes decoded
/// payloads to the ones whose [`ModbusDevice::address`] matches the frame's
/// unit address. All callbacks run on the scheduler tick; implementations
/// keep mutable state behind interior mutability.
pub trait ModbusDevice: Send + Sync {
    /// Unit address of the logical slave this device represents.
    fn address(&self) -> u8;

    fn name(&self) -> &str;

    /// Payload of a well-formed non-exception response addressed to this unit.
    fn on_modbus_data(&self, payload: &[u8]);

    /// Exception response addressed to this unit.
    fn on_modbus_error(&self, _function: u8, _code: ExceptionCode) {}

    fn on_modbus_read_registers(&self, _function: u8, _start_address: u16, _count: u16) {}

    fn on_modbus_write_registers(&self, _function: u8, _data: &[u8]) {}
}
