//! Concrete provisioning steps.

mod create_virtual_machine;

pub use create_virtual_machine::CreateVirtualMachine;
