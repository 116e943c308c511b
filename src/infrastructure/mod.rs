//! Infrastructure layer: task execution, codecs, and runner backends

pub mod codec;
pub mod executor;
pub mod runners;

pub use executor::{CommandExecutor, ShellTaskExecutor};
pub use runners::{BinaryRunner, ContainerRunner, Runner, WebServiceRunner, build_runner};
