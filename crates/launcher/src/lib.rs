//! Vardr launcher - entry point discovery and child process supervision.

pub mod locator;
pub mod process;
pub mod spec;

pub use locator::{ConventionalNames, EntryPointDetector, Locator, MarkerScan};
pub use process::{launch, supervise, ChildHandle, ProcessChild};
pub use spec::{LaunchSpec, ServerSettings};
